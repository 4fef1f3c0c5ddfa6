//! Occupancy statistics
//!
//! Sampled once per allocator operation, after the arena has been trimmed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Largest post-trim arena length observed
    pub high_water_mark: u64,

    /// Sum of post-trim arena lengths over all operations
    pub byte_steps: u64,

    /// Number of operations sampled
    pub steps: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one operation whose post-trim footprint is `footprint` cells
    pub fn record(&mut self, footprint: u64) {
        self.byte_steps += footprint;
        self.steps += 1;
        self.high_water_mark = self.high_water_mark.max(footprint);
    }

    /// Time-averaged footprint
    pub fn avg_bytes(&self) -> f64 {
        if self.steps == 0 {
            return 0.0;
        }
        self.byte_steps as f64 / self.steps as f64
    }
}
