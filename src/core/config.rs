//! Simulation configuration
//!
//! A simulation is a seed plus a list of workloads, loadable from TOML:
//!
//! ```toml
//! seed = 42
//!
//! [[workloads]]
//! n_objects = 10
//! max_object_size = 10
//! n_steps = 100
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 1;

/// Parameters of one warmup + churn run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct WorkloadConfig {
    /// Objects allocated during warmup
    pub n_objects: u64,

    /// Sizes are drawn uniformly from `[1, max_object_size]`
    #[validate(range(min = 1))]
    pub max_object_size: u64,

    /// Coin flips during churn
    pub n_steps: u64,
}

impl WorkloadConfig {
    pub fn new(n_objects: u64, max_object_size: u64, n_steps: u64) -> Self {
        WorkloadConfig {
            n_objects,
            max_object_size,
            n_steps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SimulationConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[validate(length(min = 1))]
    pub workloads: Vec<WorkloadConfig>,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for SimulationConfig {
    /// The two fixed comparison workloads
    fn default() -> Self {
        SimulationConfig {
            seed: DEFAULT_SEED,
            workloads: vec![
                WorkloadConfig::new(10, 10, 100),
                WorkloadConfig::new(100, 100, 1000),
            ],
        }
    }
}

impl SimulationConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        debug!("Loading simulation config from {:?}", path.as_ref());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate the simulation and every workload in it
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        for workload in &self.workloads {
            workload.validate()?;
        }
        Ok(())
    }

    /// Seed for the workload at `index`
    ///
    /// Each workload gets its own stream so that adding one does not perturb the others.
    pub fn seed_for(&self, index: usize) -> u64 {
        self.seed.wrapping_add(index as u64)
    }
}
