//! # blockfit - Block Placement Simulator
//!
//! `blockfit` measures how two placement policies pack a growable arena under
//! the same randomized stream of allocations and frees:
//!
//! - **First-fit**: each allocation is one contiguous run at the lowest start that fits
//! - **Split-fit**: an allocation may be split across two free runs, chosen to
//!   minimize leftover space in the run it cuts into
//!
//! Addresses are abstract cell indices into an occupancy bitmap. The bitmap
//! grows on demand and sheds trailing free cells after every operation, so its
//! length is the footprint. Each allocator reports its high-water mark and
//! time-averaged footprint.
//!
//! ```text
//!   arena:  1 1 0 0 1 1 0 1 1 1
//!               └─┘     ┆
//!   split-fit alloc(3) → [(2, 2), (6, 1)]
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use blockfit::{BlockAllocator, FirstFitAllocator, Handle, SplitFitAllocator};
//!
//! # fn main() -> blockfit::Result<()> {
//! let mut split = SplitFitAllocator::new();
//! let a = split.allocate(2)?;
//! let _b = split.allocate(2)?;
//! split.free(a)?;
//!
//! // The two-cell hole plus one cell past the end
//! let c = split.allocate(3)?;
//! assert_eq!(c.placements().len(), 2);
//! assert_eq!(split.arena().to_string(), "11111");
//!
//! let mut first = FirstFitAllocator::new();
//! first.allocate(3)?;
//! assert_eq!(first.stats().high_water_mark, 3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Running a comparison
//!
//! ```rust
//! use blockfit::{Workload, WorkloadConfig};
//!
//! # fn main() -> blockfit::Result<()> {
//! let mut workload = Workload::standard(WorkloadConfig::new(10, 10, 100), 1);
//! let summary = workload.run(|_| Ok(()))?;
//! assert_eq!(summary.first.bytes_used, summary.second.bytes_used);
//! # Ok(())
//! # }
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: allocators are plain owned values
//! - **No coalescing or relocation**: placements never move
//! - **No alignment or metadata overhead** is modelled

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{allocator, arena, config, error, report, stats, workload};

pub use crate::core::{
    allocator::{
        first_fit::{FirstFitAllocator, FirstFitHandle},
        split_fit::{SplitFitAllocator, SplitFitHandle},
        BlockAllocator, Handle, HandleTag, Ledger, Placement, Policy,
    },
    arena::{Arena, FreeRun},
    config::{SimulationConfig, WorkloadConfig, DEFAULT_SEED},
    error::{BlockfitError, Result},
    report::{write_snapshot, write_summary_json, PolicySummary, RunSummary},
    stats::Stats,
    workload::{RandomSource, SeededSource, Workload},
};
