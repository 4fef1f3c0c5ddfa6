//! Run output: per-step memory dumps and end-of-run summaries
//!
//! Dump layout, split-fit first:
//!
//! ```text
//! avg_bytes   =12.500000
//! dfs memory: 1110111
//! high_water  =   9
//! avg_bytes   =13.250000
//! ffs memory: 111011101
//! ```

use crate::allocator::{BlockAllocator, Policy};
use crate::config::WorkloadConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// End-of-run figures for one allocator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySummary {
    pub policy: Policy,
    pub high_water_mark: u64,
    pub avg_bytes: f64,
    pub byte_steps: u64,
    pub steps: u64,
    pub bytes_used: u64,
    pub live_handles: u64,
    pub fragmentation: f64,
    pub free_runs: usize,
}

impl PolicySummary {
    pub fn of<A: BlockAllocator>(alloc: &A) -> Self {
        let stats = alloc.stats();
        PolicySummary {
            policy: alloc.policy(),
            high_water_mark: stats.high_water_mark,
            avg_bytes: stats.avg_bytes(),
            byte_steps: stats.byte_steps,
            steps: stats.steps,
            bytes_used: alloc.bytes_used(),
            live_handles: alloc.ledger().live_handles(),
            fragmentation: alloc.fragmentation_score(),
            free_runs: alloc.arena().free_run_count(),
        }
    }
}

/// End-of-run figures for one workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub workload: WorkloadConfig,
    pub live_objects: usize,
    pub first: PolicySummary,
    pub second: PolicySummary,
}

/// Write the dump of one allocator
///
/// First-fit dumps carry the high-water mark; split-fit dumps do not.
pub fn write_allocator<W: Write, A: BlockAllocator>(out: &mut W, alloc: &A) -> Result<()> {
    let policy = alloc.policy();
    if policy == Policy::FirstFit {
        writeln!(out, "high_water  ={:4}", alloc.stats().high_water_mark)?;
    }
    writeln!(out, "avg_bytes   ={:.6}", alloc.stats().avg_bytes())?;
    writeln!(out, "{} memory: {}", policy.label(), alloc.arena())?;
    Ok(())
}

/// Write the dumps of both allocators, second (split-fit) first
pub fn write_snapshot<W, A, B>(out: &mut W, first: &A, second: &B) -> Result<()>
where
    W: Write,
    A: BlockAllocator,
    B: BlockAllocator,
{
    write_allocator(out, second)?;
    write_allocator(out, first)
}

/// Write a summary as one line of JSON
pub fn write_summary_json<W: Write>(out: &mut W, summary: &RunSummary) -> Result<()> {
    serde_json::to_writer(&mut *out, summary)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::first_fit::FirstFitAllocator;
    use crate::allocator::split_fit::SplitFitAllocator;

    #[test]
    fn test_first_fit_dump() {
        let mut alloc = FirstFitAllocator::new();
        alloc.allocate(3).unwrap();
        alloc.allocate(2).unwrap();

        let mut out = Vec::new();
        write_allocator(&mut out, &alloc).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "high_water  =   5\navg_bytes   =4.000000\nffs memory: 11111\n"
        );
    }

    #[test]
    fn test_snapshot_order() {
        let mut first = FirstFitAllocator::new();
        let mut second = SplitFitAllocator::new();
        first.allocate(1).unwrap();
        second.allocate(1).unwrap();

        let mut out = Vec::new();
        write_snapshot(&mut out, &first, &second).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "avg_bytes   =1.000000",
                "dfs memory: 1",
                "high_water  =   1",
                "avg_bytes   =1.000000",
                "ffs memory: 1",
            ]
        );
    }

    #[test]
    fn test_summary_json() {
        let mut first = FirstFitAllocator::new();
        let second = SplitFitAllocator::new();
        first.allocate(4).unwrap();

        let summary = RunSummary {
            workload: WorkloadConfig::new(1, 4, 0),
            live_objects: 1,
            first: PolicySummary::of(&first),
            second: PolicySummary::of(&second),
        };

        let mut out = Vec::new();
        write_summary_json(&mut out, &summary).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(parsed["first"]["policy"], "first-fit");
        assert_eq!(parsed["first"]["high_water_mark"], 4);
        assert_eq!(parsed["second"]["policy"], "split-fit");
        assert_eq!(parsed["second"]["steps"], 0);
        assert_eq!(parsed["workload"]["max_object_size"], 4);
    }
}
