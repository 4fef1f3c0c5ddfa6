//! Block placement policies for the simulated arena
//!
//! Two policies share the same bookkeeping:
//! - First-fit: one contiguous run at the lowest start that fits
//! - Split-fit: one or two free runs chosen to minimize waste

pub mod first_fit;
pub mod split_fit;

use crate::arena::Arena;
use crate::error::{BlockfitError, Result};
use crate::stats::Stats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ALLOCATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Cells `[start, start + size)` reserved by one allocation fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub start: u64,
    pub size: u64,
}

impl Placement {
    pub fn new(start: u64, size: u64) -> Self {
        Placement { start, size }
    }

    /// One past the last reserved cell
    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn overlaps(&self, other: &Placement) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// Placement policy implemented by an allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    FirstFit,
    SplitFit,
}

impl Policy {
    /// Short tag used in memory dumps
    pub fn label(&self) -> &'static str {
        match self {
            Policy::FirstFit => "ffs",
            Policy::SplitFit => "dfs",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::FirstFit => f.write_str("first-fit"),
            Policy::SplitFit => f.write_str("split-fit"),
        }
    }
}

/// Identity stamped on every handle: which allocator issued it, and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleTag {
    pub allocator: u64,
    pub serial: u64,
}

/// A live allocation returned by [`BlockAllocator::allocate`]
///
/// Handles are not `Clone`; freeing consumes them.
pub trait Handle {
    fn placements(&self) -> &[Placement];

    fn tag(&self) -> HandleTag;

    /// Total cells reserved across all fragments
    fn size(&self) -> u64 {
        self.placements().iter().map(|p| p.size).sum()
    }
}

/// Block allocator trait
///
/// Defines the interface the workload driver uses to place and release allocations.
pub trait BlockAllocator {
    type Handle: Handle;

    fn policy(&self) -> Policy;

    /// Reserve `size` cells. Never runs out of space; fails only on contract violations.
    fn allocate(&mut self, size: u64) -> Result<Self::Handle>;

    /// Release every cell reserved by `handle`
    fn free(&mut self, handle: Self::Handle) -> Result<()>;

    /// Shared bookkeeping (arena, statistics, usage counters)
    fn ledger(&self) -> &Ledger;

    fn arena(&self) -> &Arena {
        self.ledger().arena()
    }

    fn stats(&self) -> &Stats {
        self.ledger().stats()
    }

    fn bytes_used(&self) -> u64 {
        self.ledger().bytes_used()
    }

    /// Share of the arena that is free (0.0 = perfectly packed)
    fn fragmentation_score(&self) -> f64 {
        self.arena().fragmentation_score()
    }
}

/// Arena, statistics and counters behind every allocator
///
/// Every operation ends by trimming the arena and sampling statistics.
#[derive(Debug)]
pub struct Ledger {
    id: u64,
    arena: Arena,
    stats: Stats,
    bytes_used: u64,
    next_serial: u64,
    live: BTreeSet<u64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_arena(Arena::new())
    }

    /// Start from an existing layout. The arena is taken as-is, without trimming.
    pub fn with_arena(arena: Arena) -> Self {
        Ledger {
            id: NEXT_ALLOCATOR_ID.fetch_add(1, Ordering::Relaxed),
            bytes_used: arena.used_cells(),
            arena,
            stats: Stats::new(),
            next_serial: 0,
            live: BTreeSet::new(),
        }
    }

    /// Unique id of the owning allocator
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn bytes_used(&self) -> u64 {
        self.bytes_used
    }

    /// Handles issued and not yet freed
    pub fn live_handles(&self) -> u64 {
        self.live.len() as u64
    }

    /// Reserve the given placements and close the operation
    ///
    /// On failure, fragments already marked are rolled back.
    pub(crate) fn commit(&mut self, placements: &[Placement]) -> Result<HandleTag> {
        for (idx, placement) in placements.iter().enumerate() {
            if let Err(err) = self.arena.mark_used(placement.start, placement.size) {
                for done in &placements[..idx] {
                    self.arena.mark_free(done.start, done.size)?;
                }
                return Err(err);
            }
        }

        let size: u64 = placements.iter().map(|p| p.size).sum();
        self.bytes_used += size;

        let tag = HandleTag {
            allocator: self.id,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.live.insert(tag.serial);

        self.finish_operation()?;
        Ok(tag)
    }

    /// Release the placements of a handle issued by this allocator and close the operation
    ///
    /// Every fragment is checked before any cell is freed, so a failed
    /// release leaves the ledger unchanged.
    pub(crate) fn release(&mut self, tag: HandleTag, placements: &[Placement]) -> Result<()> {
        if tag.allocator != self.id {
            return Err(BlockfitError::ForeignHandle {
                issued_by: tag.allocator,
                freed_in: self.id,
            });
        }
        if !self.live.contains(&tag.serial) {
            return Err(BlockfitError::StaleHandle {
                serial: tag.serial,
                allocator: self.id,
            });
        }

        let mut size: u64 = 0;
        for (idx, placement) in placements.iter().enumerate() {
            self.arena.check_used(placement.start, placement.size)?;
            if let Some(other) = placements[..idx].iter().find(|p| p.overlaps(placement)) {
                return Err(BlockfitError::Inconsistent(format!(
                    "fragments at {} and {} overlap",
                    other.start, placement.start
                )));
            }
            size += placement.size;
        }
        let remaining = self.bytes_used.checked_sub(size).ok_or_else(|| {
            BlockfitError::Inconsistent(format!(
                "freeing {} cells with only {} in use",
                size, self.bytes_used
            ))
        })?;

        for placement in placements {
            self.arena.mark_free(placement.start, placement.size)?;
        }
        self.bytes_used = remaining;
        self.live.remove(&tag.serial);

        self.finish_operation()
    }

    fn finish_operation(&mut self) -> Result<()> {
        self.arena.trim();
        self.stats.record(self.arena.len());

        if cfg!(debug_assertions) {
            self.check_consistency()?;
        }
        Ok(())
    }

    /// Verify the usage counter against the bitmap
    pub fn check_consistency(&self) -> Result<()> {
        let used = self.arena.used_cells();
        if used != self.bytes_used {
            return Err(BlockfitError::Inconsistent(format!(
                "{} cells marked used but {} cells accounted",
                used, self.bytes_used
            )));
        }
        if !self.arena.is_trimmed() {
            return Err(BlockfitError::Inconsistent(format!(
                "arena of length {} has trailing free cells",
                self.arena.len()
            )));
        }
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
