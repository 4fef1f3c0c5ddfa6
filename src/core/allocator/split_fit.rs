//! Split two-block allocator
//!
//! An allocation of `size` cells may be satisfied by one free run, or by two
//! distinct free runs whose lengths sum to `size`: the first run is consumed
//! whole and the second contributes a prefix. Among all such placements the
//! allocator picks the one with the least waste:
//!
//! ```text
//!   single block:  waste = L0 - size
//!   two blocks:    waste = L1 - (size - L0)
//! ```
//!
//! Candidates that stay inside the arena always beat candidates that extend
//! past its end. Among the latter, the one consuming the longest free tail
//! wins. Ties go to the candidate found first in the left-to-right scan.
//!
//! Enumeration walks free runs with a nested scan, so one allocation costs
//! `O(len²)` in the worst case.

use super::{BlockAllocator, Handle, HandleTag, Ledger, Placement, Policy};
use crate::arena::{Arena, FreeRun};
use crate::error::{BlockfitError, Result};
use std::cmp::Reverse;
use tracing::{debug, trace};

/// Allocation returned by [`SplitFitAllocator`]: one or two fragments in ascending order
#[derive(Debug, PartialEq, Eq)]
pub struct SplitFitHandle {
    parts: Vec<Placement>,
    tag: HandleTag,
}

impl SplitFitHandle {
    pub fn is_split(&self) -> bool {
        self.parts.len() == 2
    }
}

impl Handle for SplitFitHandle {
    fn placements(&self) -> &[Placement] {
        &self.parts
    }

    fn tag(&self) -> HandleTag {
        self.tag
    }
}

/// Rank of a candidate placement; lower is better
///
/// Variant order puts every in-arena candidate ahead of every end-extending one.
/// A `PastEnd` candidate with an empty tail still ranks and can win, so a
/// hole followed by extension beats placing the whole request past the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FitScore {
    InArena { waste: u64 },
    PastEnd { tail: Reverse<u64> },
}

#[derive(Debug, Clone)]
struct Candidate {
    score: FitScore,
    parts: Vec<Placement>,
}

/// Best candidate seen so far; only a strictly better score replaces it
#[derive(Debug, Default)]
struct BestFit {
    best: Option<Candidate>,
}

impl BestFit {
    fn offer(&mut self, score: FitScore, parts: &[Placement]) {
        trace!("split-fit candidate {:?} at {:?}", score, parts);
        let better = match &self.best {
            Some(current) => score < current.score,
            None => true,
        };
        if better {
            self.best = Some(Candidate {
                score,
                parts: parts.to_vec(),
            });
        }
    }

    fn into_inner(self) -> Option<Candidate> {
        self.best
    }
}

#[derive(Debug, Default)]
pub struct SplitFitAllocator {
    ledger: Ledger,
}

impl SplitFitAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing layout, which may carry trailing free cells
    pub fn with_arena(arena: Arena) -> Self {
        SplitFitAllocator {
            ledger: Ledger::with_arena(arena),
        }
    }

    fn search(&self, size: u64) -> Result<Candidate> {
        let arena = self.ledger.arena();
        let mut best = BestFit::default();

        for first in arena.free_runs() {
            if first.len >= size {
                best.offer(
                    FitScore::InArena {
                        waste: first.len - size,
                    },
                    &[Placement::new(first.start, size)],
                );
            } else if first.at_end {
                // Extend past the end, keeping as much of the free tail as possible
                best.offer(
                    FitScore::PastEnd {
                        tail: Reverse(first.len),
                    },
                    &[Placement::new(first.start, size)],
                );
            } else if first.len > 0 {
                Self::search_pairs(arena, first, size, &mut best);
            }
        }

        best.into_inner().ok_or_else(|| {
            BlockfitError::Inconsistent(format!(
                "no placement found for {} cells in arena of length {}",
                size,
                arena.len()
            ))
        })
    }

    /// Offer every pairing of `first` (consumed whole) with a later run
    fn search_pairs(arena: &Arena, first: FreeRun, size: u64, best: &mut BestFit) {
        let remaining = size - first.len;
        let head = Placement::new(first.start, first.len);

        for second in arena.free_runs_from(first.end()) {
            let tail = Placement::new(second.start, remaining);
            if second.len >= remaining {
                best.offer(
                    FitScore::InArena {
                        waste: second.len - remaining,
                    },
                    &[head, tail],
                );
            } else if second.at_end {
                best.offer(
                    FitScore::PastEnd {
                        tail: Reverse(second.len),
                    },
                    &[head, tail],
                );
                break;
            }
        }
    }
}

impl BlockAllocator for SplitFitAllocator {
    type Handle = SplitFitHandle;

    fn policy(&self) -> Policy {
        Policy::SplitFit
    }

    fn allocate(&mut self, size: u64) -> Result<SplitFitHandle> {
        if size == 0 {
            return Err(BlockfitError::ZeroSizeRequest);
        }

        let Candidate { score, parts } = self.search(size)?;
        let tag = self.ledger.commit(&parts)?;
        debug!(
            "split-fit: placed {} cells at {:?} ({:?}, footprint {})",
            size,
            parts,
            score,
            self.ledger.arena().len()
        );

        Ok(SplitFitHandle { parts, tag })
    }

    fn free(&mut self, handle: SplitFitHandle) -> Result<()> {
        self.ledger.release(handle.tag, &handle.parts)?;
        debug!("split-fit: freed {:?}", handle.parts);
        Ok(())
    }

    fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
