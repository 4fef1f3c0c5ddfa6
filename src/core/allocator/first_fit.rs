//! First-fit allocator
//!
//! Places each allocation as one contiguous run at the lowest start whose
//! cells are all free or past the end of the arena. Cost is linear in the
//! arena length.

use super::{BlockAllocator, Handle, HandleTag, Ledger, Placement, Policy};
use crate::arena::Arena;
use crate::error::{BlockfitError, Result};
use tracing::debug;

/// Allocation returned by [`FirstFitAllocator`]
#[derive(Debug, PartialEq, Eq)]
pub struct FirstFitHandle {
    placement: Placement,
    tag: HandleTag,
}

impl FirstFitHandle {
    pub fn placement(&self) -> Placement {
        self.placement
    }
}

impl Handle for FirstFitHandle {
    fn placements(&self) -> &[Placement] {
        std::slice::from_ref(&self.placement)
    }

    fn tag(&self) -> HandleTag {
        self.tag
    }
}

#[derive(Debug, Default)]
pub struct FirstFitAllocator {
    ledger: Ledger,
}

impl FirstFitAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing layout
    pub fn with_arena(arena: Arena) -> Self {
        FirstFitAllocator {
            ledger: Ledger::with_arena(arena),
        }
    }

    /// Lowest start where `size` cells fit
    ///
    /// On a collision at `cell`, the search restarts just past it.
    fn find_start(&self, size: u64) -> u64 {
        let arena = self.ledger.arena();
        let mut start: u64 = 0;
        'search: loop {
            let window_end = start.saturating_add(size).min(arena.len());
            for cell in start..window_end {
                if arena.is_used(cell) {
                    start = cell + 1;
                    continue 'search;
                }
            }
            return start;
        }
    }
}

impl BlockAllocator for FirstFitAllocator {
    type Handle = FirstFitHandle;

    fn policy(&self) -> Policy {
        Policy::FirstFit
    }

    fn allocate(&mut self, size: u64) -> Result<FirstFitHandle> {
        if size == 0 {
            return Err(BlockfitError::ZeroSizeRequest);
        }

        let placement = Placement::new(self.find_start(size), size);
        let tag = self.ledger.commit(&[placement])?;
        debug!(
            "first-fit: placed {} cells at {} (footprint {})",
            size,
            placement.start,
            self.ledger.arena().len()
        );

        Ok(FirstFitHandle { placement, tag })
    }

    fn free(&mut self, handle: FirstFitHandle) -> Result<()> {
        self.ledger.release(handle.tag, handle.placements())?;
        debug!(
            "first-fit: freed {} cells at {}",
            handle.placement.size, handle.placement.start
        );
        Ok(())
    }

    fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
