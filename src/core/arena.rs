//! Occupancy bitmap for the simulated arena
//!
//! One bit per cell, packed into machine words:
//! - 0 = free cell
//! - 1 = used cell
//!
//! The bitmap grows on demand when a range is marked past its end and is
//! trimmed of trailing free cells after every allocator operation, so its
//! length is the footprint of the arena.

use crate::error::{BlockfitError, Result};
use bitvec::prelude::*;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// A maximal run of free cells
///
/// `at_end` is set for the run that touches the end of the bitmap. That run
/// may be empty (a zero-length run at `len`) when the last cell is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRun {
    pub start: u64,
    pub len: u64,
    pub at_end: bool,
}

impl FreeRun {
    pub fn end(&self) -> u64 {
        self.start + self.len
    }
}

/// Growable occupancy bitmap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arena {
    bits: BitVec<usize, Lsb0>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length in cells (the footprint once trimmed)
    pub fn len(&self) -> u64 {
        self.bits.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Check whether a cell is used. Cells past the end are free.
    pub fn is_used(&self, cell: u64) -> bool {
        self.bits
            .get(cell as usize)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    /// Number of used cells
    pub fn used_cells(&self) -> u64 {
        self.bits.count_ones() as u64
    }

    /// Number of consecutive free cells starting at `cell`
    ///
    /// Returns 0 if `cell` is at or past the end, or if it is used.
    pub fn run_length_at(&self, cell: u64) -> u64 {
        let len = self.bits.len();
        let cell = cell as usize;
        if cell >= len {
            return 0;
        }
        self.bits[cell..].first_one().unwrap_or(len - cell) as u64
    }

    /// Lowest free cell, or `len` if every cell is used
    pub fn first_free(&self) -> u64 {
        self.bits.first_zero().unwrap_or(self.bits.len()) as u64
    }

    /// Mark `[start, start + size)` as used, growing the bitmap as needed
    ///
    /// Fails without touching the bitmap if any cell in the range is already used.
    pub fn mark_used(&mut self, start: u64, size: u64) -> Result<()> {
        let range = checked_range(start, size)?;

        let overlap_end = range.end.min(self.bits.len());
        if range.start < overlap_end {
            if let Some(offset) = self.bits[range.start..overlap_end].first_one() {
                return Err(BlockfitError::CellAlreadyUsed {
                    cell: (range.start + offset) as u64,
                });
            }
        }

        if range.end > self.bits.len() {
            self.bits.resize(range.end, false);
        }
        self.bits[range].fill(true);
        Ok(())
    }

    /// Mark `[start, start + size)` as free
    ///
    /// Fails without touching the bitmap if any cell in the range is not used.
    pub fn mark_free(&mut self, start: u64, size: u64) -> Result<()> {
        let range = self.used_range(start, size)?;
        self.bits[range].fill(false);
        Ok(())
    }

    /// Check that every cell in `[start, start + size)` is used, without changing anything
    pub fn check_used(&self, start: u64, size: u64) -> Result<()> {
        self.used_range(start, size).map(|_| ())
    }

    fn used_range(&self, start: u64, size: u64) -> Result<Range<usize>> {
        let range = checked_range(start, size)?;

        if range.end > self.bits.len() {
            let cell = range.start.max(self.bits.len()) as u64;
            return Err(BlockfitError::CellNotUsed { cell });
        }
        if let Some(offset) = self.bits[range.clone()].first_zero() {
            return Err(BlockfitError::CellNotUsed {
                cell: (range.start + offset) as u64,
            });
        }
        Ok(range)
    }

    /// Drop trailing free cells
    pub fn trim(&mut self) {
        let keep = self.bits.last_one().map_or(0, |last| last + 1);
        self.bits.truncate(keep);
    }

    /// Check that the bitmap carries no trailing free cells
    pub fn is_trimmed(&self) -> bool {
        self.bits.last().map_or(true, |bit| *bit)
    }

    /// Iterate the free runs starting at or after `from`, left to right
    ///
    /// The last run yielded always has `at_end` set.
    pub fn free_runs_from(&self, from: u64) -> FreeRuns<'_> {
        FreeRuns {
            arena: self,
            cursor: from.min(self.len()),
            done: false,
        }
    }

    pub fn free_runs(&self) -> FreeRuns<'_> {
        self.free_runs_from(0)
    }

    /// Number of free runs strictly inside the bitmap
    pub fn free_run_count(&self) -> usize {
        self.free_runs().filter(|run| run.len > 0).count()
    }

    /// Share of the bitmap that is free (0.0 when the bitmap is empty)
    pub fn fragmentation_score(&self) -> f64 {
        if self.bits.is_empty() {
            return 0.0;
        }
        let free = self.bits.count_zeros() as f64;
        free / self.bits.len() as f64
    }
}

/// Iterator over free runs, see [`Arena::free_runs_from`]
pub struct FreeRuns<'a> {
    arena: &'a Arena,
    cursor: u64,
    done: bool,
}

impl Iterator for FreeRuns<'_> {
    type Item = FreeRun;

    fn next(&mut self) -> Option<FreeRun> {
        if self.done {
            return None;
        }

        let len = self.arena.len();
        let bits = &self.arena.bits;
        let start = match bits[self.cursor as usize..].first_zero() {
            Some(offset) => self.cursor + offset as u64,
            None => len,
        };

        let run_len = self.arena.run_length_at(start);
        let at_end = start + run_len == len;
        self.done = at_end;
        self.cursor = start + run_len;

        Some(FreeRun {
            start,
            len: run_len,
            at_end,
        })
    }
}

fn checked_range(start: u64, size: u64) -> Result<Range<usize>> {
    let overflow = || BlockfitError::RangeOverflow { start, size };
    let end = start.checked_add(size).ok_or_else(overflow)?;
    let start = usize::try_from(start).map_err(|_| overflow())?;
    let end = usize::try_from(end).map_err(|_| overflow())?;
    Ok(start..end)
}

impl fmt::Display for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter().by_vals() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for Arena {
    type Err = BlockfitError;

    /// Parse the `0`/`1` rendering produced by `Display`. The result is not trimmed.
    fn from_str(s: &str) -> Result<Self> {
        let mut bits = BitVec::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '0' => bits.push(false),
                '1' => bits.push(true),
                other => return Err(BlockfitError::InvalidBitmap(other)),
            }
        }
        Ok(Arena { bits })
    }
}
