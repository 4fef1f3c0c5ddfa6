//! Property-based tests for allocator correctness
//!
//! Uses proptest to verify allocator invariants hold across many random operation sequences

use blockfit::{
    Arena, BlockAllocator, FirstFitAllocator, Handle, Placement, SplitFitAllocator,
};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Op {
    Alloc(u64),
    Free(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..=12).prop_map(Op::Alloc),
        any::<usize>().prop_map(Op::Free),
    ]
}

/// Apply `ops` to an allocator, checking the shared invariants after every step
fn drive<A: BlockAllocator>(
    alloc: &mut A,
    ops: &[Op],
) -> Result<Vec<A::Handle>, TestCaseError> {
    let mut live: Vec<A::Handle> = Vec::new();
    let mut last_high_water = 0;

    for op in ops {
        match op {
            Op::Alloc(size) => {
                let handle = alloc.allocate(*size).unwrap();
                prop_assert_eq!(handle.size(), *size);
                live.push(handle);
            }
            Op::Free(idx) => {
                if !live.is_empty() {
                    let handle = live.swap_remove(idx % live.len());
                    alloc.free(handle).unwrap();
                }
            }
        }

        check_invariants(alloc, &live)?;

        let high_water = alloc.stats().high_water_mark;
        prop_assert!(high_water >= last_high_water, "high-water mark decreased");
        prop_assert!(high_water >= alloc.arena().len());
        last_high_water = high_water;
    }

    Ok(live)
}

fn check_invariants<A: BlockAllocator>(
    alloc: &A,
    live: &[A::Handle],
) -> Result<(), TestCaseError> {
    let arena = alloc.arena();

    // Trimmed: empty, or the last cell is used
    prop_assert!(arena.is_empty() || arena.is_used(arena.len() - 1));

    let live_size: u64 = live.iter().map(|h| h.size()).sum();
    prop_assert_eq!(arena.used_cells(), alloc.bytes_used());
    prop_assert_eq!(live_size, alloc.bytes_used());

    let mut cells = HashSet::new();
    for handle in live {
        for placement in handle.placements() {
            for cell in placement.start..placement.end() {
                prop_assert!(arena.is_used(cell), "live cell {} is free", cell);
                prop_assert!(cells.insert(cell), "cell {} owned twice", cell);
            }
        }
    }

    Ok(())
}

/// Every free run inside the arena, including the zero-length run at the end
fn runs_of(arena: &Arena) -> Vec<(u64, u64, bool)> {
    arena
        .free_runs()
        .map(|run| (run.start, run.len, run.at_end))
        .collect()
}

/// Least achievable waste without extending the arena, if any placement fits inside
fn best_in_arena_waste(arena: &Arena, size: u64) -> Option<u64> {
    let runs = runs_of(arena);
    let mut best: Option<u64> = None;
    let mut offer = |waste: u64| best = Some(best.map_or(waste, |b: u64| b.min(waste)));

    for (i, &(_, len0, at_end0)) in runs.iter().enumerate() {
        if len0 >= size {
            offer(len0 - size);
        } else if !at_end0 && len0 > 0 {
            for &(_, len1, _) in &runs[i + 1..] {
                if len1 >= size - len0 {
                    offer(len1 - (size - len0));
                }
            }
        }
    }
    best
}

proptest! {
    #[test]
    fn prop_first_fit_invariants(ops in prop::collection::vec(op_strategy(), 1..120)) {
        let mut alloc = FirstFitAllocator::new();
        drive(&mut alloc, &ops)?;
    }

    #[test]
    fn prop_split_fit_invariants(ops in prop::collection::vec(op_strategy(), 1..120)) {
        let mut alloc = SplitFitAllocator::new();
        let live = drive(&mut alloc, &ops)?;

        for handle in &live {
            let parts = handle.placements();
            prop_assert!(parts.len() == 1 || parts.len() == 2);
            if let [a, b] = parts {
                // Distinct free runs: at least one cell separates the fragments
                prop_assert!(a.end() < b.start, "fragments {:?} and {:?} touch", a, b);
            }
        }
    }

    #[test]
    fn prop_alloc_free_round_trip(
        ops in prop::collection::vec(op_strategy(), 0..80),
        size in 1u64..=20,
    ) {
        let mut first = FirstFitAllocator::new();
        let _first_live = drive(&mut first, &ops)?;
        let arena = first.arena().clone();
        let used = first.bytes_used();
        let handle = first.allocate(size).unwrap();
        first.free(handle).unwrap();
        prop_assert_eq!(first.arena(), &arena);
        prop_assert_eq!(first.bytes_used(), used);

        let mut split = SplitFitAllocator::new();
        let _split_live = drive(&mut split, &ops)?;
        let arena = split.arena().clone();
        let used = split.bytes_used();
        let handle = split.allocate(size).unwrap();
        split.free(handle).unwrap();
        prop_assert_eq!(split.arena(), &arena);
        prop_assert_eq!(split.bytes_used(), used);
    }

    #[test]
    fn prop_first_fit_takes_lowest_fitting_start(
        ops in prop::collection::vec(op_strategy(), 0..80),
        size in 1u64..=12,
    ) {
        let mut alloc = FirstFitAllocator::new();
        let _live = drive(&mut alloc, &ops)?;
        let before = alloc.arena().clone();

        let handle = alloc.allocate(size).unwrap();
        let start = handle.placement().start;

        // Every lower start collides with a used cell
        for skipped in 0..start {
            let collides = (skipped..skipped + size).any(|cell| before.is_used(cell));
            prop_assert!(collides, "start {} was free for {} cells", skipped, size);
        }
        if size == 1 {
            prop_assert_eq!(start, before.first_free());
        }
    }

    #[test]
    fn prop_split_fit_minimizes_waste(
        ops in prop::collection::vec(op_strategy(), 0..80),
        size in 1u64..=16,
    ) {
        let mut alloc = SplitFitAllocator::new();
        let _live = drive(&mut alloc, &ops)?;
        let before = alloc.arena().clone();
        let expected = best_in_arena_waste(&before, size);

        let handle = alloc.allocate(size).unwrap();
        let parts: Vec<Placement> = handle.placements().to_vec();
        let extends = parts.iter().any(|p| p.end() > before.len());

        match expected {
            Some(waste) => {
                prop_assert!(!extends, "extended past end although {:?} fits inside", waste);
                let last = parts[parts.len() - 1];
                let got = before.run_length_at(last.start) - last.size;
                prop_assert_eq!(got, waste);
            }
            None => prop_assert!(extends),
        }
    }
}
