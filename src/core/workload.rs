//! Randomized workload driving two allocators in lockstep
//!
//! Both allocators see exactly the same sequence of requests. Their handles
//! live in two parallel tables that are appended and swap-removed at the same
//! index, so entry `i` of each table always names the same logical object.

use crate::allocator::first_fit::FirstFitAllocator;
use crate::allocator::split_fit::SplitFitAllocator;
use crate::allocator::{BlockAllocator, Handle};
use crate::config::WorkloadConfig;
use crate::error::{BlockfitError, Result};
use crate::report::{PolicySummary, RunSummary};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use validator::Validate;

/// Pseudo-random integers uniform over `[0, 2^31)`
pub trait RandomSource {
    fn next_u31(&mut self) -> u64;
}

/// Seeded [`RandomSource`]; the same seed always yields the same stream
#[derive(Debug, Clone)]
pub struct SeededSource {
    rng: StdRng,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        SeededSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededSource {
    fn next_u31(&mut self) -> u64 {
        self.rng.gen_range(0..1u64 << 31)
    }
}

/// Drives two allocators with one request stream
pub struct Workload<A: BlockAllocator, B: BlockAllocator, R: RandomSource> {
    config: WorkloadConfig,
    first: A,
    second: B,
    first_handles: Vec<A::Handle>,
    second_handles: Vec<B::Handle>,
    rng: R,
}

impl Workload<FirstFitAllocator, SplitFitAllocator, SeededSource> {
    /// First-fit against split-fit, seeded with `seed`
    pub fn standard(config: WorkloadConfig, seed: u64) -> Self {
        Workload::new(
            config,
            FirstFitAllocator::new(),
            SplitFitAllocator::new(),
            SeededSource::new(seed),
        )
    }
}

impl<A: BlockAllocator, B: BlockAllocator, R: RandomSource> Workload<A, B, R> {
    pub fn new(config: WorkloadConfig, first: A, second: B, rng: R) -> Self {
        Workload {
            config,
            first,
            second,
            first_handles: Vec::new(),
            second_handles: Vec::new(),
            rng,
        }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }

    pub fn first_handles(&self) -> &[A::Handle] {
        &self.first_handles
    }

    pub fn second_handles(&self) -> &[B::Handle] {
        &self.second_handles
    }

    /// Number of live objects
    pub fn live_objects(&self) -> usize {
        self.first_handles.len()
    }

    /// Run warmup and churn to completion
    ///
    /// `observe` sees the allocators before every churn step and once more at the end.
    pub fn run<F>(&mut self, mut observe: F) -> Result<RunSummary>
    where
        F: FnMut(&Self) -> Result<()>,
    {
        self.config.validate()?;

        info!(
            "Warmup: {} objects of up to {} cells",
            self.config.n_objects, self.config.max_object_size
        );
        for _ in 0..self.config.n_objects {
            self.allocate_both()?;
        }

        info!("Churn: {} steps", self.config.n_steps);
        for _ in 0..self.config.n_steps {
            observe(&*self)?;
            self.step()?;
        }
        observe(&*self)?;

        Ok(self.summary())
    }

    /// One churn step: a fair coin chooses between allocating and freeing
    pub fn step(&mut self) -> Result<()> {
        if self.rng.next_u31() % 2 == 0 {
            self.allocate_both()
        } else {
            self.free_random()
        }
    }

    fn draw_size(&mut self) -> Result<u64> {
        let offset = self
            .rng
            .next_u31()
            .checked_rem(self.config.max_object_size)
            .ok_or(BlockfitError::ZeroSizeRequest)?;
        Ok(1 + offset)
    }

    fn allocate_both(&mut self) -> Result<()> {
        let size = self.draw_size()?;
        self.first_handles.push(self.first.allocate(size)?);
        self.second_handles.push(self.second.allocate(size)?);
        Ok(())
    }

    fn free_random(&mut self) -> Result<()> {
        let live = self.first_handles.len();
        if live == 0 {
            return Ok(());
        }
        if self.second_handles.len() != live {
            return Err(BlockfitError::Inconsistent(format!(
                "handle tables diverged: {} vs {}",
                live,
                self.second_handles.len()
            )));
        }

        let idx = (self.rng.next_u31() % live as u64) as usize;
        let first = self.first_handles.swap_remove(idx);
        let second = self.second_handles.swap_remove(idx);
        debug_assert_eq!(first.size(), second.size());

        self.first.free(first)?;
        self.second.free(second)?;
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            workload: self.config.clone(),
            live_objects: self.live_objects(),
            first: PolicySummary::of(&self.first),
            second: PolicySummary::of(&self.second),
        }
    }
}
