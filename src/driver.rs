//! End-to-end search orchestration.

use crate::context::ProblemContext;
use crate::elite::EliteResult;
use crate::error::{Error, Result};
use crate::greedy::RandomGreedy;
use crate::local_search::LocalSearch;
use crate::solution::{SelectedResources, Solution};
use crate::utils::mix_seed;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Cooperative cancellation flag, polled between trials.
///
/// Raising the flag stops new trials from starting; trials already running
/// always complete, so a cancelled run still returns every solution accepted
/// so far.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A fresh, unraised flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs [`RandomGreedy`], then refines each elite seed with a parallel
/// [`LocalSearch`], and returns the merged elite container.
pub struct SearchDriver {
    /// The constructor phase.
    pub greedy: RandomGreedy,
    /// Iterations per local-search worker.
    pub ls_iterations: usize,
    /// Capacity of the returned elite container.
    pub ls_top_k: usize,
    /// Worker threads for both phases; `None` uses one per logical CPU.
    pub threads: Option<usize>,
}

impl Default for SearchDriver {
    fn default() -> Self {
        Self {
            greedy: RandomGreedy::default(),
            ls_iterations: 1000,
            ls_top_k: 3,
            threads: None,
        }
    }
}

impl SearchDriver {
    /// Run both phases to completion.
    ///
    /// Fails with [`Error::NoFeasibleFound`] when the constructor phase
    /// produced no feasible seed.
    pub fn run(&self, ctx: &ProblemContext) -> Result<EliteResult> {
        self.run_with_cancel(ctx, &CancelFlag::new())
    }

    /// Run both phases, polling `cancel` between trials and between seeds.
    pub fn run_with_cancel(&self, ctx: &ProblemContext, cancel: &CancelFlag) -> Result<EliteResult> {
        if let Some(threads) = self.threads {
            // Global pool configuration only succeeds once per process;
            // later runs keep the first setting.
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .ok();
        }
        info!(
            workers = self.threads.unwrap_or_else(num_cpus::get),
            "starting search driver"
        );

        let rg_elite = self.greedy.run_with_cancel(ctx, cancel)?;
        let seeds = rg_elite.into_solutions();
        if seeds.is_empty() {
            return Err(Error::NoFeasibleFound);
        }
        info!(seeds = seeds.len(), "refining elite seeds with local search");

        let refined = EliteResult::new(self.ls_top_k);
        let fixed = self.greedy.fixed.as_ref();
        let refine = |(rank, seed): (usize, Solution)| -> Result<()> {
            if cancel.is_cancelled() {
                // Keep the unrefined seed rather than dropping it.
                refined.add(seed);
                return Ok(());
            }
            let rng = self.worker_rng(rank);
            let search = LocalSearch::new(ctx, seed, fixed, rng);
            let (best, _counters) = search.run(self.ls_iterations)?;
            refined.add(best);
            Ok(())
        };

        if ctx.perf.serial_only() {
            for entry in seeds.into_iter().enumerate() {
                refine(entry)?;
            }
        } else {
            seeds
                .into_par_iter()
                .enumerate()
                .try_for_each(refine)?;
        }

        info!(kept = refined.len(), best_cost = ?refined.best_cost(), "search driver finished");
        Ok(refined)
    }

    /// Re-run against a previous solution's resource selection (the runtime
    /// formulation): the Edge fleet is locked and VM layers already covered
    /// stay within the selection.
    pub fn run_runtime(
        &self,
        ctx: &ProblemContext,
        fixed: SelectedResources,
        cancel: &CancelFlag,
    ) -> Result<EliteResult> {
        let driver = SearchDriver {
            greedy: RandomGreedy {
                max_iterations: self.greedy.max_iterations,
                top_k: self.greedy.top_k,
                reproducibility: self.greedy.reproducibility,
                seed: self.greedy.seed,
                fixed: Some(fixed),
            },
            ls_iterations: self.ls_iterations,
            ls_top_k: self.ls_top_k,
            threads: self.threads,
        };
        driver.run_with_cancel(ctx, cancel)
    }

    /// RNG for the local search over the seed at `rank`; tied to the rank so
    /// reproducible runs are schedule-independent.
    fn worker_rng(&self, rank: usize) -> StdRng {
        if self.greedy.reproducibility {
            // Offset the stream away from the greedy trials.
            StdRng::seed_from_u64(mix_seed(self.greedy.seed ^ 0x4c53_4c53, rank as u64))
        } else {
            StdRng::from_entropy()
        }
    }
}
