//! Multi-start randomized constructor.
//!
//! Each trial walks the state machine
//! `Fresh -> PlacementDone -> (Infeasible | Feasible -> Shrunk -> Submitted)`
//! and never revisits `PlacementDone`: candidates are drawn, partitions are
//! placed, replicas are sampled, the whole solution is evaluated once, and a
//! feasible result goes through the cluster-shrink pass before being offered
//! to the elite container.
//!
//! Trials are embarrassingly parallel. The only shared mutation is
//! [`EliteResult::add`]; everything else is trial-local.

use crate::context::ProblemContext;
use crate::driver::CancelFlag;
use crate::elite::EliteResult;
use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::solution::{SelectedResources, Solution};
use crate::types::{Placement, ResourceKind};
use crate::utils::mix_seed;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

/// Configuration of a random-greedy run.
pub struct RandomGreedy {
    /// Number of independent trials.
    pub max_iterations: usize,
    /// Capacity of the returned elite container.
    pub top_k: usize,
    /// When true, trial `i` always draws from the same RNG stream, whatever
    /// the thread scheduling.
    pub reproducibility: bool,
    /// Base seed for reproducible runs.
    pub seed: u64,
    /// Runtime mode: lock the Edge fleet to this set and forbid new VM picks
    /// in layers the set already covers.
    pub fixed: Option<SelectedResources>,
}

impl Default for RandomGreedy {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            top_k: 3,
            reproducibility: false,
            seed: 121_298,
            fixed: None,
        }
    }
}

impl RandomGreedy {
    /// Run all trials and return the elite container.
    pub fn run(&self, ctx: &ProblemContext) -> Result<EliteResult> {
        self.run_with_cancel(ctx, &CancelFlag::new())
    }

    /// Run all trials, polling `cancel` between trials. In-flight trials are
    /// never aborted; a raised flag only stops new trials from starting.
    pub fn run_with_cancel(&self, ctx: &ProblemContext, cancel: &CancelFlag) -> Result<EliteResult> {
        let elite = EliteResult::new(self.top_k);
        info!(
            trials = self.max_iterations,
            top_k = self.top_k,
            runtime_mode = self.fixed.is_some(),
            "starting random greedy"
        );

        let trial = |it: usize| -> Result<()> {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let mut rng = self.trial_rng(it);
            let solution = self.step(ctx, &mut rng)?;
            if solution.is_feasible() {
                debug!(trial = it, cost = solution.total_cost(), "feasible trial");
                elite.add(solution);
            }
            Ok(())
        };

        if ctx.perf.serial_only() {
            // The predictor serializes calls anyway; don't fight it.
            info!("dynamic predictor is serial-only; running trials on one worker");
            for it in 0..self.max_iterations {
                trial(it)?;
            }
        } else {
            (0..self.max_iterations).into_par_iter().try_for_each(trial)?;
        }

        info!(kept = elite.len(), "random greedy finished");
        Ok(elite)
    }

    /// The RNG for trial `it`. Under reproducibility the stream depends only
    /// on `(seed, it)`.
    fn trial_rng(&self, it: usize) -> StdRng {
        if self.reproducibility {
            StdRng::seed_from_u64(mix_seed(self.seed, it as u64))
        } else {
            StdRng::from_entropy()
        }
    }

    /// One full trial: construct, evaluate, shrink, cost.
    pub fn step(&self, ctx: &ProblemContext, rng: &mut StdRng) -> Result<Solution> {
        let mut solution = self.construct(ctx, rng)?;
        let evaluator = ctx.evaluator();

        if evaluator.evaluate(&mut solution)?.is_feasible() {
            shrink_clusters(ctx, &mut solution)?;
        }

        Ok(solution)
    }

    /// Draw candidate resources and place every component.
    fn construct(&self, ctx: &ProblemContext, rng: &mut StdRng) -> Result<Solution> {
        let system = &ctx.system;
        let mut candidates = [
            vec![false; system.resources.count(ResourceKind::Edge)],
            vec![false; system.resources.count(ResourceKind::Vm)],
            // All FaaS platforms are always candidates; they are what makes
            // the per-partition intersection non-empty.
            vec![true; system.resources.count(ResourceKind::Faas)],
        ];

        match &self.fixed {
            None => {
                for kind in ResourceKind::CLUSTERED {
                    for layer in system.layers_of_kind(kind) {
                        let pick = layer.members[rng.gen_range(0..layer.members.len())];
                        candidates[kind.index()][pick] = true;
                    }
                }
            }
            Some(fixed) => {
                // Edge fleet is locked as-is from the previous solution.
                candidates[ResourceKind::Edge.index()] = fixed.edge.clone();
                // VM layers already represented keep their selection; the
                // rest are opened with one random pick, as at design time.
                for layer in system.layers_of_kind(ResourceKind::Vm) {
                    let covered = layer.members.iter().any(|&res| fixed.vm[res]);
                    if covered {
                        for &res in &layer.members {
                            candidates[ResourceKind::Vm.index()][res] = fixed.vm[res];
                        }
                    } else {
                        let pick = layer.members[rng.gen_range(0..layer.members.len())];
                        candidates[ResourceKind::Vm.index()][pick] = true;
                    }
                }
            }
        }

        let mut solution = Solution::new(system);

        // Components are visited in DAG topological order.
        for comp_idx in 0..system.components.len() {
            let component = &system.components[comp_idx];
            let deployment =
                &component.deployments[rng.gen_range(0..component.deployments.len())];

            for &part in &deployment.partitions {
                let pick = pick_resource(system, &candidates, comp_idx, part, rng)?;
                solution.data_mut().place(comp_idx, Placement::new(part, pick.0, pick.1));
            }
        }

        // Sample a cluster size for every Edge/VM resource the placement
        // touched; co-resident partitions share it.
        for kind in ResourceKind::CLUSTERED {
            for res in 0..system.resources.count(kind) {
                if solution.data().replicas(kind, res) > 0 {
                    let avail = system.resources.number_avail(kind, res);
                    let replicas = rng.gen_range(1..=avail);
                    solution.data_mut().set_cluster_size(kind, res, replicas);
                }
            }
        }

        Ok(solution)
    }
}

/// Intersect candidates with compatibility for one partition and pick one
/// resource uniformly. FaaS candidates join with probability 0.5 when any
/// Edge/VM candidate is compatible, otherwise unconditionally.
fn pick_resource(
    system: &crate::system::SystemData,
    candidates: &[Vec<bool>; ResourceKind::COUNT],
    comp: usize,
    part: usize,
    rng: &mut StdRng,
) -> Result<(ResourceKind, usize)> {
    let mut pool: Vec<(ResourceKind, usize)> = Vec::new();
    for kind in ResourceKind::CLUSTERED {
        for res in system.compatibility.compatible_of_kind(comp, kind, part) {
            if candidates[kind.index()][res] {
                pool.push((kind, res));
            }
        }
    }

    let faas_prob = if pool.is_empty() { 1.0 } else { 0.5 };
    for res in system
        .compatibility
        .compatible_of_kind(comp, ResourceKind::Faas, part)
    {
        if candidates[ResourceKind::Faas.index()][res] && rng.gen_bool(faas_prob) {
            pool.push((ResourceKind::Faas, res));
        }
    }

    if pool.is_empty() {
        // Loading guarantees a FaaS fallback per partition, so an empty pool
        // means the instance bypassed that validation.
        let component = &system.components[comp];
        return Err(Error::ConfigInconsistent(format!(
            "partition `{}` of component `{}` has no candidate resource in this trial; \
             the instance was not validated at load",
            component.partitions[part].name, component.name
        )));
    }

    Ok(pool[rng.gen_range(0..pool.len())])
}

/// Apply the cluster-shrink pass to every Edge/VM resource of a feasible
/// solution and refresh its cost cache.
///
/// Shrinking only ever lowers cost, so every feasible decrement is kept.
/// Applying the pass to its own output is a no-op.
pub fn shrink_clusters(ctx: &ProblemContext, solution: &mut Solution) -> Result<()> {
    let evaluator = ctx.evaluator();
    for kind in ResourceKind::CLUSTERED {
        for res in 0..ctx.system.resources.count(kind) {
            if solution.data().replicas(kind, res) > 1 {
                reduce_cluster_size(&evaluator, solution, kind, res)?;
            }
        }
    }
    evaluator.total_cost(solution);
    Ok(())
}

/// Shrink one Edge/VM cluster while the solution stays feasible; the last
/// feasible size wins.
fn reduce_cluster_size(
    evaluator: &Evaluator<'_>,
    solution: &mut Solution,
    kind: ResourceKind,
    res: usize,
) -> Result<()> {
    loop {
        let current = solution.data().replicas(kind, res);
        if current <= 1 {
            return Ok(());
        }
        let mut candidate = solution.clone();
        candidate.data_mut().set_cluster_size(kind, res, current - 1);
        if evaluator.evaluate(&mut candidate)?.is_feasible() {
            *solution = candidate;
        } else {
            return Ok(());
        }
    }
}
