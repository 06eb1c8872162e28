//! Neighborhood search over a feasible seed.
//!
//! Three operators are tried in order on every iteration:
//!
//! 1. `migrate_vm_to_edge` -- pull VM placements back onto selected Edge
//!    devices;
//! 2. `migrate_faas_to_vm` -- pull FaaS placements onto selected VMs;
//! 3. `change_deployment` -- re-split a component and re-place its
//!    partitions.
//!
//! The two migrations accept any feasible move that does not increase cost
//! (they trade tiers before they trade money); changing a deployment must
//! strictly reduce cost. A rejected operator restores the scratch solution
//! from the last accepted one, so the search never leaves feasible space.

use crate::context::ProblemContext;
use crate::error::Result;
use crate::eval::LocalInfo;
use crate::solution::{SelectedResources, Solution};
use crate::types::{Placement, ResourceKind};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::trace;

/// How many times each operator was accepted, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperatorCounters {
    /// Accepted VM-to-Edge migrations.
    pub vm_to_edge: usize,
    /// Accepted FaaS-to-VM migrations.
    pub faas_to_vm: usize,
    /// Accepted deployment changes.
    pub change_deployment: usize,
}

/// One local-search worker over one feasible seed.
pub struct LocalSearch<'a> {
    ctx: &'a ProblemContext,
    selected: SelectedResources,
    best: Solution,
    cur: Solution,
    scope: LocalInfo,
    rng: StdRng,
    counters: OperatorCounters,
}

impl<'a> LocalSearch<'a> {
    /// Start from a feasible, costed seed.
    ///
    /// The candidate pools of the operators are the Edge/VM resources the
    /// seed already uses, widened by `fixed` in the runtime formulation.
    #[must_use]
    pub fn new(
        ctx: &'a ProblemContext,
        seed: Solution,
        fixed: Option<&SelectedResources>,
        rng: StdRng,
    ) -> Self {
        let mut selected = seed.selected_resources(&ctx.system);
        if let Some(fixed) = fixed {
            selected.union(fixed);
        }
        let cur = seed.clone();
        let scope = LocalInfo::sized(&ctx.system);
        Self {
            ctx,
            selected,
            best: seed,
            cur,
            scope,
            rng,
            counters: OperatorCounters::default(),
        }
    }

    /// Run `max_it` iterations and return the best solution found with the
    /// per-operator acceptance counters.
    pub fn run(mut self, max_it: usize) -> Result<(Solution, OperatorCounters)> {
        for _ in 0..max_it {
            self.migrate_vm_to_edge()?;
            self.migrate_faas_to_vm()?;
            self.change_deployment()?;
        }
        trace!(counters = ?self.counters, cost = self.best.total_cost(), "local search done");
        Ok((self.best, self.counters))
    }

    /// Walk a random component's placements and move VM partitions onto
    /// selected Edge devices. Stops at the first FaaS placement: monotonicity
    /// makes any later Edge move illegal.
    fn migrate_vm_to_edge(&mut self) -> Result<()> {
        let comp = self.rng.gen_range(0..self.ctx.system.components.len());
        let placements: Vec<Placement> = self.best.data().used_of(comp).to_vec();
        for (pos, p) in placements.iter().enumerate() {
            match p.kind {
                ResourceKind::Faas => break,
                ResourceKind::Vm => {
                    if self.try_migrate(comp, pos, *p, ResourceKind::Edge)? {
                        self.counters.vm_to_edge += 1;
                    }
                }
                ResourceKind::Edge => {}
            }
        }
        Ok(())
    }

    /// Walk a random component's placements and move FaaS partitions onto
    /// selected VMs.
    fn migrate_faas_to_vm(&mut self) -> Result<()> {
        let comp = self.rng.gen_range(0..self.ctx.system.components.len());
        let placements: Vec<Placement> = self.best.data().used_of(comp).to_vec();
        for (pos, p) in placements.iter().enumerate() {
            if p.kind == ResourceKind::Faas && self.try_migrate(comp, pos, *p, ResourceKind::Vm)? {
                self.counters.faas_to_vm += 1;
            }
        }
        Ok(())
    }

    /// Move one placement to a uniformly drawn selected resource of
    /// `new_kind`. Accepted when feasible at equal or lower cost.
    fn try_migrate(
        &mut self,
        comp: usize,
        pos: usize,
        old: Placement,
        new_kind: ResourceKind,
    ) -> Result<bool> {
        let mask = self.selected.of_kind(new_kind);
        let pool: Vec<usize> = self
            .ctx
            .system
            .compatibility
            .compatible_of_kind(comp, new_kind, old.part)
            .filter(|&res| mask[res])
            .collect();
        if pool.is_empty() {
            return Ok(false);
        }
        let target = pool[self.rng.gen_range(0..pool.len())];

        self.scope.clear();
        self.scope.mark_component(comp);
        self.scope.mark_resource(old.kind, old.res);
        self.scope.mark_resource(new_kind, target);
        self.scope.single_partition = Some(pos);

        self.cur.data_mut().migrate(comp, pos, new_kind, target);

        let evaluator = self.ctx.evaluator();
        if evaluator.evaluate_scoped(&mut self.cur, &self.scope)?.is_feasible() {
            let cost = evaluator.total_cost(&mut self.cur);
            if cost <= self.best.total_cost() {
                self.best = self.cur.clone();
                return Ok(true);
            }
        }
        self.cur = self.best.clone();
        Ok(false)
    }

    /// Re-split a random component with a (usually) different deployment and
    /// re-place every partition from the selected pools. Accepted only on a
    /// strict cost improvement.
    fn change_deployment(&mut self) -> Result<()> {
        let system = &self.ctx.system;
        let comp = self.rng.gen_range(0..system.components.len());
        let component = &system.components[comp];
        let n_deps = component.deployments.len();

        let current_first = self.best.data().used_of(comp).first().map(|p| p.part);
        let mut dep_idx = self.rng.gen_range(0..n_deps);
        if component.deployments[dep_idx].partitions.first().copied() == current_first {
            // One reroll; with a single deployment this re-places the same
            // split on fresh resources.
            dep_idx = (dep_idx + 1) % n_deps;
        }
        let deployment = &component.deployments[dep_idx];

        self.scope.clear();
        self.scope.mark_component(comp);
        for p in self.best.data().used_of(comp) {
            self.scope.mark_resource(p.kind, p.res);
        }

        self.cur.data_mut().clear_component(comp);

        for &part in &deployment.partitions {
            let mut pool: Vec<(ResourceKind, usize)> = Vec::new();
            for kind in ResourceKind::CLUSTERED {
                let mask = self.selected.of_kind(kind);
                for res in system.compatibility.compatible_of_kind(comp, kind, part) {
                    if mask[res] {
                        pool.push((kind, res));
                    }
                }
            }
            let faas_prob = if pool.is_empty() { 1.0 } else { 0.5 };
            for res in system
                .compatibility
                .compatible_of_kind(comp, ResourceKind::Faas, part)
            {
                if self.rng.gen_bool(faas_prob) {
                    pool.push((ResourceKind::Faas, res));
                }
            }

            if pool.is_empty() {
                // Nothing to place this partition on; abandon the move.
                self.cur = self.best.clone();
                return Ok(());
            }
            let (kind, res) = pool[self.rng.gen_range(0..pool.len())];

            self.cur.data_mut().place(comp, Placement::new(part, kind, res));
            self.scope.mark_resource(kind, res);
        }

        let evaluator = self.ctx.evaluator();
        if evaluator.evaluate_scoped(&mut self.cur, &self.scope)?.is_feasible() {
            let cost = evaluator.total_cost(&mut self.cur);
            if cost < self.best.total_cost() {
                self.best = self.cur.clone();
                self.counters.change_deployment += 1;
                return Ok(());
            }
        }
        self.cur = self.best.clone();
        Ok(())
    }
}
