//! Feasibility checks, response times and cost.
//!
//! The [`Evaluator`] is stateless: it borrows the immutable problem instance
//! and performance index and operates on one [`Solution`] at a time. Checks
//! run in a fixed order and the first violation wins:
//!
//! 1. assignment sanity (deployment coverage, compatibility, replica bounds)
//! 2. colocation
//! 3. memory
//! 4. tier monotonicity
//! 5. per-component response times (utilisation overload surfaces here)
//! 6. per-path response times
//!
//! A [`LocalInfo`] scope lets callers skip the expensive per-component time
//! recomputation for components that a mutation cannot have affected. The
//! observable outcome is identical to a full recheck as long as the scope is
//! honest, which each search operator guarantees and the test-suite verifies.

use crate::error::{Error, Infeasibility, Result, Verdict};
use crate::perf::{PerformanceIndex, PerformanceModel};
use crate::solution::{Solution, SolutionData};
use crate::system::{GlobalConstraint, SystemData};
use crate::types::{Cost, DataSize, ResourceKind, Seconds};
use tracing::trace;

/// The scope of a localized mutation: which components and resources an
/// operator touched since the solution was last fully evaluated.
#[derive(Clone, Debug)]
pub struct LocalInfo {
    components: Vec<bool>,
    resources: [Vec<bool>; ResourceKind::COUNT],
    /// Position hint within the modified component's placement list, when the
    /// mutation moved exactly one partition.
    pub single_partition: Option<usize>,
}

impl LocalInfo {
    /// An empty scope sized for a system.
    #[must_use]
    pub fn sized(system: &SystemData) -> Self {
        Self {
            components: vec![false; system.components.len()],
            resources: [
                vec![false; system.resources.count(ResourceKind::Edge)],
                vec![false; system.resources.count(ResourceKind::Vm)],
                vec![false; system.resources.count(ResourceKind::Faas)],
            ],
            single_partition: None,
        }
    }

    /// Reset to an empty scope, keeping the allocations.
    pub fn clear(&mut self) {
        self.components.iter_mut().for_each(|c| *c = false);
        for kind in &mut self.resources {
            kind.iter_mut().for_each(|r| *r = false);
        }
        self.single_partition = None;
    }

    /// Record that a component's placements changed.
    pub fn mark_component(&mut self, comp: usize) {
        self.components[comp] = true;
    }

    /// Record that a resource gained or lost occupants or replicas.
    pub fn mark_resource(&mut self, kind: ResourceKind, res: usize) {
        self.resources[kind.index()][res] = true;
    }

    /// Whether the component itself was modified.
    #[must_use]
    pub fn component_modified(&self, comp: usize) -> bool {
        self.components[comp]
    }

    /// Whether the resource was modified.
    #[must_use]
    pub fn resource_modified(&self, kind: ResourceKind, res: usize) -> bool {
        self.resources[kind.index()][res]
    }
}

/// Stateless feasibility and cost evaluator.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    system: &'a SystemData,
    perf: &'a PerformanceIndex,
}

impl<'a> Evaluator<'a> {
    /// Borrow the shared problem state.
    #[must_use]
    pub fn new(system: &'a SystemData, perf: &'a PerformanceIndex) -> Self {
        Self { system, perf }
    }

    /// Run every check and refresh all of the solution's caches.
    pub fn evaluate(&self, solution: &mut Solution) -> Result<Verdict> {
        self.run_checks(solution, None)
    }

    /// Run the checks for a solution whose mutations since its last full
    /// evaluation are confined to `scope`. Component times outside the scope
    /// are taken from the solution's caches; everything else is rechecked.
    pub fn evaluate_scoped(&self, solution: &mut Solution, scope: &LocalInfo) -> Result<Verdict> {
        self.run_checks(solution, Some(scope))
    }

    fn run_checks(&self, solution: &mut Solution, scope: Option<&LocalInfo>) -> Result<Verdict> {
        let structural = if let Some(v) = self.check_assignments(&solution.data) {
            Some(v)
        } else if let Some(v) = self.check_colocation(&solution.data) {
            Some(v)
        } else if let Some(v) = self.check_memory(solution) {
            Some(v)
        } else {
            self.check_monotonicity(&solution.data)
        };
        if let Some(violation) = structural {
            solution.feasible = false;
            trace!(?violation, "structural check failed");
            return Ok(Verdict::Infeasible(violation));
        }

        // Per-component response times. A scope lets us reuse cached times
        // for components whose placements and resources are untouched; their
        // utilisations cannot have changed.
        for comp in 0..self.system.components.len() {
            let refresh = match scope {
                None => true,
                Some(info) => self.touches(info, comp, &solution.data),
            };
            if refresh {
                solution.comp_times[comp] = self.component_time(comp, &solution.data)?;
            }
            let time = solution.comp_times[comp];
            if time.is_nan() {
                solution.feasible = false;
                return Ok(Verdict::Infeasible(Infeasibility::UtilisationOverload));
            }
            let slack = self.system.local_constraints[comp].max_response_time - time;
            solution.local_slack[comp] = slack;
            if slack < 0.0 {
                solution.feasible = false;
                return Ok(Verdict::Infeasible(Infeasibility::LocalResponseViolation(comp)));
            }
        }

        // Per-path response times are cheap given component times; always
        // recomputed so that cross-component delays follow placement moves.
        for (path, gc) in self.system.global_constraints.iter().enumerate() {
            let time = self.path_time(gc, &solution.data, &solution.comp_times)?;
            solution.path_times[path] = time;
            let slack = gc.max_response_time - time;
            solution.global_slack[path] = slack;
            if time.is_nan() || slack < 0.0 {
                solution.feasible = false;
                return Ok(Verdict::Infeasible(Infeasibility::GlobalResponseViolation(path)));
            }
        }

        solution.feasible = true;
        Ok(Verdict::Feasible)
    }

    /// Whether a scoped mutation can have changed this component's time.
    fn touches(&self, info: &LocalInfo, comp: usize, data: &SolutionData) -> bool {
        info.component_modified(comp)
            || data
                .used_of(comp)
                .iter()
                .any(|p| info.resource_modified(p.kind, p.res))
    }

    /// Every partition of the chosen deployment placed exactly once, on a
    /// compatible resource, with replica counts in bounds and equal to the
    /// resource's cluster size.
    fn check_assignments(&self, data: &SolutionData) -> Option<Infeasibility> {
        for (comp_idx, comp) in self.system.components.iter().enumerate() {
            let placements = data.used_of(comp_idx);
            let Some(first) = placements.first() else {
                return Some(Infeasibility::InvalidAssignment);
            };
            let dep_idx = match comp.deployment_of_first_partition(first.part) {
                Some(d) => d,
                None => return Some(Infeasibility::InvalidAssignment),
            };
            let deployment = &comp.deployments[dep_idx];
            if placements.len() != deployment.partitions.len() {
                return Some(Infeasibility::InvalidAssignment);
            }
            for (&expected, p) in deployment.partitions.iter().zip(placements) {
                if p.part != expected {
                    return Some(Infeasibility::InvalidAssignment);
                }
                if !self.system.compatibility.allows(comp_idx, p.kind, p.part, p.res) {
                    return Some(Infeasibility::CompatibilityViolation);
                }
                let y = data.y(comp_idx, p.kind, p.part, p.res);
                if y == 0 || y > self.system.resources.number_avail(p.kind, p.res) {
                    return Some(Infeasibility::InvalidAssignment);
                }
                if p.kind.has_replicas() && y != data.replicas(p.kind, p.res) {
                    return Some(Infeasibility::InvalidAssignment);
                }
            }
        }
        None
    }

    /// At most one occupant on any Edge/VM resource whose model forbids
    /// colocation.
    fn check_colocation(&self, data: &SolutionData) -> Option<Infeasibility> {
        for kind in ResourceKind::CLUSTERED {
            let count = self.system.resources.count(kind);
            let mut occupants = vec![0usize; count];
            let mut exclusive = vec![false; count];
            for (comp_idx, placements) in data.used().iter().enumerate() {
                for p in placements.iter().filter(|p| p.kind == kind) {
                    occupants[p.res] += 1;
                    if let Some(model) = self.perf.model(comp_idx, kind, p.part, p.res) {
                        exclusive[p.res] |= !model.allows_colocation();
                    }
                }
            }
            if occupants
                .iter()
                .zip(&exclusive)
                .any(|(&n, &strict)| strict && n > 1)
            {
                return Some(Infeasibility::ColocationViolation);
            }
        }
        None
    }

    /// Aggregate partition memory within each resource's capacity; Edge/VM
    /// capacity scales with the cluster size. Fills the per-resource memory
    /// slack cache as a side effect.
    fn check_memory(&self, solution: &mut Solution) -> Option<Infeasibility> {
        let data = &solution.data;
        let mut occupation: [Vec<DataSize>; ResourceKind::COUNT] = [
            vec![0.0; self.system.resources.count(ResourceKind::Edge)],
            vec![0.0; self.system.resources.count(ResourceKind::Vm)],
            vec![0.0; self.system.resources.count(ResourceKind::Faas)],
        ];
        for (comp_idx, placements) in data.used().iter().enumerate() {
            let partitions = &self.system.components[comp_idx].partitions;
            for p in placements {
                occupation[p.kind.index()][p.res] += partitions[p.part].memory;
            }
        }

        let mut violated = false;
        for kind in ResourceKind::ALL {
            for res in 0..self.system.resources.count(kind) {
                let capacity = if kind.has_replicas() {
                    data.replicas(kind, res) as f64 * self.system.resources.memory(kind, res)
                } else {
                    self.system.resources.memory(kind, res)
                };
                let slack = capacity - occupation[kind.index()][res];
                solution.memory_slack[kind.index()][res] = slack;
                violated |= slack < 0.0;
            }
        }
        violated.then_some(Infeasibility::MemoryViolation)
    }

    /// Once a component reaches VM or FaaS, no later partition may fall back
    /// to Edge.
    fn check_monotonicity(&self, data: &SolutionData) -> Option<Infeasibility> {
        for placements in data.used() {
            let mut max_edge: Option<usize> = None;
            let mut min_cloud: Option<usize> = None;
            for p in placements {
                match p.kind {
                    ResourceKind::Edge => max_edge = Some(max_edge.map_or(p.part, |m| m.max(p.part))),
                    _ => {
                        if min_cloud.is_none() {
                            min_cloud = Some(p.part);
                        }
                    }
                }
            }
            if let (Some(edge), Some(cloud)) = (max_edge, min_cloud) {
                if edge > cloud {
                    return Some(Infeasibility::MonotonicityViolation);
                }
            }
        }
        None
    }

    /// Aggregate utilisation of an Edge/VM resource across every co-resident
    /// partition. Recomputed on demand from the placement list; the demand
    /// tensor is a read-only cache.
    #[must_use]
    pub fn utilisation(&self, kind: ResourceKind, res: usize, data: &SolutionData) -> f64 {
        let mut total = 0.0;
        for (comp_idx, placements) in data.used().iter().enumerate() {
            for p in placements.iter().filter(|p| p.kind == kind && p.res == res) {
                let demand = self.perf.demand(comp_idx, kind, p.part, res);
                let lambda = self.system.components[comp_idx].partitions[p.part].lambda;
                let replicas = data.y(comp_idx, kind, p.part, res);
                total += demand * lambda / replicas as f64;
            }
        }
        total
    }

    /// Response time of one component: the sum of its partitions' predicted
    /// times plus the network delay between consecutive placements on
    /// different resources. NaN flags utilisation overload.
    pub fn component_time(&self, comp: usize, data: &SolutionData) -> Result<Seconds> {
        let placements = data.used_of(comp);
        let partitions = &self.system.components[comp].partitions;
        let mut total = 0.0;

        for p in placements {
            let Some(model) = self.perf.model(comp, p.kind, p.part, p.res) else {
                return Ok(f64::NAN);
            };
            let time = match model {
                PerformanceModel::QueueEdgeVm { demand, .. } => {
                    let utilisation = self.utilisation(p.kind, p.res, data);
                    if utilisation >= 1.0 {
                        return Ok(f64::NAN);
                    }
                    demand / (1.0 - utilisation)
                }
                PerformanceModel::FaasDynamic { warm, cold } => {
                    let platform = self.system.resources.faas(p.res);
                    self.perf.predictor().predict(
                        partitions[p.part].lambda,
                        *warm,
                        *cold,
                        platform.idle_time_before_kill,
                    )?
                }
                PerformanceModel::FaasStatic { constant, .. } => *constant,
            };
            total += time;
        }

        for pair in placements.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.endpoint() != b.endpoint() {
                total += self.network_delay(a.endpoint(), b.endpoint(), partitions[a.part].data_size)?;
            }
        }

        Ok(total)
    }

    /// End-to-end time of a constrained path: component times plus the delay
    /// between the last partition of each component and the first of the
    /// next.
    fn path_time(
        &self,
        constraint: &GlobalConstraint,
        data: &SolutionData,
        comp_times: &[Seconds],
    ) -> Result<Seconds> {
        let mut total = 0.0;
        for &comp in &constraint.components {
            let time = comp_times[comp];
            if time.is_nan() {
                return Ok(f64::NAN);
            }
            total += time;
        }

        for pair in constraint.components.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let (Some(exit), Some(entry)) = (data.used_of(from).last(), data.used_of(to).first())
            else {
                return Ok(f64::NAN);
            };
            if exit.endpoint() != entry.endpoint() {
                let data_size = self.system.components[from].partitions[exit.part].data_size;
                total += self.network_delay(exit.endpoint(), entry.endpoint(), data_size)?;
            }
        }

        Ok(total)
    }

    /// Minimum transfer time between two resources' layers over the network
    /// domains containing both. Fatal when no domain connects them: the
    /// problem instance is ill-posed.
    pub fn network_delay(
        &self,
        from: (ResourceKind, usize),
        to: (ResourceKind, usize),
        data_size: DataSize,
    ) -> Result<Seconds> {
        let layer_a = self.system.resources.layer_name(from.0, from.1);
        let layer_b = self.system.resources.layer_name(to.0, to.1);
        let domains_a = self.system.domains_of_layer(layer_a);
        let domains_b = self.system.domains_of_layer(layer_b);

        // Both lists are sorted; walk them in lockstep.
        let mut best: Option<Seconds> = None;
        let (mut i, mut j) = (0, 0);
        while i < domains_a.len() && j < domains_b.len() {
            match domains_a[i].cmp(&domains_b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    let delay = self.system.network_domains[domains_a[i]].transfer_time(data_size);
                    best = Some(best.map_or(delay, |b: Seconds| b.min(delay)));
                    i += 1;
                    j += 1;
                }
            }
        }

        best.ok_or_else(|| Error::NoNetworkDomain(layer_a.to_string(), layer_b.to_string()))
    }

    /// Total operational cost, written into the solution's cache.
    ///
    /// Each resource is billed once however many partitions share it: Edge/VM
    /// at `replicas * cost`, FaaS at `cost * warm_demand * lambda * horizon`.
    pub fn total_cost(&self, solution: &mut Solution) -> Cost {
        let mut billed: [Vec<bool>; ResourceKind::COUNT] = [
            vec![false; self.system.resources.count(ResourceKind::Edge)],
            vec![false; self.system.resources.count(ResourceKind::Vm)],
            vec![false; self.system.resources.count(ResourceKind::Faas)],
        ];
        let mut cost = 0.0;

        for (comp_idx, placements) in solution.data.used().iter().enumerate() {
            for p in placements {
                if billed[p.kind.index()][p.res] {
                    continue;
                }
                billed[p.kind.index()][p.res] = true;
                let rate = self.system.resources.cost(p.kind, p.res);
                if p.kind.has_replicas() {
                    cost += solution.data.y(comp_idx, p.kind, p.part, p.res) as f64 * rate;
                } else {
                    let warm = self
                        .perf
                        .model(comp_idx, p.kind, p.part, p.res)
                        .and_then(PerformanceModel::warm_demand)
                        .unwrap_or(0.0);
                    let lambda = self.system.components[comp_idx].partitions[p.part].lambda;
                    cost += rate * warm * lambda * self.system.horizon;
                }
            }
        }

        solution.total_cost = cost;
        cost
    }
}
