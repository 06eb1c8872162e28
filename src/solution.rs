//! Mutable placement state and the solution JSON format.

use crate::error::{Error, Result};
use crate::system::SystemData;
use crate::types::{Cost, DataSize, Placement, ResourceKind, Seconds};
use serde_json::{Map, Value, json};
use std::path::Path;

/// The raw placement tensors of a candidate solution.
///
/// Three views of the same assignment are kept in sync:
///
/// - `y[c][k][p][r]` -- replica count used by `(c, p)` on resource `r` of
///   kind `k` (0 or 1 for FaaS, 0 when unused);
/// - `used[c]` -- the placements of component `c`, sorted by partition index;
/// - `n_used[k][r]` -- the cluster size of Edge/VM resource `r`, shared by
///   every partition co-resident on it.
///
/// All mutation goes through [`place`](Self::place),
/// [`migrate`](Self::migrate), [`clear_component`](Self::clear_component) and
/// [`set_cluster_size`](Self::set_cluster_size), which keep the three views
/// consistent.
#[derive(Clone, Debug)]
pub struct SolutionData {
    y: Vec<Vec<Vec<Vec<usize>>>>,
    used: Vec<Vec<Placement>>,
    n_used: [Vec<usize>; 2],
}

impl SolutionData {
    fn sized(system: &SystemData) -> Self {
        let res_counts = [
            system.resources.count(ResourceKind::Edge),
            system.resources.count(ResourceKind::Vm),
            system.resources.count(ResourceKind::Faas),
        ];
        let y = system
            .components
            .iter()
            .map(|c| {
                res_counts
                    .iter()
                    .map(|&count| vec![vec![0; count]; c.partitions.len()])
                    .collect()
            })
            .collect();
        Self {
            y,
            used: vec![Vec::new(); system.components.len()],
            n_used: [vec![0; res_counts[0]], vec![0; res_counts[1]]],
        }
    }

    /// Replica count used by `(comp, part)` on `(kind, res)`; 0 when unused.
    #[inline]
    #[must_use]
    pub fn y(&self, comp: usize, kind: ResourceKind, part: usize, res: usize) -> usize {
        self.y[comp][kind.index()][part][res]
    }

    /// Ordered placements of every component.
    #[must_use]
    pub fn used(&self) -> &[Vec<Placement>] {
        &self.used
    }

    /// Ordered placements of one component.
    #[must_use]
    pub fn used_of(&self, comp: usize) -> &[Placement] {
        &self.used[comp]
    }

    /// Cluster size of an Edge/VM resource; 0 when it was never started.
    #[inline]
    #[must_use]
    pub fn replicas(&self, kind: ResourceKind, res: usize) -> usize {
        debug_assert!(kind.has_replicas());
        self.n_used[kind.index()][res]
    }

    /// Assign a partition to a resource, keeping `used` sorted and the
    /// replica views consistent. Placing on an idle Edge/VM resource starts
    /// its cluster at size 1.
    pub fn place(&mut self, comp: usize, placement: Placement) {
        let Placement { part, kind, res } = placement;
        let replicas = if kind.has_replicas() {
            if self.n_used[kind.index()][res] == 0 {
                self.n_used[kind.index()][res] = 1;
            }
            self.n_used[kind.index()][res]
        } else {
            1
        };
        self.y[comp][kind.index()][part][res] = replicas;

        let pos = self.used[comp].partition_point(|p| p.part < part);
        self.used[comp].insert(pos, placement);
    }

    /// Move the placement at position `pos` of `used[comp]` onto another
    /// resource. The partition index is unchanged.
    pub fn migrate(&mut self, comp: usize, pos: usize, kind: ResourceKind, res: usize) {
        let old = self.used[comp][pos];
        self.y[comp][old.kind.index()][old.part][old.res] = 0;
        let replicas = if kind.has_replicas() {
            if self.n_used[kind.index()][res] == 0 {
                self.n_used[kind.index()][res] = 1;
            }
            self.n_used[kind.index()][res]
        } else {
            1
        };
        self.y[comp][kind.index()][old.part][res] = replicas;
        self.used[comp][pos] = Placement::new(old.part, kind, res);
    }

    /// Remove every placement of a component, zeroing its `y` entries.
    /// Cluster sizes of resources that other components still use are kept.
    pub fn clear_component(&mut self, comp: usize) {
        let placements = std::mem::take(&mut self.used[comp]);
        for p in placements {
            self.y[comp][p.kind.index()][p.part][p.res] = 0;
        }
    }

    /// Set the cluster size of an Edge/VM resource, updating the `y` entry of
    /// every partition co-resident on it.
    pub fn set_cluster_size(&mut self, kind: ResourceKind, res: usize, replicas: usize) {
        debug_assert!(kind.has_replicas());
        self.n_used[kind.index()][res] = replicas;
        for comp in 0..self.used.len() {
            for i in 0..self.used[comp].len() {
                let p = self.used[comp][i];
                if p.kind == kind && p.res == res {
                    self.y[comp][kind.index()][p.part][res] = replicas;
                }
            }
        }
    }
}

/// The Edge and VM resources a solution actually uses, as membership masks.
///
/// Extracted from a design-time solution and fed back into the runtime
/// formulation: the Edge fleet is locked to this set, and new VM picks are
/// forbidden in any layer the set already covers.
#[derive(Clone, Debug, Default)]
pub struct SelectedResources {
    /// `edge[r]` is true when Edge resource `r` is selected.
    pub edge: Vec<bool>,
    /// `vm[r]` is true when VM resource `r` is selected.
    pub vm: Vec<bool>,
}

impl SelectedResources {
    /// An empty selection sized for a system.
    #[must_use]
    pub fn empty(system: &SystemData) -> Self {
        Self {
            edge: vec![false; system.resources.count(ResourceKind::Edge)],
            vm: vec![false; system.resources.count(ResourceKind::Vm)],
        }
    }

    /// The mask for one clustered kind.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is [`ResourceKind::Faas`].
    #[must_use]
    pub fn of_kind(&self, kind: ResourceKind) -> &[bool] {
        match kind {
            ResourceKind::Edge => &self.edge,
            ResourceKind::Vm => &self.vm,
            ResourceKind::Faas => panic!("FaaS resources are never pre-selected"),
        }
    }

    /// Merge another selection into this one.
    pub fn union(&mut self, other: &SelectedResources) {
        for (a, b) in self.edge.iter_mut().zip(&other.edge) {
            *a |= b;
        }
        for (a, b) in self.vm.iter_mut().zip(&other.vm) {
            *a |= b;
        }
    }
}

/// A candidate solution: placement data plus the evaluation caches.
///
/// Owned exclusively by one search worker while mutated; moved into an
/// [`EliteResult`](crate::elite::EliteResult) on submission.
#[derive(Clone, Debug)]
pub struct Solution {
    pub(crate) data: SolutionData,
    pub(crate) feasible: bool,
    pub(crate) total_cost: Cost,
    pub(crate) comp_times: Vec<Seconds>,
    pub(crate) path_times: Vec<Seconds>,
    pub(crate) memory_slack: [Vec<DataSize>; ResourceKind::COUNT],
    pub(crate) local_slack: Vec<Seconds>,
    pub(crate) global_slack: Vec<Seconds>,
}

impl Solution {
    /// An empty, unevaluated solution sized for a system.
    #[must_use]
    pub fn new(system: &SystemData) -> Self {
        let comps = system.components.len();
        let paths = system.global_constraints.len();
        Self {
            data: SolutionData::sized(system),
            feasible: false,
            total_cost: f64::INFINITY,
            comp_times: vec![f64::NAN; comps],
            path_times: vec![f64::NAN; paths],
            memory_slack: [
                vec![f64::NAN; system.resources.count(ResourceKind::Edge)],
                vec![f64::NAN; system.resources.count(ResourceKind::Vm)],
                vec![f64::NAN; system.resources.count(ResourceKind::Faas)],
            ],
            local_slack: vec![f64::NAN; comps],
            global_slack: vec![f64::NAN; paths],
        }
    }

    /// The placement tensors.
    #[must_use]
    pub fn data(&self) -> &SolutionData {
        &self.data
    }

    /// Mutable access to the placement tensors. Invalidates nothing by
    /// itself; re-evaluate before trusting the caches again.
    #[must_use]
    pub fn data_mut(&mut self) -> &mut SolutionData {
        &mut self.data
    }

    /// Whether the last evaluation found every constraint satisfied.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    /// Total operational cost; `+inf` until computed.
    #[must_use]
    pub fn total_cost(&self) -> Cost {
        self.total_cost
    }

    /// Response time of a component from the last evaluation.
    #[must_use]
    pub fn component_time(&self, comp: usize) -> Seconds {
        self.comp_times[comp]
    }

    /// End-to-end response time of a constrained path.
    #[must_use]
    pub fn path_time(&self, path: usize) -> Seconds {
        self.path_times[path]
    }

    /// Remaining memory on a resource under the current cluster sizes, from
    /// the last evaluation.
    #[must_use]
    pub fn memory_slack(&self, kind: ResourceKind, res: usize) -> DataSize {
        self.memory_slack[kind.index()][res]
    }

    /// Slack of a component against its local constraint.
    #[must_use]
    pub fn local_slack(&self, comp: usize) -> Seconds {
        self.local_slack[comp]
    }

    /// Slack of a path against its global constraint.
    #[must_use]
    pub fn global_slack(&self, path: usize) -> Seconds {
        self.global_slack[path]
    }

    /// The Edge and VM resources this solution uses.
    #[must_use]
    pub fn selected_resources(&self, system: &SystemData) -> SelectedResources {
        let mut selected = SelectedResources::empty(system);
        for placements in self.data.used() {
            for p in placements {
                match p.kind {
                    ResourceKind::Edge => selected.edge[p.res] = true,
                    ResourceKind::Vm => selected.vm[p.res] = true,
                    ResourceKind::Faas => {}
                }
            }
        }
        selected
    }

    /// Serialise the solution in the interchange JSON format.
    #[must_use]
    pub fn to_json(&self, system: &SystemData) -> Value {
        let mut components = Map::new();
        for (comp_idx, placements) in self.data.used().iter().enumerate() {
            let comp = &system.components[comp_idx];
            let mut comp_obj = Map::new();
            for p in placements {
                let res_cost =
                    system.resources.cost(p.kind, p.res) * self.data.y(comp_idx, p.kind, p.part, p.res) as f64;
                let resource_obj = if p.kind == ResourceKind::Faas {
                    let faas = system.resources.faas(p.res);
                    json!({
                        "description": faas.description,
                        "cost": res_cost,
                        "memory": faas.memory,
                        "idle_time_before_kill": faas.idle_time_before_kill,
                        "transition_cost": faas.transition_cost,
                    })
                } else {
                    json!({
                        "description": system.resources.description(p.kind, p.res),
                        "cost": res_cost,
                        "memory": system.resources.memory(p.kind, p.res),
                        "number": self.data.y(comp_idx, p.kind, p.part, p.res),
                    })
                };
                let part_name = &comp.partitions[p.part].name;
                let cl_name = system.resources.layer_name(p.kind, p.res);
                let res_name = system.resources.name(p.kind, p.res);
                comp_obj
                    .entry(part_name.clone())
                    .or_insert_with(|| Value::Object(Map::new()))
                    .as_object_mut()
                    .expect("partition entry is an object")
                    .entry(cl_name.to_string())
                    .or_insert_with(|| Value::Object(Map::new()))
                    .as_object_mut()
                    .expect("layer entry is an object")
                    .insert(res_name.to_string(), resource_obj);
            }
            comp_obj.insert("response_time".into(), json!(self.comp_times[comp_idx]));
            comp_obj.insert(
                "response_time_threshold".into(),
                json!(system.local_constraints[comp_idx].max_response_time),
            );
            components.insert(comp.name.clone(), Value::Object(comp_obj));
        }

        let mut paths = Map::new();
        for (path_idx, gc) in system.global_constraints.iter().enumerate() {
            let names: Vec<&str> = gc
                .components
                .iter()
                .map(|&c| system.components[c].name.as_str())
                .collect();
            paths.insert(
                gc.path.clone(),
                json!({
                    "components": names,
                    "path_response_time": self.path_times[path_idx],
                    "path_response_time_threshold": gc.max_response_time,
                }),
            );
        }

        json!({
            "Lambda": system.lambda,
            "components": components,
            "global_constraints": paths,
            "total_cost": self.total_cost,
        })
    }

    /// Write the solution to a JSON file.
    pub fn write_json<P: AsRef<Path>>(&self, system: &SystemData, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.to_json(system))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Rebuild a solution from its interchange JSON form.
    ///
    /// The placement tensors and the cached response times and cost are
    /// restored; the feasibility flag is left unset until the solution is
    /// re-evaluated.
    pub fn from_json(value: &Value, system: &SystemData) -> Result<Self> {
        let mut solution = Solution::new(system);

        let components = value
            .get("components")
            .and_then(Value::as_object)
            .ok_or(Error::ConfigMissingField("components"))?;
        for (comp_name, comp_value) in components {
            let comp_idx = system.component_index(comp_name).ok_or_else(|| {
                Error::ConfigInconsistent(format!(
                    "solution file references undeclared component `{comp_name}`"
                ))
            })?;
            let comp_obj = comp_value.as_object().ok_or_else(|| Error::ConfigBadValue {
                field: format!("components.{comp_name}"),
                reason: "expected an object".into(),
            })?;

            for (key, entry) in comp_obj {
                match key.as_str() {
                    "response_time" => {
                        solution.comp_times[comp_idx] =
                            entry.as_f64().ok_or_else(|| Error::ConfigBadValue {
                                field: format!("components.{comp_name}.response_time"),
                                reason: "expected a number".into(),
                            })?;
                    }
                    "response_time_threshold" => {}
                    part_name => {
                        let part = system.components[comp_idx]
                            .partition_index(part_name)
                            .ok_or_else(|| {
                                Error::ConfigInconsistent(format!(
                                    "solution file references unknown partition `{part_name}` \
                                     of `{comp_name}`"
                                ))
                            })?;
                        restore_partition(system, &mut solution, comp_idx, part, entry)?;
                    }
                }
            }
        }

        if let Some(paths) = value.get("global_constraints").and_then(Value::as_object) {
            for (path_name, path_value) in paths {
                let path_idx = system.path_index(path_name).ok_or_else(|| {
                    Error::ConfigInconsistent(format!(
                        "solution file references unknown path `{path_name}`"
                    ))
                })?;
                solution.path_times[path_idx] = path_value
                    .get("path_response_time")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| Error::ConfigBadValue {
                        field: format!("global_constraints.{path_name}.path_response_time"),
                        reason: "expected a number".into(),
                    })?;
            }
        }

        solution.total_cost = value
            .get("total_cost")
            .and_then(Value::as_f64)
            .ok_or(Error::ConfigMissingField("total_cost"))?;
        Ok(solution)
    }
}

fn restore_partition(
    system: &SystemData,
    solution: &mut Solution,
    comp: usize,
    part: usize,
    entry: &Value,
) -> Result<()> {
    let layers = entry.as_object().ok_or_else(|| Error::ConfigBadValue {
        field: "components.<partition>".into(),
        reason: "expected an object of computational layers".into(),
    })?;
    for resources in layers.values() {
        let resources = resources.as_object().ok_or_else(|| Error::ConfigBadValue {
            field: "components.<partition>.<layer>".into(),
            reason: "expected an object of resources".into(),
        })?;
        for (res_name, res_value) in resources {
            let (kind, res) = system.resource_index(res_name).ok_or_else(|| {
                Error::ConfigInconsistent(format!(
                    "solution file references undeclared resource `{res_name}`"
                ))
            })?;
            solution.data.place(comp, Placement::new(part, kind, res));
            if kind.has_replicas() {
                let number = res_value
                    .get("number")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| Error::ConfigBadValue {
                        field: format!("<resource `{res_name}`>.number"),
                        reason: "expected a positive integer".into(),
                    })? as usize;
                solution.data.set_cluster_size(kind, res, number);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_keeps_used_sorted_by_partition() {
        // A tiny hand-rolled data block: 1 component, 3 partitions, 2 edges.
        let mut data = SolutionData {
            y: vec![vec![vec![vec![0; 2]; 3], vec![vec![0; 0]; 3], vec![vec![0; 0]; 3]]],
            used: vec![Vec::new()],
            n_used: [vec![0; 2], Vec::new()],
        };
        data.place(0, Placement::new(2, ResourceKind::Edge, 0));
        data.place(0, Placement::new(0, ResourceKind::Edge, 1));
        data.place(0, Placement::new(1, ResourceKind::Edge, 0));

        let parts: Vec<usize> = data.used_of(0).iter().map(|p| p.part).collect();
        assert_eq!(parts, vec![0, 1, 2]);
        // First placement started the cluster at size 1.
        assert_eq!(data.replicas(ResourceKind::Edge, 0), 1);
        assert_eq!(data.y(0, ResourceKind::Edge, 2, 0), 1);
    }

    #[test]
    fn cluster_resize_updates_every_co_resident_entry() {
        let mut data = SolutionData {
            y: vec![vec![vec![vec![0; 1]; 2], vec![vec![0; 0]; 2], vec![vec![0; 0]; 2]]],
            used: vec![Vec::new()],
            n_used: [vec![0; 1], Vec::new()],
        };
        data.place(0, Placement::new(0, ResourceKind::Edge, 0));
        data.place(0, Placement::new(1, ResourceKind::Edge, 0));
        data.set_cluster_size(ResourceKind::Edge, 0, 3);

        assert_eq!(data.y(0, ResourceKind::Edge, 0, 0), 3);
        assert_eq!(data.y(0, ResourceKind::Edge, 1, 0), 3);
        assert_eq!(data.replicas(ResourceKind::Edge, 0), 3);
    }
}
