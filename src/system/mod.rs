//! The immutable problem instance.
//!
//! [`SystemData`] is the fully-resolved form of a [`Config`]: names are
//! replaced by dense indices, the DAG is topologically renumbered, component
//! and partition arrival rates are derived, and every cross-reference is
//! checked. It is built once per run and shared by reference with every
//! search worker; nothing in it is mutated afterwards.

pub mod component;
pub mod constraints;
pub mod dag;
pub mod network;
pub mod resources;

pub use component::{Component, Deployment, Partition};
pub use constraints::{GlobalConstraint, LocalConstraint};
pub use dag::Dag;
pub use network::NetworkDomain;
pub use resources::{ComputationalLayer, FaasResource, NodeResource, ResourcePool};

use crate::config::{Config, FaasEntrySpec, PartitionSpec};
use crate::error::{Error, Result};
use crate::types::{Load, ResourceKind, Seconds};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// The 4-D compatibility mask: `allows(c, k, p, r)` is true iff partition `p`
/// of component `c` may run on resource `r` of kind `k`.
#[derive(Clone, Debug)]
pub struct Compatibility {
    mask: Vec<Vec<Vec<Vec<bool>>>>,
}

impl Compatibility {
    fn sized(parts_per_comp: &[usize], res_counts: [usize; ResourceKind::COUNT]) -> Self {
        let mask = parts_per_comp
            .iter()
            .map(|&parts| {
                res_counts
                    .iter()
                    .map(|&count| vec![vec![false; count]; parts])
                    .collect()
            })
            .collect();
        Self { mask }
    }

    /// Whether the placement `(comp, kind, part, res)` is admissible.
    #[inline]
    #[must_use]
    pub fn allows(&self, comp: usize, kind: ResourceKind, part: usize, res: usize) -> bool {
        self.mask[comp][kind.index()][part][res]
    }

    fn set(&mut self, comp: usize, kind: ResourceKind, part: usize, res: usize) {
        self.mask[comp][kind.index()][part][res] = true;
    }

    /// Compatible resources of one kind for `(comp, part)`.
    pub fn compatible_of_kind(
        &self,
        comp: usize,
        kind: ResourceKind,
        part: usize,
    ) -> impl Iterator<Item = usize> + '_ {
        self.mask[comp][kind.index()][part]
            .iter()
            .enumerate()
            .filter_map(|(res, &ok)| ok.then_some(res))
    }
}

/// The immutable problem instance shared by every search worker.
#[derive(Clone, Debug)]
pub struct SystemData {
    /// External arrival rate at the workflow root.
    pub lambda: Load,
    /// Billing horizon for FaaS cost integration, preserved as configured.
    pub horizon: Seconds,
    /// Workflow transition graph, topologically renumbered.
    pub dag: Dag,
    /// Components in DAG index order.
    pub components: Vec<Component>,
    /// Computational layers, per resource kind.
    pub layers: [Vec<ComputationalLayer>; ResourceKind::COUNT],
    /// All resources.
    pub resources: ResourcePool,
    /// The compatibility mask.
    pub compatibility: Compatibility,
    /// Network domains.
    pub network_domains: Vec<NetworkDomain>,
    /// Per-component response-time limits, one per component.
    pub local_constraints: Vec<LocalConstraint>,
    /// Per-path response-time limits.
    pub global_constraints: Vec<GlobalConstraint>,
    comp_index: HashMap<String, usize>,
    res_index: HashMap<String, (ResourceKind, usize)>,
    path_index: HashMap<String, usize>,
    cl_domains: HashMap<String, Vec<usize>>,
}

impl SystemData {
    /// Lower a raw [`Config`] into a resolved instance.
    ///
    /// All cross-references are checked here; a successful return means every
    /// later name-free lookup in the optimisation hot path is in bounds.
    pub fn from_config(config: &Config) -> Result<Self> {
        let declared: Vec<String> = config.components.keys().cloned().collect();
        let dag = Dag::from_config(&config.dag, &declared)?;
        let comp_loads = dag.component_loads(config.lambda);
        debug!(components = dag.len(), "resolved workflow DAG");

        let mut comp_index = HashMap::new();
        for (idx, name) in dag.names().iter().enumerate() {
            comp_index.insert(name.clone(), idx);
        }

        let mut components = Vec::with_capacity(dag.len());
        for (idx, name) in dag.names().iter().enumerate() {
            components.push(build_component(name, &config.components[name], comp_loads[idx], &comp_index)?);
        }

        let (layers, resources, res_index) = build_resources(config)?;

        let parts_per_comp: Vec<usize> = components.iter().map(|c| c.partitions.len()).collect();
        let res_counts = [
            resources.count(ResourceKind::Edge),
            resources.count(ResourceKind::Vm),
            resources.count(ResourceKind::Faas),
        ];
        let mut compatibility = Compatibility::sized(&parts_per_comp, res_counts);
        for (comp_name, parts) in &config.compatibility {
            let &comp = comp_index.get(comp_name).ok_or_else(|| {
                Error::ConfigInconsistent(format!(
                    "CompatibilityMatrix references undeclared component `{comp_name}`"
                ))
            })?;
            for (part_name, res_names) in parts {
                let part = components[comp].partition_index(part_name).ok_or_else(|| {
                    Error::ConfigInconsistent(format!(
                        "CompatibilityMatrix references unknown partition `{part_name}` of `{comp_name}`"
                    ))
                })?;
                for res_name in res_names {
                    let &(kind, res) = res_index.get(res_name).ok_or_else(|| {
                        Error::ConfigInconsistent(format!(
                            "CompatibilityMatrix references undeclared resource `{res_name}`"
                        ))
                    })?;
                    compatibility.set(comp, kind, part, res);
                }
            }
        }

        // Every placeable partition needs a FaaS fallback. The random
        // candidate draw keeps one Edge/VM device per layer, so a partition
        // whose only compatible devices miss the draw can only be placed
        // because every FaaS resource is always a candidate. Without the
        // fallback, placement would fail on a draw-dependent subset of
        // trials; reject the instance deterministically here instead.
        for (comp_idx, comp) in components.iter().enumerate() {
            for deployment in &comp.deployments {
                for &part in &deployment.partitions {
                    if compatibility
                        .compatible_of_kind(comp_idx, ResourceKind::Faas, part)
                        .next()
                        .is_none()
                    {
                        return Err(Error::ConfigInconsistent(format!(
                            "partition `{}` of component `{}` has no compatible FaaS resource \
                             to fall back on",
                            comp.partitions[part].name, comp.name
                        )));
                    }
                }
            }
        }

        let layer_names: HashSet<&str> = layers
            .iter()
            .flatten()
            .map(|cl| cl.name.as_str())
            .collect();
        let mut network_domains = Vec::new();
        let mut cl_domains: HashMap<String, Vec<usize>> = HashMap::new();
        for (name, spec) in &config.network {
            if spec.bandwidth <= 0.0 {
                return Err(Error::ConfigBadValue {
                    field: format!("NetworkTechnology.{name}.Bandwidth"),
                    reason: "must be positive".into(),
                });
            }
            for layer in &spec.computationallayers {
                if !layer_names.contains(layer.as_str()) {
                    return Err(Error::ConfigInconsistent(format!(
                        "network domain `{name}` references unknown computational layer `{layer}`"
                    )));
                }
                cl_domains
                    .entry(layer.clone())
                    .or_default()
                    .push(network_domains.len());
            }
            network_domains.push(NetworkDomain {
                name: name.clone(),
                layers: spec.computationallayers.clone(),
                access_delay: spec.access_delay,
                bandwidth: spec.bandwidth,
            });
        }
        for domains in cl_domains.values_mut() {
            domains.sort_unstable();
            domains.dedup();
        }

        let mut local_constraints: Vec<LocalConstraint> = (0..components.len())
            .map(|component| LocalConstraint {
                component,
                max_response_time: f64::INFINITY,
            })
            .collect();
        for (comp_name, spec) in &config.local_constraints {
            let &comp = comp_index.get(comp_name).ok_or_else(|| {
                Error::ConfigInconsistent(format!(
                    "LocalConstraints references undeclared component `{comp_name}`"
                ))
            })?;
            local_constraints[comp].max_response_time = spec.local_res_time;
        }

        let mut global_constraints = Vec::new();
        let mut path_index = HashMap::new();
        for (path_name, spec) in &config.global_constraints {
            let mut comps = Vec::with_capacity(spec.components.len());
            for comp_name in &spec.components {
                let &comp = comp_index.get(comp_name).ok_or_else(|| {
                    Error::ConfigInconsistent(format!(
                        "path `{path_name}` references undeclared component `{comp_name}`"
                    ))
                })?;
                comps.push(comp);
            }
            path_index.insert(path_name.clone(), global_constraints.len());
            global_constraints.push(GlobalConstraint {
                path: path_name.clone(),
                components: comps,
                max_response_time: spec.global_res_time,
            });
        }

        Ok(Self {
            lambda: config.lambda,
            horizon: config.time,
            dag,
            components,
            layers,
            resources,
            compatibility,
            network_domains,
            local_constraints,
            global_constraints,
            comp_index,
            res_index,
            path_index,
            cl_domains,
        })
    }

    /// Index of a component by name.
    #[must_use]
    pub fn component_index(&self, name: &str) -> Option<usize> {
        self.comp_index.get(name).copied()
    }

    /// `(kind, index)` of a resource by name.
    #[must_use]
    pub fn resource_index(&self, name: &str) -> Option<(ResourceKind, usize)> {
        self.res_index.get(name).copied()
    }

    /// Index of a global constraint by path name.
    #[must_use]
    pub fn path_index(&self, name: &str) -> Option<usize> {
        self.path_index.get(name).copied()
    }

    /// Sorted indices of the network domains containing a computational layer.
    #[must_use]
    pub fn domains_of_layer(&self, layer: &str) -> &[usize] {
        self.cl_domains.get(layer).map_or(&[], Vec::as_slice)
    }

    /// Computational layers of one kind.
    #[must_use]
    pub fn layers_of_kind(&self, kind: ResourceKind) -> &[ComputationalLayer] {
        &self.layers[kind.index()]
    }
}

/// Build one component: order each deployment's partitions along their `next`
/// chain and derive the per-partition arrival rates.
fn build_component(
    name: &str,
    deploys: &BTreeMap<String, BTreeMap<String, PartitionSpec>>,
    lambda: Load,
    comp_index: &HashMap<String, usize>,
) -> Result<Component> {
    if deploys.is_empty() {
        return Err(Error::ConfigInconsistent(format!(
            "component `{name}` has no deployments"
        )));
    }

    let mut partitions = Vec::new();
    let mut deployments = Vec::new();
    let mut seen_names = HashSet::new();

    for (dep_name, parts) in deploys {
        if parts.is_empty() {
            return Err(Error::ConfigInconsistent(format!(
                "deployment `{dep_name}` of component `{name}` has no partitions"
            )));
        }

        let ordered = order_partitions(name, dep_name, parts, comp_index)?;
        let mut indices = Vec::with_capacity(ordered.len());
        let mut part_lambda = lambda;
        for part_name in ordered {
            let spec = &parts[&part_name];
            if !(0.0..=1.0).contains(&spec.early_exit_probability) {
                return Err(Error::ConfigBadValue {
                    field: format!("Components.{name}.{dep_name}.{part_name}.early_exit_probability"),
                    reason: format!("probability {} outside [0, 1]", spec.early_exit_probability),
                });
            }
            if !seen_names.insert(part_name.clone()) {
                return Err(Error::ConfigInconsistent(format!(
                    "partition `{part_name}` appears in more than one deployment of `{name}`"
                )));
            }
            indices.push(partitions.len());
            partitions.push(Partition {
                name: part_name.clone(),
                memory: spec.memory,
                lambda: part_lambda,
                early_exit: spec.early_exit_probability,
                next: spec.next.clone(),
                data_size: spec.data_size,
            });
            // Traffic that exits early at this partition never reaches the next.
            part_lambda *= 1.0 - spec.early_exit_probability;
        }
        deployments.push(Deployment {
            name: dep_name.clone(),
            partitions: indices,
        });
    }

    Ok(Component {
        name: name.to_string(),
        deployments,
        partitions,
        lambda,
    })
}

/// Recover the linear order of a deployment's partitions from their `next`
/// links. The head is the partition no other partition points to.
fn order_partitions(
    comp: &str,
    dep: &str,
    parts: &BTreeMap<String, PartitionSpec>,
    comp_index: &HashMap<String, usize>,
) -> Result<Vec<String>> {
    let mut pointed_to: HashSet<&str> = HashSet::new();
    for spec in parts.values() {
        // A `next` naming a component marks the end of the chain.
        if !comp_index.contains_key(&spec.next) {
            pointed_to.insert(spec.next.as_str());
        }
    }

    let mut head = None;
    for name in parts.keys() {
        if !pointed_to.contains(name.as_str()) {
            if head.replace(name.clone()).is_some() {
                return Err(Error::ConfigInconsistent(format!(
                    "deployment `{dep}` of `{comp}` has more than one head partition"
                )));
            }
        }
    }
    let Some(mut current) = head else {
        return Err(Error::ConfigInconsistent(format!(
            "deployment `{dep}` of `{comp}` has no head partition (cycle in next links)"
        )));
    };

    let mut ordered = Vec::with_capacity(parts.len());
    for _ in 0..parts.len() {
        let Some(spec) = parts.get(&current) else {
            return Err(Error::ConfigInconsistent(format!(
                "deployment `{dep}` of `{comp}`: `next` link `{current}` is not a partition"
            )));
        };
        ordered.push(current.clone());
        current = spec.next.clone();
    }
    Ok(ordered)
}

type ResourceTables = (
    [Vec<ComputationalLayer>; ResourceKind::COUNT],
    ResourcePool,
    HashMap<String, (ResourceKind, usize)>,
);

fn build_resources(config: &Config) -> Result<ResourceTables> {
    let mut layers: [Vec<ComputationalLayer>; ResourceKind::COUNT] =
        std::array::from_fn(|_| Vec::new());
    let mut pool = ResourcePool::default();
    let mut res_index: HashMap<String, (ResourceKind, usize)> = HashMap::new();

    let mut register = |res_index: &mut HashMap<String, (ResourceKind, usize)>,
                        name: &str,
                        kind: ResourceKind,
                        idx: usize|
     -> Result<()> {
        if res_index.insert(name.to_string(), (kind, idx)).is_some() {
            return Err(Error::ConfigInconsistent(format!(
                "resource name `{name}` is declared twice"
            )));
        }
        Ok(())
    };

    for (kind, section) in [
        (ResourceKind::Edge, &config.edge_resources),
        (ResourceKind::Vm, &config.cloud_resources),
    ] {
        for (layer_name, members) in section {
            let mut layer = ComputationalLayer {
                name: layer_name.clone(),
                kind,
                members: Vec::with_capacity(members.len()),
            };
            for (res_name, spec) in members {
                if spec.number == 0 {
                    return Err(Error::ConfigBadValue {
                        field: format!("{layer_name}.{res_name}.number"),
                        reason: "at least one replica must be available".into(),
                    });
                }
                let idx = pool.push_node(
                    kind,
                    NodeResource {
                        name: res_name.clone(),
                        description: spec
                            .description
                            .clone()
                            .unwrap_or_else(|| "No description available".into()),
                        layer: layer_name.clone(),
                        cost: spec.cost,
                        memory: spec.memory,
                        number_avail: spec.number,
                        cores: spec.n_cores.unwrap_or(1),
                    },
                );
                register(&mut res_index, res_name, kind, idx)?;
                layer.members.push(idx);
            }
            layers[kind.index()].push(layer);
        }
    }

    for (layer_name, entries) in &config.faas_resources {
        // A layer-level `transition_cost` applies to every member that does
        // not override it.
        let layer_transition_cost = entries
            .values()
            .find_map(|entry| match entry {
                FaasEntrySpec::TransitionCost(cost) => Some(*cost),
                FaasEntrySpec::Resource(_) => None,
            })
            .unwrap_or(0.0);

        let mut layer = ComputationalLayer {
            name: layer_name.clone(),
            kind: ResourceKind::Faas,
            members: Vec::new(),
        };
        for (res_name, entry) in entries {
            let FaasEntrySpec::Resource(spec) = entry else {
                continue;
            };
            let idx = pool.push_faas(FaasResource {
                name: res_name.clone(),
                description: spec
                    .description
                    .clone()
                    .unwrap_or_else(|| "No description available".into()),
                layer: layer_name.clone(),
                cost: spec.cost,
                memory: spec.memory,
                transition_cost: spec.transition_cost.unwrap_or(layer_transition_cost),
                idle_time_before_kill: spec.idle_time_before_kill,
            });
            register(&mut res_index, res_name, ResourceKind::Faas, idx)?;
            layer.members.push(idx);
        }
        if !layer.members.is_empty() {
            layers[ResourceKind::Faas.index()].push(layer);
        }
    }

    Ok((layers, pool, res_index))
}
