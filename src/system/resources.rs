//! Resources and computational layers.

use crate::types::{Cost, DataSize, ResourceKind, Seconds};

/// An Edge device or a cloud VM: a replicable node with a core count.
#[derive(Clone, Debug)]
pub struct NodeResource {
    /// Resource name, globally unique.
    pub name: String,
    /// Human description.
    pub description: String,
    /// Name of the computational layer this resource belongs to.
    pub layer: String,
    /// Cost rate of one replica.
    pub cost: Cost,
    /// Memory capacity of one replica.
    pub memory: DataSize,
    /// Maximum number of replicas.
    pub number_avail: usize,
    /// Core count.
    pub cores: usize,
}

/// A FaaS platform: billed per invocation, no replica count.
#[derive(Clone, Debug)]
pub struct FaasResource {
    /// Resource name, globally unique.
    pub name: String,
    /// Human description.
    pub description: String,
    /// Name of the computational layer this resource belongs to.
    pub layer: String,
    /// Cost rate per unit of billed demand.
    pub cost: Cost,
    /// Memory capacity.
    pub memory: DataSize,
    /// Cost of transitioning a workload onto the platform.
    pub transition_cost: Cost,
    /// How long the platform keeps an idle worker warm.
    pub idle_time_before_kill: Seconds,
}

/// A named bag of resources of a single kind.
#[derive(Clone, Debug)]
pub struct ComputationalLayer {
    /// Layer name.
    pub name: String,
    /// Kind of every member resource.
    pub kind: ResourceKind,
    /// Member resource indices, within the kind's table.
    pub members: Vec<usize>,
}

/// All resources of the problem instance, indexed by `(kind, index)`.
#[derive(Clone, Debug, Default)]
pub struct ResourcePool {
    edge: Vec<NodeResource>,
    vm: Vec<NodeResource>,
    faas: Vec<FaasResource>,
}

impl ResourcePool {
    pub(crate) fn push_node(&mut self, kind: ResourceKind, res: NodeResource) -> usize {
        let table = match kind {
            ResourceKind::Edge => &mut self.edge,
            ResourceKind::Vm => &mut self.vm,
            ResourceKind::Faas => unreachable!("FaaS resources have no replica table"),
        };
        table.push(res);
        table.len() - 1
    }

    pub(crate) fn push_faas(&mut self, res: FaasResource) -> usize {
        self.faas.push(res);
        self.faas.len() - 1
    }

    /// Number of resources of a kind.
    #[must_use]
    pub fn count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Edge => self.edge.len(),
            ResourceKind::Vm => self.vm.len(),
            ResourceKind::Faas => self.faas.len(),
        }
    }

    /// An Edge or VM resource.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is [`ResourceKind::Faas`].
    #[must_use]
    pub fn node(&self, kind: ResourceKind, idx: usize) -> &NodeResource {
        match kind {
            ResourceKind::Edge => &self.edge[idx],
            ResourceKind::Vm => &self.vm[idx],
            ResourceKind::Faas => panic!("FaaS resource accessed as a node resource"),
        }
    }

    /// A FaaS resource.
    #[must_use]
    pub fn faas(&self, idx: usize) -> &FaasResource {
        &self.faas[idx]
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self, kind: ResourceKind, idx: usize) -> &str {
        match kind {
            ResourceKind::Faas => &self.faas[idx].name,
            _ => &self.node(kind, idx).name,
        }
    }

    /// Resource description.
    #[must_use]
    pub fn description(&self, kind: ResourceKind, idx: usize) -> &str {
        match kind {
            ResourceKind::Faas => &self.faas[idx].description,
            _ => &self.node(kind, idx).description,
        }
    }

    /// Name of the computational layer the resource belongs to.
    #[must_use]
    pub fn layer_name(&self, kind: ResourceKind, idx: usize) -> &str {
        match kind {
            ResourceKind::Faas => &self.faas[idx].layer,
            _ => &self.node(kind, idx).layer,
        }
    }

    /// Cost rate of the resource.
    #[must_use]
    pub fn cost(&self, kind: ResourceKind, idx: usize) -> Cost {
        match kind {
            ResourceKind::Faas => self.faas[idx].cost,
            _ => self.node(kind, idx).cost,
        }
    }

    /// Memory capacity of one instance of the resource.
    #[must_use]
    pub fn memory(&self, kind: ResourceKind, idx: usize) -> DataSize {
        match kind {
            ResourceKind::Faas => self.faas[idx].memory,
            _ => self.node(kind, idx).memory,
        }
    }

    /// Maximum replica count; 1 for FaaS.
    #[must_use]
    pub fn number_avail(&self, kind: ResourceKind, idx: usize) -> usize {
        match kind {
            ResourceKind::Faas => 1,
            _ => self.node(kind, idx).number_avail,
        }
    }
}
