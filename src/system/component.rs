//! Components, deployments and partitions.

use crate::types::{DataSize, Load, Prob};

/// A split of a component, placed on exactly one resource.
#[derive(Clone, Debug)]
pub struct Partition {
    /// Partition name, unique within its component.
    pub name: String,
    /// Memory footprint.
    pub memory: DataSize,
    /// Arrival rate seen by this partition (component rate thinned by the
    /// early exits of the partitions before it).
    pub lambda: Load,
    /// Probability that processing stops after this partition.
    pub early_exit: Prob,
    /// Name of the next partition, or of the next component for the last
    /// partition of a deployment.
    pub next: String,
    /// Data transferred to the next step.
    pub data_size: DataSize,
}

/// A candidate splitting of a component: an ordered subset of its partitions.
#[derive(Clone, Debug)]
pub struct Deployment {
    /// Deployment name.
    pub name: String,
    /// Indices into [`Component::partitions`], in execution order.
    pub partitions: Vec<usize>,
}

/// A node of the workflow DAG.
#[derive(Clone, Debug)]
pub struct Component {
    /// Component name.
    pub name: String,
    /// Candidate deployments, in configuration order.
    pub deployments: Vec<Deployment>,
    /// All partitions across all deployments.
    pub partitions: Vec<Partition>,
    /// Arrival rate of the component, derived from the DAG.
    pub lambda: Load,
}

impl Component {
    /// Index of the partition with the given name, if any.
    #[must_use]
    pub fn partition_index(&self, name: &str) -> Option<usize> {
        self.partitions.iter().position(|p| p.name == name)
    }

    /// The deployment whose first partition is `first_part`, if any.
    ///
    /// Deployments are disjoint partition subsets, so the first placed
    /// partition identifies the chosen deployment unambiguously.
    #[must_use]
    pub fn deployment_of_first_partition(&self, first_part: usize) -> Option<usize> {
        self.deployments
            .iter()
            .position(|d| d.partitions.first() == Some(&first_part))
    }
}
