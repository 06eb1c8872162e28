//! Core index types and scalar aliases shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Arrival rate (requests per time unit).
pub type Load = f64;
/// Monetary cost, in whatever unit the configuration uses.
pub type Cost = f64;
/// Time, in the configuration's time unit (usually seconds).
pub type Seconds = f64;
/// Data size transferred between partitions.
pub type DataSize = f64;
/// A probability in `[0, 1]`.
pub type Prob = f64;

/// The three kinds of resources a partition can run on.
///
/// The discriminants are stable (`Edge = 0`, `Vm = 1`, `Faas = 2`) and double
/// as indices into every per-kind table in the crate. `Edge` and `Vm`
/// resources carry a replica count; `Faas` resources do not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Edge devices, closest to the data source.
    Edge = 0,
    /// Cloud virtual machines.
    Vm = 1,
    /// Function-as-a-Service platforms.
    Faas = 2,
}

impl ResourceKind {
    /// Number of resource kinds.
    pub const COUNT: usize = 3;

    /// All kinds, in index order.
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Edge, ResourceKind::Vm, ResourceKind::Faas];

    /// The kinds that carry a replica count.
    pub const CLUSTERED: [ResourceKind; 2] = [ResourceKind::Edge, ResourceKind::Vm];

    /// Stable index of this kind.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`index`](Self::index).
    #[must_use]
    pub fn from_index(idx: usize) -> Option<ResourceKind> {
        match idx {
            0 => Some(ResourceKind::Edge),
            1 => Some(ResourceKind::Vm),
            2 => Some(ResourceKind::Faas),
            _ => None,
        }
    }

    /// Whether this kind has a cluster size (Edge and VM do, FaaS does not).
    #[inline]
    #[must_use]
    pub fn has_replicas(self) -> bool {
        !matches!(self, ResourceKind::Faas)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Edge => "edge",
            ResourceKind::Vm => "vm",
            ResourceKind::Faas => "faas",
        };
        f.write_str(s)
    }
}

/// One `(partition, kind, resource)` assignment inside a component's ordered
/// placement list.
///
/// The derived ordering sorts by partition index first, which is the walk
/// order used by every feasibility check and by the tier-progression rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Placement {
    /// Partition index within the component.
    pub part: usize,
    /// Kind of the resource the partition runs on.
    pub kind: ResourceKind,
    /// Resource index within its kind.
    pub res: usize,
}

impl Placement {
    /// Convenience constructor.
    #[must_use]
    pub fn new(part: usize, kind: ResourceKind, res: usize) -> Self {
        Self { part, kind, res }
    }

    /// The `(kind, resource)` endpoint of this placement.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> (ResourceKind, usize) {
        (self.kind, self.res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_indices_are_stable() {
        assert_eq!(ResourceKind::Edge.index(), 0);
        assert_eq!(ResourceKind::Vm.index(), 1);
        assert_eq!(ResourceKind::Faas.index(), 2);
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(ResourceKind::from_index(3), None);
    }

    #[test]
    fn placements_order_by_partition_first() {
        let a = Placement::new(0, ResourceKind::Faas, 5);
        let b = Placement::new(1, ResourceKind::Edge, 0);
        assert!(a < b);
    }
}
