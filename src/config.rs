//! Raw configuration schema.
//!
//! This module mirrors the JSON configuration format one-to-one; nothing here
//! is validated beyond what serde can express. Cross-field validation (DAG
//! consistency, name resolution, compatibility coverage) happens when the raw
//! [`Config`] is lowered into a [`SystemData`](crate::system::SystemData).
//!
//! Maps are [`BTreeMap`]s on purpose: the reference configurations rely on
//! key-sorted object iteration (deployments, layers and resources are visited
//! in name order), and a sorted map keeps that behaviour deterministic.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One node of the `DirectedAcyclicGraph` section.
#[derive(Clone, Debug, Deserialize)]
pub struct DagNodeSpec {
    /// Names of the successor components.
    pub next: Vec<String>,
    /// Transition probability towards each successor, same order as `next`.
    pub transition_probability: Vec<f64>,
}

/// One partition inside `Components.<comp>.<deployment>`.
#[derive(Clone, Debug, Deserialize)]
pub struct PartitionSpec {
    /// Memory footprint of the partition.
    pub memory: f64,
    /// Probability that processing stops after this partition.
    pub early_exit_probability: f64,
    /// Name of the next partition, or of the next component for the last one.
    pub next: String,
    /// Data transferred to the next step.
    pub data_size: f64,
}

/// An Edge device or cloud VM in `EdgeResources` / `CloudResources`.
#[derive(Clone, Debug, Deserialize)]
pub struct NodeResourceSpec {
    /// Optional human description.
    #[serde(default)]
    pub description: Option<String>,
    /// Cost rate of one replica.
    pub cost: f64,
    /// Memory capacity of one replica.
    pub memory: f64,
    /// Number of available replicas.
    pub number: usize,
    /// Core count; defaults to 1.
    #[serde(default)]
    pub n_cores: Option<usize>,
}

/// A FaaS platform in `FaaSResources`.
#[derive(Clone, Debug, Deserialize)]
pub struct FaasResourceSpec {
    /// Optional human description.
    #[serde(default)]
    pub description: Option<String>,
    /// Cost rate per unit of billed demand.
    pub cost: f64,
    /// Memory capacity.
    pub memory: f64,
    /// How long the platform keeps an idle worker warm.
    pub idle_time_before_kill: f64,
    /// Resource-level transition cost, overriding the layer-level one.
    #[serde(default)]
    pub transition_cost: Option<f64>,
}

/// Entry of a FaaS layer map: either an actual resource, or the layer-level
/// `transition_cost` scalar that older configurations put alongside them.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum FaasEntrySpec {
    /// The layer-level `"transition_cost": <number>` pseudo-entry.
    TransitionCost(f64),
    /// A real FaaS resource.
    Resource(FaasResourceSpec),
}

/// One domain of the `NetworkTechnology` section.
#[derive(Clone, Debug, Deserialize)]
pub struct NetworkDomainSpec {
    /// Names of the computational layers reachable within this domain.
    pub computationallayers: Vec<String>,
    /// Fixed access delay paid by every transfer.
    #[serde(rename = "AccessDelay")]
    pub access_delay: f64,
    /// Domain bandwidth.
    #[serde(rename = "Bandwidth")]
    pub bandwidth: f64,
}

/// A `LocalConstraints` entry.
#[derive(Clone, Debug, Deserialize)]
pub struct LocalConstraintSpec {
    /// Maximum response time for the component.
    pub local_res_time: f64,
}

/// A `GlobalConstraints` entry.
#[derive(Clone, Debug, Deserialize)]
pub struct GlobalConstraintSpec {
    /// Ordered component names of the path.
    pub components: Vec<String>,
    /// Maximum end-to-end response time for the path.
    pub global_res_time: f64,
}

/// A `Performance` entry for one `(component, partition, resource)` triple.
#[derive(Clone, Debug, Deserialize)]
pub struct PerformanceSpec {
    /// Model keyword: `QTedge`, `QTcloud`, `PACSLTK` or `PACSLTKSTATIC`.
    pub model: String,
    /// Demand for the queueing models.
    #[serde(default)]
    pub demand: Option<f64>,
    /// Warm-start demand for the FaaS models.
    #[serde(rename = "demandWarm", default)]
    pub demand_warm: Option<f64>,
    /// Cold-start demand for the FaaS models.
    #[serde(rename = "demandCold", default)]
    pub demand_cold: Option<f64>,
    /// Whether other partitions may share the resource; defaults to true.
    #[serde(default)]
    pub allows_colocation: Option<bool>,
}

/// A `DemandMatrix` entry: a plain demand for Edge/VM, a `[warm, cold]` pair
/// for FaaS.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum DemandSpec {
    /// Edge/VM queueing demand.
    Queue(f64),
    /// FaaS `[warm, cold]` demand pair.
    Faas([f64; 2]),
}

/// Map type of the `Components` section: component -> deployment -> partition.
pub type ComponentsSpec = BTreeMap<String, BTreeMap<String, BTreeMap<String, PartitionSpec>>>;

/// Map type of `EdgeResources` / `CloudResources`: layer -> resource.
pub type NodeResourcesSpec = BTreeMap<String, BTreeMap<String, NodeResourceSpec>>;

/// The full configuration file, exactly as written on disk.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// External arrival rate at the workflow root.
    #[serde(rename = "Lambda")]
    pub lambda: f64,
    /// Billing horizon for FaaS cost integration, preserved as given.
    #[serde(rename = "Time")]
    pub time: f64,
    /// Workflow transition structure.
    #[serde(rename = "DirectedAcyclicGraph")]
    pub dag: BTreeMap<String, DagNodeSpec>,
    /// Components with their candidate deployments and partitions.
    #[serde(rename = "Components")]
    pub components: ComponentsSpec,
    /// Edge devices, grouped by computational layer.
    #[serde(rename = "EdgeResources", default)]
    pub edge_resources: NodeResourcesSpec,
    /// Cloud VMs, grouped by computational layer.
    #[serde(rename = "CloudResources", default)]
    pub cloud_resources: NodeResourcesSpec,
    /// FaaS platforms, grouped by computational layer.
    #[serde(rename = "FaaSResources", default)]
    pub faas_resources: BTreeMap<String, BTreeMap<String, FaasEntrySpec>>,
    /// Compatible resources per component partition.
    #[serde(rename = "CompatibilityMatrix")]
    pub compatibility: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Network domains connecting computational layers.
    #[serde(rename = "NetworkTechnology")]
    pub network: BTreeMap<String, NetworkDomainSpec>,
    /// Per-component response-time limits; missing components default to +inf.
    #[serde(rename = "LocalConstraints", default)]
    pub local_constraints: BTreeMap<String, LocalConstraintSpec>,
    /// Per-path end-to-end response-time limits.
    #[serde(rename = "GlobalConstraints")]
    pub global_constraints: BTreeMap<String, GlobalConstraintSpec>,
    /// Performance models, one entry per compatible triple.
    #[serde(rename = "Performance", default)]
    pub performance: Option<BTreeMap<String, BTreeMap<String, BTreeMap<String, PerformanceSpec>>>>,
    /// Legacy demand-matrix form of the performance section.
    #[serde(rename = "DemandMatrix", default)]
    pub demand_matrix: Option<BTreeMap<String, BTreeMap<String, BTreeMap<String, DemandSpec>>>>,
}

/// Top-level fields whose absence is reported as `ConfigMissingField` rather
/// than as an opaque serde error.
const REQUIRED_FIELDS: &[&str] = &[
    "Lambda",
    "Time",
    "DirectedAcyclicGraph",
    "Components",
    "CompatibilityMatrix",
    "NetworkTechnology",
    "GlobalConstraints",
];

impl Config {
    /// Parse a configuration from a JSON string.
    pub fn from_str(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Parse a configuration from a file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    /// Parse a configuration from an already-loaded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| Error::ConfigBadValue {
                field: "<root>".into(),
                reason: "configuration must be a JSON object".into(),
            })?;

        for &field in REQUIRED_FIELDS {
            if !map.contains_key(field) {
                return Err(Error::ConfigMissingField(field));
            }
        }

        let config: Config =
            serde_json::from_value(value).map_err(|e| Error::ConfigBadValue {
                field: "<schema>".into(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that do not require name resolution.
    fn validate(&self) -> Result<()> {
        match (&self.performance, &self.demand_matrix) {
            (None, None) => {
                return Err(Error::ConfigMissingField("Performance"));
            }
            (Some(_), Some(_)) => {
                return Err(Error::ConfigInconsistent(
                    "both Performance and DemandMatrix are present; provide exactly one".into(),
                ));
            }
            _ => {}
        }

        if self.edge_resources.is_empty()
            && self.cloud_resources.is_empty()
            && self.faas_resources.is_empty()
        {
            return Err(Error::ConfigInconsistent(
                "no resources declared in any of EdgeResources, CloudResources, FaaSResources"
                    .into(),
            ));
        }

        if self.lambda <= 0.0 || !self.lambda.is_finite() {
            return Err(Error::ConfigBadValue {
                field: "Lambda".into(),
                reason: format!("must be finite and positive, got {}", self.lambda),
            });
        }

        for (name, node) in &self.dag {
            if node.next.len() != node.transition_probability.len() {
                return Err(Error::ConfigBadValue {
                    field: format!("DirectedAcyclicGraph.{name}"),
                    reason: "next and transition_probability lengths differ".into(),
                });
            }
            for p in &node.transition_probability {
                if !(0.0..=1.0).contains(p) {
                    return Err(Error::ConfigBadValue {
                        field: format!("DirectedAcyclicGraph.{name}.transition_probability"),
                        reason: format!("probability {p} outside [0, 1]"),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        json!({
            "Lambda": 0.5,
            "Time": 1.0,
            "DirectedAcyclicGraph": { "c1": { "next": [], "transition_probability": [] } },
            "Components": { "c1": { "d1": { "p1": {
                "memory": 1.0, "early_exit_probability": 0.0,
                "next": "c1", "data_size": 0.0
            } } } },
            "EdgeResources": { "cl1": { "dev1": { "cost": 1.0, "memory": 2.0, "number": 1 } } },
            "CompatibilityMatrix": { "c1": { "p1": ["dev1"] } },
            "NetworkTechnology": { "nd1": {
                "computationallayers": ["cl1"], "AccessDelay": 0.0, "Bandwidth": 1.0
            } },
            "GlobalConstraints": {},
            "Performance": { "c1": { "p1": { "dev1": { "model": "QTedge", "demand": 0.1 } } } }
        })
    }

    #[test]
    fn minimal_config_parses() -> anyhow::Result<()> {
        let config = Config::from_value(minimal())?;
        assert_eq!(config.lambda, 0.5);
        assert_eq!(config.edge_resources.len(), 1);
        Ok(())
    }

    #[test]
    fn missing_lambda_is_reported_by_name() {
        let mut value = minimal();
        value.as_object_mut().unwrap().remove("Lambda");
        match Config::from_value(value) {
            Err(Error::ConfigMissingField(field)) => assert_eq!(field, "Lambda"),
            other => panic!("expected ConfigMissingField, got {other:?}"),
        }
    }

    #[test]
    fn performance_and_demand_matrix_are_exclusive() {
        let mut value = minimal();
        value.as_object_mut().unwrap().insert(
            "DemandMatrix".into(),
            json!({ "c1": { "p1": { "dev1": 0.1 } } }),
        );
        assert!(matches!(
            Config::from_value(value),
            Err(Error::ConfigInconsistent(_))
        ));
    }

    #[test]
    fn faas_layer_transition_cost_parses_as_pseudo_entry() -> anyhow::Result<()> {
        let mut value = minimal();
        value.as_object_mut().unwrap().insert(
            "FaaSResources".into(),
            json!({ "clf": {
                "transition_cost": 0.001,
                "f1": { "cost": 1e-6, "memory": 1.0, "idle_time_before_kill": 600.0 }
            } }),
        );
        let config = Config::from_value(value)?;
        let layer = &config.faas_resources["clf"];
        assert!(matches!(layer["transition_cost"], FaasEntrySpec::TransitionCost(_)));
        assert!(matches!(layer["f1"], FaasEntrySpec::Resource(_)));
        Ok(())
    }
}
