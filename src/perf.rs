//! Response-time predictors.
//!
//! Each compatible `(component, partition, resource)` triple carries one
//! [`PerformanceModel`]. Edge and VM placements use an M/M/1-style queueing
//! model whose utilisation aggregates every partition co-resident on the
//! resource; FaaS placements either delegate to a [`ColdStartPredictor`] per
//! evaluation (`PACSLTK`) or bake the prediction into a constant at load time
//! (`PACSLTKSTATIC` and the legacy `DemandMatrix` form).

use crate::config::{Config, DemandSpec, PerformanceSpec};
use crate::error::{Error, Result};
use crate::system::SystemData;
use crate::types::{Load, ResourceKind, Seconds};
use std::sync::Arc;

/// Predicts the expected FaaS response time from the arrival rate, the
/// warm/cold demands and the platform's idle-kill timeout.
///
/// Implementations must be pure: two calls with the same arguments return the
/// same value. A failure (e.g. a crashed embedded interpreter) is fatal and
/// aborts the driver -- report it as [`Error::Predictor`]. `serial_only` lets
/// an implementation backed by a single-threaded embedded interpreter force
/// the search drivers down to one worker thread.
pub trait ColdStartPredictor: Send + Sync {
    /// Expected response time of one invocation.
    fn predict(
        &self,
        lambda: Load,
        demand_warm: Seconds,
        demand_cold: Seconds,
        idle_time: Seconds,
    ) -> Result<Seconds>;

    /// True when calls into this predictor must not run concurrently.
    fn serial_only(&self) -> bool {
        false
    }
}

/// Closed-form in-process predictor.
///
/// With Poisson arrivals at rate `lambda`, a request finds the platform cold
/// when no arrival landed within the keep-alive window, so the cold-start
/// probability is `exp(-lambda * idle_time)` and the expected response time
/// blends the warm and cold demands accordingly.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnalyticColdStart;

impl ColdStartPredictor for AnalyticColdStart {
    fn predict(
        &self,
        lambda: Load,
        demand_warm: Seconds,
        demand_cold: Seconds,
        idle_time: Seconds,
    ) -> Result<Seconds> {
        let p_cold = (-lambda * idle_time).exp();
        Ok((1.0 - p_cold) * demand_warm + p_cold * demand_cold)
    }
}

/// The per-triple response-time model.
#[derive(Clone, Debug)]
pub enum PerformanceModel {
    /// M/M/1 queueing model for Edge/VM: `rt = demand / (1 - U)`.
    QueueEdgeVm {
        /// Service demand of this partition on this resource.
        demand: Seconds,
        /// Whether other partitions may share the resource.
        allows_colocation: bool,
    },
    /// FaaS model evaluated through the predictor on every call.
    FaasDynamic {
        /// Demand when a warm worker is available.
        warm: Seconds,
        /// Demand when a new worker must be started.
        cold: Seconds,
    },
    /// FaaS model evaluated once at load time.
    FaasStatic {
        /// Precomputed response time.
        constant: Seconds,
        /// Warm demand, kept for cost integration.
        warm: Seconds,
    },
}

impl PerformanceModel {
    /// Whether the resource may be shared with other partitions.
    #[must_use]
    pub fn allows_colocation(&self) -> bool {
        match self {
            PerformanceModel::QueueEdgeVm {
                allows_colocation, ..
            } => *allows_colocation,
            // FaaS platforms scale out per invocation.
            _ => true,
        }
    }

    /// Warm demand of a FaaS model; `None` for queueing models.
    #[must_use]
    pub fn warm_demand(&self) -> Option<Seconds> {
        match self {
            PerformanceModel::FaasDynamic { warm, .. }
            | PerformanceModel::FaasStatic { warm, .. } => Some(*warm),
            PerformanceModel::QueueEdgeVm { .. } => None,
        }
    }
}

/// All performance models of a problem instance, plus the Edge/VM demand
/// cache used by the utilisation computation.
///
/// Read-only after construction; shared by reference across search workers.
pub struct PerformanceIndex {
    /// `models[comp][kind][part][res]`, populated exactly on the compatible
    /// triples.
    models: Vec<Vec<Vec<Vec<Option<PerformanceModel>>>>>,
    /// `demands[comp][kind][part][res]` for Edge/VM queueing models, NaN
    /// elsewhere. A cache over `models`, never an independent source of truth.
    demands: Vec<[Vec<Vec<Seconds>>; 2]>,
    predictor: Arc<dyn ColdStartPredictor>,
    dynamic: bool,
}

impl std::fmt::Debug for PerformanceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceIndex")
            .field("models", &self.models)
            .field("demands", &self.demands)
            .field("dynamic", &self.dynamic)
            .finish()
    }
}

impl PerformanceIndex {
    /// Build the index from the `Performance` or `DemandMatrix` section.
    pub fn from_config(
        config: &Config,
        system: &SystemData,
        predictor: Arc<dyn ColdStartPredictor>,
    ) -> Result<Self> {
        let mut index = Self::sized(system, predictor);

        if let Some(performance) = &config.performance {
            for (comp_name, parts) in performance {
                for (part_name, entries) in parts {
                    for (res_name, spec) in entries {
                        index.insert_model(system, comp_name, part_name, res_name, spec)?;
                    }
                }
            }
        } else if let Some(matrix) = &config.demand_matrix {
            for (comp_name, parts) in matrix {
                for (part_name, entries) in parts {
                    for (res_name, demand) in entries {
                        index.insert_demand(system, comp_name, part_name, res_name, demand)?;
                    }
                }
            }
        }

        index.check_coverage(system)?;
        Ok(index)
    }

    fn sized(system: &SystemData, predictor: Arc<dyn ColdStartPredictor>) -> Self {
        let res_counts = [
            system.resources.count(ResourceKind::Edge),
            system.resources.count(ResourceKind::Vm),
            system.resources.count(ResourceKind::Faas),
        ];
        let models = system
            .components
            .iter()
            .map(|c| {
                res_counts
                    .iter()
                    .map(|&count| vec![vec![None; count]; c.partitions.len()])
                    .collect()
            })
            .collect();
        let demands = system
            .components
            .iter()
            .map(|c| {
                [
                    vec![vec![f64::NAN; res_counts[0]]; c.partitions.len()],
                    vec![vec![f64::NAN; res_counts[1]]; c.partitions.len()],
                ]
            })
            .collect();
        Self {
            models,
            demands,
            predictor,
            dynamic: false,
        }
    }

    fn resolve(
        system: &SystemData,
        comp_name: &str,
        part_name: &str,
        res_name: &str,
    ) -> Result<(usize, usize, ResourceKind, usize)> {
        let comp = system.component_index(comp_name).ok_or_else(|| {
            Error::ConfigInconsistent(format!(
                "performance section references undeclared component `{comp_name}`"
            ))
        })?;
        let part = system.components[comp]
            .partition_index(part_name)
            .ok_or_else(|| {
                Error::ConfigInconsistent(format!(
                    "performance section references unknown partition `{part_name}` of `{comp_name}`"
                ))
            })?;
        let (kind, res) = system.resource_index(res_name).ok_or_else(|| {
            Error::ConfigInconsistent(format!(
                "performance section references undeclared resource `{res_name}`"
            ))
        })?;
        if !system.compatibility.allows(comp, kind, part, res) {
            return Err(Error::ConfigInconsistent(format!(
                "performance model given for incompatible placement: `{part_name}` of \
                 `{comp_name}` on `{res_name}`"
            )));
        }
        Ok((comp, part, kind, res))
    }

    fn insert_model(
        &mut self,
        system: &SystemData,
        comp_name: &str,
        part_name: &str,
        res_name: &str,
        spec: &PerformanceSpec,
    ) -> Result<()> {
        let (comp, part, kind, res) = Self::resolve(system, comp_name, part_name, res_name)?;
        let field = || format!("Performance.{comp_name}.{part_name}.{res_name}");

        let model = match spec.model.as_str() {
            "QTedge" | "QTcloud" => {
                if kind == ResourceKind::Faas {
                    return Err(Error::ConfigBadValue {
                        field: field(),
                        reason: format!("queueing model `{}` on a FaaS resource", spec.model),
                    });
                }
                let demand = spec.demand.ok_or_else(|| Error::ConfigMissingField("demand"))?;
                self.demands[comp][kind.index()][part][res] = demand;
                PerformanceModel::QueueEdgeVm {
                    demand,
                    allows_colocation: spec.allows_colocation.unwrap_or(true),
                }
            }
            "PACSLTK" | "PACSLTKSTATIC" => {
                if kind != ResourceKind::Faas {
                    return Err(Error::ConfigBadValue {
                        field: field(),
                        reason: format!("FaaS model `{}` on a {kind} resource", spec.model),
                    });
                }
                let warm = spec
                    .demand_warm
                    .ok_or_else(|| Error::ConfigMissingField("demandWarm"))?;
                let cold = spec
                    .demand_cold
                    .ok_or_else(|| Error::ConfigMissingField("demandCold"))?;
                if spec.model == "PACSLTK" {
                    self.dynamic = true;
                    PerformanceModel::FaasDynamic { warm, cold }
                } else {
                    let idle = system.resources.faas(res).idle_time_before_kill;
                    let lambda = system.components[comp].partitions[part].lambda;
                    let constant = self.predictor.predict(lambda, warm, cold, idle)?;
                    PerformanceModel::FaasStatic { constant, warm }
                }
            }
            other => {
                return Err(Error::ConfigBadValue {
                    field: field(),
                    reason: format!("unknown performance model `{other}`"),
                });
            }
        };

        self.models[comp][kind.index()][part][res] = Some(model);
        Ok(())
    }

    fn insert_demand(
        &mut self,
        system: &SystemData,
        comp_name: &str,
        part_name: &str,
        res_name: &str,
        demand: &DemandSpec,
    ) -> Result<()> {
        let (comp, part, kind, res) = Self::resolve(system, comp_name, part_name, res_name)?;
        let model = match (kind, demand) {
            (ResourceKind::Faas, DemandSpec::Faas([warm, cold])) => {
                let idle = system.resources.faas(res).idle_time_before_kill;
                let lambda = system.components[comp].partitions[part].lambda;
                let constant = self.predictor.predict(lambda, *warm, *cold, idle)?;
                PerformanceModel::FaasStatic {
                    constant,
                    warm: *warm,
                }
            }
            (ResourceKind::Faas, DemandSpec::Queue(_)) => {
                return Err(Error::ConfigBadValue {
                    field: format!("DemandMatrix.{comp_name}.{part_name}.{res_name}"),
                    reason: "FaaS demand must be a [warm, cold] pair".into(),
                });
            }
            (_, DemandSpec::Queue(d)) => {
                self.demands[comp][kind.index()][part][res] = *d;
                PerformanceModel::QueueEdgeVm {
                    demand: *d,
                    allows_colocation: true,
                }
            }
            (_, DemandSpec::Faas(_)) => {
                return Err(Error::ConfigBadValue {
                    field: format!("DemandMatrix.{comp_name}.{part_name}.{res_name}"),
                    reason: "Edge/VM demand must be a single number".into(),
                });
            }
        };
        self.models[comp][kind.index()][part][res] = Some(model);
        Ok(())
    }

    /// Every compatible triple must carry a model, or evaluation would have
    /// nothing to dispatch to.
    fn check_coverage(&self, system: &SystemData) -> Result<()> {
        for (comp_idx, comp) in system.components.iter().enumerate() {
            for part in 0..comp.partitions.len() {
                for kind in ResourceKind::ALL {
                    for res in system.compatibility.compatible_of_kind(comp_idx, kind, part) {
                        if self.models[comp_idx][kind.index()][part][res].is_none() {
                            return Err(Error::ConfigInconsistent(format!(
                                "no performance model for partition `{}` of `{}` on `{}`",
                                comp.partitions[part].name,
                                comp.name,
                                system.resources.name(kind, res),
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// The model of a compatible triple, if any.
    #[must_use]
    pub fn model(
        &self,
        comp: usize,
        kind: ResourceKind,
        part: usize,
        res: usize,
    ) -> Option<&PerformanceModel> {
        self.models[comp][kind.index()][part][res].as_ref()
    }

    /// Queueing demand of an Edge/VM triple; NaN where no queueing model is
    /// defined.
    #[inline]
    #[must_use]
    pub fn demand(&self, comp: usize, kind: ResourceKind, part: usize, res: usize) -> Seconds {
        debug_assert!(kind.has_replicas());
        self.demands[comp][kind.index()][part][res]
    }

    /// The cold-start predictor dynamic FaaS models delegate to.
    #[must_use]
    pub fn predictor(&self) -> &dyn ColdStartPredictor {
        self.predictor.as_ref()
    }

    /// True when at least one model delegates to the predictor per call.
    #[must_use]
    pub fn has_dynamic_models(&self) -> bool {
        self.dynamic
    }

    /// True when the search must fall back to a single worker thread.
    #[must_use]
    pub fn serial_only(&self) -> bool {
        self.dynamic && self.predictor.serial_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytic_cold_start_blends_between_warm_and_cold() -> Result<()> {
        let p = AnalyticColdStart;
        // Heavy traffic: essentially always warm.
        let busy = p.predict(100.0, 0.1, 2.0, 60.0)?;
        assert!((busy - 0.1).abs() < 1e-9);
        // No keep-alive: always cold.
        let cold = p.predict(1.0, 0.1, 2.0, 0.0)?;
        assert!((cold - 2.0).abs() < 1e-12);
        // In between, the prediction is bracketed by the two demands.
        let mid = p.predict(0.01, 0.1, 2.0, 10.0)?;
        assert!(mid > 0.1 && mid < 2.0);
        Ok(())
    }
}
