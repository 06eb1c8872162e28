//! Testing utilities for Edgeplan.
//!
//! This module provides ready-made problem instances and small helpers used
//! throughout the crate's own test-suite, and useful for writing tests
//! against custom search configurations. Each fixture is a complete
//! configuration document; tweak one by editing the returned JSON before
//! lowering it with [`context_from`].
//!
//! # Example
//!
//! ```
//! use edgeplan::testing::*;
//!
//! let ctx = tiny_edge_context();
//! assert_eq!(ctx.system.components.len(), 1);
//! ```

use crate::config::Config;
use crate::context::ProblemContext;
use serde_json::{Value, json};

/// Lower a JSON configuration into a [`ProblemContext`], panicking on any
/// error. Test-only convenience.
///
/// # Panics
///
/// Panics when the document is not a valid configuration.
#[must_use]
pub fn context_from(value: Value) -> ProblemContext {
    let config = Config::from_value(value).expect("fixture configuration must parse");
    ProblemContext::from_config(&config).expect("fixture configuration must lower")
}

/// Assert two floats are within `tol` of each other.
///
/// # Panics
///
/// Panics with both values when they differ by more than `tol`.
pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected} +/- {tol}, got {actual}"
    );
}

/// The smallest placeable instance: one component, one partition, one Edge
/// device (`memory = 2`, `cost = 1`, `number = 1`), partition memory 1,
/// arrival rate 1, configurable queueing demand.
///
/// The FaaS platform exists only as the fallback the loader requires; its
/// memory is below the partition's footprint, so it can never actually host
/// anything and the Edge device stays the single viable placement.
#[must_use]
pub fn tiny_edge_config(demand: f64) -> Value {
    json!({
        "Lambda": 1.0,
        "Time": 1.0,
        "DirectedAcyclicGraph": {
            "c1": { "next": [], "transition_probability": [] }
        },
        "Components": {
            "c1": { "d1": { "p1": {
                "memory": 1.0, "early_exit_probability": 0.0,
                "next": "c1", "data_size": 0.0
            } } }
        },
        "EdgeResources": {
            "cl_edge": { "dev1": { "cost": 1.0, "memory": 2.0, "number": 1 } }
        },
        "FaaSResources": {
            "cl_faas": { "f1": { "cost": 1e-4, "memory": 0.5, "idle_time_before_kill": 600.0 } }
        },
        "CompatibilityMatrix": { "c1": { "p1": ["dev1", "f1"] } },
        "NetworkTechnology": {
            "nd1": {
                "computationallayers": ["cl_edge", "cl_faas"],
                "AccessDelay": 0.001, "Bandwidth": 100.0
            }
        },
        "GlobalConstraints": {},
        "Performance": {
            "c1": { "p1": {
                "dev1": { "model": "QTedge", "demand": demand },
                "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.2, "demandCold": 1.0 }
            } }
        }
    })
}

/// [`tiny_edge_config`] with demand 0.1, lowered.
#[must_use]
pub fn tiny_edge_context() -> ProblemContext {
    context_from(tiny_edge_config(0.1))
}

/// One component, one partition, one VM with 4 available replicas
/// (`cost = 1`, `memory = 10`). The greedy's shrink pass should always land
/// this on a single replica; the memory-starved FaaS fallback never hosts
/// the partition.
#[must_use]
pub fn vm_cluster_config() -> Value {
    json!({
        "Lambda": 1.0,
        "Time": 1.0,
        "DirectedAcyclicGraph": {
            "c1": { "next": [], "transition_probability": [] }
        },
        "Components": {
            "c1": { "d1": { "p1": {
                "memory": 1.0, "early_exit_probability": 0.0,
                "next": "c1", "data_size": 0.0
            } } }
        },
        "CloudResources": {
            "cl_vm": { "vm1": { "cost": 1.0, "memory": 10.0, "number": 4 } }
        },
        "FaaSResources": {
            "cl_faas": { "f1": { "cost": 1e-4, "memory": 0.5, "idle_time_before_kill": 600.0 } }
        },
        "CompatibilityMatrix": { "c1": { "p1": ["vm1", "f1"] } },
        "NetworkTechnology": {
            "nd1": {
                "computationallayers": ["cl_vm", "cl_faas"],
                "AccessDelay": 0.001, "Bandwidth": 100.0
            }
        },
        "GlobalConstraints": {},
        "Performance": {
            "c1": { "p1": {
                "vm1": { "model": "QTcloud", "demand": 0.1 },
                "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.2, "demandCold": 1.0 }
            } }
        }
    })
}

/// One component split into two chained partitions, each compatible with both
/// an Edge device and a VM. Exercises tier monotonicity and the migration
/// operators; the FaaS fallback is memory-starved and never placeable.
#[must_use]
pub fn two_tier_config() -> Value {
    json!({
        "Lambda": 1.0,
        "Time": 1.0,
        "DirectedAcyclicGraph": {
            "c1": { "next": [], "transition_probability": [] }
        },
        "Components": {
            "c1": { "d1": {
                "p1": {
                    "memory": 1.0, "early_exit_probability": 0.0,
                    "next": "p2", "data_size": 1.0
                },
                "p2": {
                    "memory": 1.0, "early_exit_probability": 0.0,
                    "next": "c1", "data_size": 0.0
                }
            } }
        },
        "EdgeResources": {
            "cl_edge": { "dev1": { "cost": 1.0, "memory": 4.0, "number": 2 } }
        },
        "CloudResources": {
            "cl_vm": { "vm1": { "cost": 5.0, "memory": 8.0, "number": 2 } }
        },
        "FaaSResources": {
            "cl_faas": { "f1": { "cost": 1e-4, "memory": 0.5, "idle_time_before_kill": 600.0 } }
        },
        "CompatibilityMatrix": {
            "c1": { "p1": ["dev1", "vm1", "f1"], "p2": ["dev1", "vm1", "f1"] }
        },
        "NetworkTechnology": {
            "nd1": {
                "computationallayers": ["cl_edge", "cl_vm", "cl_faas"],
                "AccessDelay": 0.01, "Bandwidth": 10.0
            }
        },
        "GlobalConstraints": {},
        "Performance": {
            "c1": {
                "p1": {
                    "dev1": { "model": "QTedge", "demand": 0.05 },
                    "vm1": { "model": "QTcloud", "demand": 0.02 },
                    "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.1, "demandCold": 0.5 }
                },
                "p2": {
                    "dev1": { "model": "QTedge", "demand": 0.05 },
                    "vm1": { "model": "QTcloud", "demand": 0.02 },
                    "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.1, "demandCold": 0.5 }
                }
            }
        }
    })
}

/// Two components on one constrained path, placed on different layers joined
/// by a single domain with `AccessDelay = 0.01` and `Bandwidth = 10`, with
/// unit data size between them. The shared FaaS fallback is memory-starved
/// and never placeable.
#[must_use]
pub fn path_config() -> Value {
    json!({
        "Lambda": 1.0,
        "Time": 1.0,
        "DirectedAcyclicGraph": {
            "c1": { "next": ["c2"], "transition_probability": [1.0] }
        },
        "Components": {
            "c1": { "d1": { "p1": {
                "memory": 1.0, "early_exit_probability": 0.0,
                "next": "c2", "data_size": 1.0
            } } },
            "c2": { "d1": { "p2": {
                "memory": 1.0, "early_exit_probability": 0.0,
                "next": "c2", "data_size": 0.0
            } } }
        },
        "EdgeResources": {
            "cl_a": { "dev1": { "cost": 1.0, "memory": 2.0, "number": 1 } }
        },
        "CloudResources": {
            "cl_b": { "vm1": { "cost": 2.0, "memory": 4.0, "number": 1 } }
        },
        "FaaSResources": {
            "cl_faas": { "f1": { "cost": 1e-4, "memory": 0.5, "idle_time_before_kill": 600.0 } }
        },
        "CompatibilityMatrix": {
            "c1": { "p1": ["dev1", "f1"] },
            "c2": { "p2": ["vm1", "f1"] }
        },
        "NetworkTechnology": {
            "nd1": {
                "computationallayers": ["cl_a", "cl_b", "cl_faas"],
                "AccessDelay": 0.01, "Bandwidth": 10.0
            }
        },
        "GlobalConstraints": {
            "path1": { "components": ["c1", "c2"], "global_res_time": 10.0 }
        },
        "Performance": {
            "c1": { "p1": {
                "dev1": { "model": "QTedge", "demand": 0.1 },
                "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.2, "demandCold": 1.0 }
            } },
            "c2": { "p2": {
                "vm1": { "model": "QTcloud", "demand": 0.1 },
                "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.2, "demandCold": 1.0 }
            } }
        }
    })
}

/// A three-tier instance: one component with a one-partition and a
/// two-partition deployment, an Edge device, a VM and a FaaS platform, all
/// mutually reachable. Exercises every operator and the FaaS cost path.
#[must_use]
pub fn three_tier_config() -> Value {
    json!({
        "Lambda": 1.0,
        "Time": 100.0,
        "DirectedAcyclicGraph": {
            "c1": { "next": [], "transition_probability": [] }
        },
        "Components": {
            "c1": {
                "d1": { "whole": {
                    "memory": 1.0, "early_exit_probability": 0.0,
                    "next": "c1", "data_size": 0.0
                } },
                "d2": {
                    "front": {
                        "memory": 0.5, "early_exit_probability": 0.2,
                        "next": "back", "data_size": 0.5
                    },
                    "back": {
                        "memory": 0.5, "early_exit_probability": 0.0,
                        "next": "c1", "data_size": 0.0
                    }
                }
            }
        },
        "EdgeResources": {
            "cl_edge": { "dev1": { "cost": 0.8, "memory": 2.0, "number": 2 } }
        },
        "CloudResources": {
            "cl_vm": { "vm1": { "cost": 2.0, "memory": 4.0, "number": 3 } }
        },
        "FaaSResources": {
            "cl_faas": {
                "transition_cost": 0.001,
                "f1": { "cost": 1e-4, "memory": 1.0, "idle_time_before_kill": 600.0 }
            }
        },
        "CompatibilityMatrix": {
            "c1": {
                "whole": ["dev1", "vm1", "f1"],
                "front": ["dev1", "vm1", "f1"],
                "back": ["dev1", "vm1", "f1"]
            }
        },
        "NetworkTechnology": {
            "nd1": {
                "computationallayers": ["cl_edge", "cl_vm", "cl_faas"],
                "AccessDelay": 0.005, "Bandwidth": 50.0
            }
        },
        "LocalConstraints": {
            "c1": { "local_res_time": 5.0 }
        },
        "GlobalConstraints": {},
        "Performance": {
            "c1": {
                "whole": {
                    "dev1": { "model": "QTedge", "demand": 0.2 },
                    "vm1": { "model": "QTcloud", "demand": 0.1 },
                    "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.3, "demandCold": 1.5 }
                },
                "front": {
                    "dev1": { "model": "QTedge", "demand": 0.1 },
                    "vm1": { "model": "QTcloud", "demand": 0.05 },
                    "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.15, "demandCold": 0.8 }
                },
                "back": {
                    "dev1": { "model": "QTedge", "demand": 0.1 },
                    "vm1": { "model": "QTcloud", "demand": 0.05 },
                    "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.15, "demandCold": 0.8 }
                }
            }
        }
    })
}
