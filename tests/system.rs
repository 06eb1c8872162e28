use edgeplan::testing::*;
use edgeplan::{Config, Error, ProblemContext, ResourceKind};
use serde_json::json;

#[test]
fn dag_numbering_is_topological() -> anyhow::Result<()> {
    // Component names chosen so that alphabetical order disagrees with the
    // workflow order.
    let value = json!({
        "Lambda": 2.0,
        "Time": 1.0,
        "DirectedAcyclicGraph": {
            "zeta": { "next": ["alpha"], "transition_probability": [1.0] },
            "alpha": { "next": ["mid"], "transition_probability": [0.5] }
        },
        "Components": {
            "alpha": { "d": { "pa": { "memory": 1.0, "early_exit_probability": 0.0, "next": "mid", "data_size": 0.0 } } },
            "mid": { "d": { "pm": { "memory": 1.0, "early_exit_probability": 0.0, "next": "mid", "data_size": 0.0 } } },
            "zeta": { "d": { "pz": { "memory": 1.0, "early_exit_probability": 0.0, "next": "alpha", "data_size": 0.0 } } }
        },
        "EdgeResources": { "cl": {
            "dev1": { "cost": 1.0, "memory": 8.0, "number": 1 }
        } },
        "FaaSResources": { "cl_f": {
            "f1": { "cost": 1e-4, "memory": 0.5, "idle_time_before_kill": 600.0 }
        } },
        "CompatibilityMatrix": {
            "alpha": { "pa": ["dev1", "f1"] },
            "mid": { "pm": ["dev1", "f1"] },
            "zeta": { "pz": ["dev1", "f1"] }
        },
        "NetworkTechnology": { "nd": {
            "computationallayers": ["cl", "cl_f"], "AccessDelay": 0.0, "Bandwidth": 1.0
        } },
        "GlobalConstraints": {},
        "Performance": {
            "alpha": { "pa": {
                "dev1": { "model": "QTedge", "demand": 0.01 },
                "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.05, "demandCold": 0.5 }
            } },
            "mid": { "pm": {
                "dev1": { "model": "QTedge", "demand": 0.01 },
                "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.05, "demandCold": 0.5 }
            } },
            "zeta": { "pz": {
                "dev1": { "model": "QTedge", "demand": 0.01 },
                "f1": { "model": "PACSLTKSTATIC", "demandWarm": 0.05, "demandCold": 0.5 }
            } }
        }
    });

    let config = Config::from_value(value)?;
    let ctx = ProblemContext::from_config(&config)?;
    let dag = &ctx.system.dag;

    assert_eq!(dag.names()[0], "zeta");
    for i in 0..dag.len() {
        for j in 0..dag.len() {
            if dag.incoming(i)[j] > 0.0 {
                assert!(i > j, "edge {j} -> {i} violates topological numbering");
            }
        }
    }

    // Load propagation: zeta gets the external rate, alpha all of it, mid half.
    let idx = |name: &str| ctx.system.component_index(name).unwrap();
    assert_close(ctx.system.components[idx("zeta")].lambda, 2.0, 1e-12);
    assert_close(ctx.system.components[idx("alpha")].lambda, 2.0, 1e-12);
    assert_close(ctx.system.components[idx("mid")].lambda, 1.0, 1e-12);
    Ok(())
}

#[test]
fn partition_loads_thin_through_early_exits() {
    let ctx = context_from(three_tier_config());
    let comp = &ctx.system.components[0];
    let d2 = comp
        .deployments
        .iter()
        .find(|d| d.name == "d2")
        .expect("fixture has deployment d2");

    let front = &comp.partitions[d2.partitions[0]];
    let back = &comp.partitions[d2.partitions[1]];
    assert_close(front.lambda, 1.0, 1e-12);
    // 20% of traffic exits early after `front`.
    assert_close(back.lambda, 0.8, 1e-12);
}

#[test]
fn undeclared_path_component_is_rejected() {
    let mut value = path_config();
    value["GlobalConstraints"]["path1"]["components"] = json!(["c1", "ghost"]);
    let config = Config::from_value(value).expect("schema still parses");
    match ProblemContext::from_config(&config) {
        Err(Error::ConfigInconsistent(message)) => {
            assert!(message.contains("ghost"), "unexpected message: {message}");
        }
        other => panic!("expected ConfigInconsistent, got {other:?}"),
    }
}

#[test]
fn unknown_compatibility_resource_is_rejected() {
    let mut value = tiny_edge_config(0.1);
    value["CompatibilityMatrix"]["c1"]["p1"] = json!(["dev1", "missing"]);
    let config = Config::from_value(value).expect("schema still parses");
    assert!(matches!(
        ProblemContext::from_config(&config),
        Err(Error::ConfigInconsistent(_))
    ));
}

#[test]
fn network_delay_is_symmetric_and_takes_the_cheapest_domain() -> anyhow::Result<()> {
    // Two domains join the same pair of layers with different speeds.
    let mut value = path_config();
    value["NetworkTechnology"]["nd_fast"] = json!({
        "computationallayers": ["cl_a", "cl_b"],
        "AccessDelay": 0.001, "Bandwidth": 1000.0
    });
    let ctx = context_from(value);
    let evaluator = ctx.evaluator();

    let edge = (ResourceKind::Edge, 0);
    let vm = (ResourceKind::Vm, 0);
    let forward = evaluator.network_delay(edge, vm, 1.0)?;
    let backward = evaluator.network_delay(vm, edge, 1.0)?;
    assert_eq!(forward, backward);

    // The fast domain wins: 0.001 + 1/1000 over 0.01 + 1/10.
    assert_close(forward, 0.002, 1e-12);
    Ok(())
}

#[test]
fn disconnected_layers_are_fatal() {
    let mut value = path_config();
    // Split the two layers into disjoint domains.
    value["NetworkTechnology"] = json!({
        "nd_a": { "computationallayers": ["cl_a"], "AccessDelay": 0.0, "Bandwidth": 1.0 },
        "nd_b": { "computationallayers": ["cl_b"], "AccessDelay": 0.0, "Bandwidth": 1.0 }
    });
    let ctx = context_from(value);
    let evaluator = ctx.evaluator();
    let result = evaluator.network_delay((ResourceKind::Edge, 0), (ResourceKind::Vm, 0), 1.0);
    assert!(matches!(result, Err(Error::NoNetworkDomain(_, _))));
}

#[test]
fn faas_layer_transition_cost_applies_to_members() {
    let ctx = context_from(three_tier_config());
    let platform = ctx.system.resources.faas(0);
    assert_close(platform.transition_cost, 0.001, 1e-15);
    assert_close(platform.idle_time_before_kill, 600.0, 1e-12);
}

#[test]
fn unplaceable_partition_is_rejected_at_load() {
    let mut value = tiny_edge_config(0.1);
    value["CompatibilityMatrix"]["c1"]["p1"] = json!([]);
    let config = Config::from_value(value).expect("schema still parses");
    assert!(matches!(
        ProblemContext::from_config(&config),
        Err(Error::ConfigInconsistent(_))
    ));
}
