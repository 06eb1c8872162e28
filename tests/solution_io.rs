use edgeplan::testing::*;
use edgeplan::{Placement, ResourceKind, Solution};
use serde_json::Value;

/// Build, cost and return the reference solution for the path fixture:
/// c1 on the Edge device, c2 on the VM.
fn reference_solution(ctx: &edgeplan::ProblemContext) -> Solution {
    let mut solution = Solution::new(&ctx.system);
    solution.data_mut().place(0, Placement::new(0, ResourceKind::Edge, 0));
    solution.data_mut().place(1, Placement::new(0, ResourceKind::Vm, 0));
    let evaluator = ctx.evaluator();
    assert!(
        evaluator
            .evaluate(&mut solution)
            .expect("evaluation succeeds")
            .is_feasible()
    );
    evaluator.total_cost(&mut solution);
    solution
}

#[test]
fn written_solution_matches_the_output_schema() -> anyhow::Result<()> {
    let ctx = context_from(path_config());
    let solution = reference_solution(&ctx);
    let value = solution.to_json(&ctx.system);

    assert_eq!(value["Lambda"], 1.0);
    let dev = &value["components"]["c1"]["p1"]["cl_a"]["dev1"];
    assert_eq!(dev["number"], 1);
    assert_eq!(dev["cost"], 1.0);
    assert!(value["components"]["c1"]["response_time"].is_number());
    assert!(value["components"]["c1"]["response_time_threshold"].is_null(), "unconstrained components serialise an unbounded threshold");

    let path = &value["global_constraints"]["path1"];
    assert_eq!(path["components"], serde_json::json!(["c1", "c2"]));
    assert!(path["path_response_time"].is_number());
    assert_eq!(path["path_response_time_threshold"], 10.0);
    assert!(value["total_cost"].is_number());
    Ok(())
}

#[test]
fn solution_round_trips_through_the_json_file() -> anyhow::Result<()> {
    let ctx = context_from(path_config());
    let original = reference_solution(&ctx);

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("solution.json");
    original.write_json(&ctx.system, &path)?;

    let text = std::fs::read_to_string(&path)?;
    let value: Value = serde_json::from_str(&text)?;
    let mut restored = Solution::from_json(&value, &ctx.system)?;

    // The caches survive the file format verbatim.
    assert_close(restored.total_cost(), original.total_cost(), 1e-13);
    for comp in 0..ctx.system.components.len() {
        assert_close(
            restored.component_time(comp),
            original.component_time(comp),
            1e-13,
        );
    }
    assert_close(restored.path_time(0), original.path_time(0), 1e-13);

    // Re-evaluating the restored placement reproduces the same numbers.
    let evaluator = ctx.evaluator();
    assert!(evaluator.evaluate(&mut restored)?.is_feasible());
    evaluator.total_cost(&mut restored);
    assert_close(restored.total_cost(), original.total_cost(), 1e-13);
    for comp in 0..ctx.system.components.len() {
        assert_close(
            restored.component_time(comp),
            original.component_time(comp),
            1e-13,
        );
    }
    assert_close(restored.path_time(0), original.path_time(0), 1e-13);
    assert_eq!(restored.data().used(), original.data().used());
    Ok(())
}

#[test]
fn faas_placements_serialise_platform_fields() -> anyhow::Result<()> {
    let ctx = context_from(three_tier_config());
    let mut solution = Solution::new(&ctx.system);
    solution.data_mut().place(0, Placement::new(0, ResourceKind::Faas, 0));
    let evaluator = ctx.evaluator();
    assert!(evaluator.evaluate(&mut solution)?.is_feasible());
    evaluator.total_cost(&mut solution);

    let value = solution.to_json(&ctx.system);
    let platform = &value["components"]["c1"]["whole"]["cl_faas"]["f1"];
    assert_eq!(platform["idle_time_before_kill"], 600.0);
    assert_eq!(platform["transition_cost"], 0.001);
    assert!(platform.get("number").is_none());

    // And the round trip restores the FaaS placement as-is.
    let restored = Solution::from_json(&value, &ctx.system)?;
    assert_eq!(restored.data().used(), solution.data().used());
    Ok(())
}
