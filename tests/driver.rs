use edgeplan::testing::*;
use edgeplan::{CancelFlag, Error, RandomGreedy, ResourceKind, SearchDriver};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Route driver logs through `RUST_LOG` when debugging a failing run.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn driver(seed: u64) -> SearchDriver {
    SearchDriver {
        greedy: RandomGreedy {
            max_iterations: 40,
            top_k: 3,
            reproducibility: true,
            seed,
            fixed: None,
        },
        ls_iterations: 25,
        ls_top_k: 3,
        threads: None,
    }
}

#[test]
fn refinement_never_loses_to_the_constructor() -> anyhow::Result<()> {
    init_logging();
    let ctx = context_from(three_tier_config());

    let rg_best = driver(9).greedy.run(&ctx)?.best_cost().expect("feasible seeds");
    let refined = driver(9).run(&ctx)?;
    let ls_best = refined.best_cost().expect("refined elite is non-empty");

    assert!(ls_best <= rg_best, "local search worsened {rg_best} to {ls_best}");
    for rank in 0..refined.len() {
        assert!(refined.get(rank).unwrap().is_feasible());
    }
    Ok(())
}

#[test]
fn reproducible_driver_runs_agree() -> anyhow::Result<()> {
    let ctx = context_from(three_tier_config());
    // A single elite seed keeps the refinement phase itself deterministic;
    // with equal-cost seeds only the cost sequence is guaranteed stable.
    let single_seed = || {
        let mut d = driver(31);
        d.greedy.top_k = 1;
        d.ls_top_k = 1;
        d
    };
    let first = single_seed().run(&ctx)?.best_cost().unwrap();
    let second = single_seed().run(&ctx)?.best_cost().unwrap();
    assert_eq!(first.to_bits(), second.to_bits());
    Ok(())
}

#[test]
fn infeasible_instances_report_no_feasible_found() {
    // Demand 2.0 saturates the only resource in every trial.
    let ctx = context_from(tiny_edge_config(2.0));
    match driver(1).run(&ctx) {
        Err(Error::NoFeasibleFound) => {}
        other => panic!("expected NoFeasibleFound, got {other:?}"),
    }
}

#[test]
fn pre_cancelled_runs_finish_without_results() {
    let ctx = context_from(three_tier_config());
    let cancel = CancelFlag::new();
    cancel.cancel();
    // No trial starts, so no feasible solution can exist.
    match driver(1).run_with_cancel(&ctx, &cancel) {
        Err(Error::NoFeasibleFound) => {}
        other => panic!("expected NoFeasibleFound, got {other:?}"),
    }
}

#[test]
fn runtime_mode_respects_the_edge_lock_in() -> anyhow::Result<()> {
    // Add a second, cheaper Edge device the design-time run would love.
    let mut value = three_tier_config();
    value["EdgeResources"]["cl_edge"]["dev2"] =
        json!({ "cost": 0.1, "memory": 2.0, "number": 2 });
    for part in ["whole", "front", "back"] {
        value["CompatibilityMatrix"]["c1"][part]
            .as_array_mut()
            .unwrap()
            .push(json!("dev2"));
        value["Performance"]["c1"][part]["dev2"] =
            json!({ "model": "QTedge", "demand": 0.2 });
    }
    let ctx = context_from(value.clone());

    // The previous solution only ever used dev1 and vm1.
    let dev1 = ctx.system.resource_index("dev1").unwrap().1;
    let dev2 = ctx.system.resource_index("dev2").unwrap().1;
    let mut fixed = edgeplan::SelectedResources::empty(&ctx.system);
    fixed.edge[dev1] = true;
    fixed.vm[0] = true;

    // Re-solve under a doubled arrival rate with the fleet locked.
    value["Lambda"] = json!(2.0);
    let runtime_ctx = context_from(value);
    let elite = driver(5).run_runtime(&runtime_ctx, fixed, &CancelFlag::new())?;

    assert!(!elite.is_empty());
    for rank in 0..elite.len() {
        let solution = elite.get(rank).unwrap();
        for placements in solution.data().used() {
            for p in placements {
                if p.kind == ResourceKind::Edge {
                    assert_ne!(p.res, dev2, "locked-out Edge device was used");
                    assert_eq!(p.res, dev1);
                }
                if p.kind == ResourceKind::Vm {
                    // The only VM layer is covered by the fixed set.
                    assert_eq!(p.res, 0);
                }
            }
        }
    }
    Ok(())
}
