use edgeplan::greedy::shrink_clusters;
use edgeplan::testing::*;
use edgeplan::{Config, Error, Placement, ProblemContext, RandomGreedy, ResourceKind, Solution};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;

fn reproducible(max_iterations: usize, seed: u64) -> RandomGreedy {
    RandomGreedy {
        max_iterations,
        top_k: 3,
        reproducibility: true,
        seed,
        fixed: None,
    }
}

#[test]
fn shrink_lands_on_a_single_replica() -> anyhow::Result<()> {
    let ctx = context_from(vm_cluster_config());
    let elite = reproducible(20, 42).run(&ctx)?;

    // The memory-starved FaaS fallback is never feasible, so every kept
    // solution sits on the VM.
    assert!(!elite.is_empty(), "trials placed on the VM are feasible");
    let best = elite.get(0).unwrap();
    // Whatever size was sampled, the shrink pass walks it down to 1.
    assert_eq!(best.data().replicas(ResourceKind::Vm, 0), 1);
    assert_close(best.total_cost(), 1.0, 1e-15);
    Ok(())
}

#[test]
fn shrink_pass_is_idempotent() -> anyhow::Result<()> {
    let ctx = context_from(vm_cluster_config());
    let mut solution = Solution::new(&ctx.system);
    solution.data_mut().place(0, Placement::new(0, ResourceKind::Vm, 0));
    solution.data_mut().set_cluster_size(ResourceKind::Vm, 0, 4);
    assert!(ctx.evaluator().evaluate(&mut solution)?.is_feasible());

    shrink_clusters(&ctx, &mut solution)?;
    let replicas = solution.data().replicas(ResourceKind::Vm, 0);
    let cost = solution.total_cost();
    assert_eq!(replicas, 1);

    shrink_clusters(&ctx, &mut solution)?;
    assert_eq!(solution.data().replicas(ResourceKind::Vm, 0), replicas);
    assert_eq!(solution.total_cost().to_bits(), cost.to_bits());
    Ok(())
}

#[test]
fn reproducible_runs_return_identical_costs() -> anyhow::Result<()> {
    let ctx = context_from(three_tier_config());
    let greedy = reproducible(32, 121_298);

    let costs = |elite: edgeplan::EliteResult| -> Vec<u64> {
        elite
            .into_solutions()
            .iter()
            .map(|s| s.total_cost().to_bits())
            .collect()
    };

    let first = costs(greedy.run(&ctx)?);
    let second = costs(greedy.run(&ctx)?);
    assert!(!first.is_empty());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn elite_solutions_satisfy_the_replica_invariants() -> anyhow::Result<()> {
    let ctx = context_from(three_tier_config());
    let elite = reproducible(32, 7).run(&ctx)?;
    assert!(!elite.is_empty());

    for rank in 0..elite.len() {
        let solution = elite.get(rank).unwrap();
        assert!(solution.is_feasible());
        for (comp, placements) in solution.data().used().iter().enumerate() {
            for p in placements {
                let y = solution.data().y(comp, p.kind, p.part, p.res);
                if p.kind.has_replicas() {
                    // Every co-resident partition shares the cluster size.
                    assert_eq!(y, solution.data().replicas(p.kind, p.res));
                    assert!(y >= 1);
                    assert!(y <= ctx.system.resources.number_avail(p.kind, p.res));
                } else {
                    assert_eq!(y, 1);
                }
            }
        }
    }
    Ok(())
}

#[test]
fn single_trials_are_deterministic_per_seed() -> anyhow::Result<()> {
    let ctx = context_from(three_tier_config());
    let greedy = reproducible(1, 5);

    let mut a_rng = StdRng::seed_from_u64(99);
    let mut b_rng = StdRng::seed_from_u64(99);
    let a = greedy.step(&ctx, &mut a_rng)?;
    let b = greedy.step(&ctx, &mut b_rng)?;

    assert_eq!(a.is_feasible(), b.is_feasible());
    if a.is_feasible() {
        assert_eq!(a.total_cost().to_bits(), b.total_cost().to_bits());
        assert_eq!(a.data().used(), b.data().used());
    }
    Ok(())
}

#[test]
fn partition_without_faas_fallback_is_rejected_at_load() {
    // Two devices in one layer but only one is compatible; without a FaaS
    // fallback a trial that candidates the other device could never place
    // p1, so the instance is rejected before any trial runs.
    let value = json!({
        "Lambda": 1.0,
        "Time": 1.0,
        "DirectedAcyclicGraph": { "c1": { "next": [], "transition_probability": [] } },
        "Components": { "c1": { "d1": { "p1": {
            "memory": 1.0, "early_exit_probability": 0.0, "next": "c1", "data_size": 0.0
        } } } },
        "EdgeResources": { "cl": {
            "dev1": { "cost": 1.0, "memory": 2.0, "number": 1 },
            "dev2": { "cost": 1.0, "memory": 2.0, "number": 1 }
        } },
        "CompatibilityMatrix": { "c1": { "p1": ["dev1"] } },
        "NetworkTechnology": { "nd": { "computationallayers": ["cl"], "AccessDelay": 0.0, "Bandwidth": 1.0 } },
        "GlobalConstraints": {},
        "Performance": { "c1": { "p1": { "dev1": { "model": "QTedge", "demand": 0.1 } } } }
    });

    let config = Config::from_value(value).expect("the schema itself is well-formed");
    match ProblemContext::from_config(&config) {
        Err(Error::ConfigInconsistent(message)) => {
            assert!(message.contains("FaaS"), "unexpected message: {message}");
        }
        other => panic!("expected ConfigInconsistent, got {other:?}"),
    }
}
