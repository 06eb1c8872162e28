//! # Edgeplan
//!
//! A **randomized placement and sizing engine** for DAG workflows of AI
//! components deployed across a heterogeneous fleet of Edge devices, cloud
//! VMs and FaaS platforms. Edgeplan takes a JSON problem description, splits
//! each component into its candidate partitions, and searches for the
//! cheapest assignment of partitions to resources (with Edge/VM cluster
//! sizing) that satisfies memory, colocation, tier-progression and
//! response-time constraints.
//!
//! ## Key Features
//!
//! - **Typed problem model** - components, deployments, partitions, layered
//!   resources, network domains and constraints, lowered from JSON with full
//!   cross-reference checking
//! - **Queueing-aware evaluation** - per-resource utilisation aggregated over
//!   every co-resident partition, with NaN-free constraint verdicts
//! - **Random Greedy construction** - parallel multi-start with a
//!   cost-reducing cluster-shrink pass
//! - **Local Search refinement** - three feasibility-preserving operators
//!   over every elite seed
//! - **Reproducible parallelism** - per-trial seeding makes multi-threaded
//!   runs schedule-independent
//! - **Runtime reconfiguration** - re-solve under a changed arrival rate with
//!   the Edge fleet locked to a prior solution
//!
//! ## Quick Start
//!
//! ```no_run
//! use edgeplan::{Config, ProblemContext, SearchDriver};
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let config = Config::from_path("system.json")?;
//! let ctx = ProblemContext::from_config(&config)?;
//!
//! let driver = SearchDriver::default();
//! let elite = driver.run(&ctx)?;
//!
//! elite.write_rank(&ctx.system, 0, "solution.json")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### `ProblemContext`
//!
//! A [`ProblemContext`] bundles the immutable [`SystemData`] (the resolved
//! problem instance) with the [`PerformanceIndex`] (one response-time model
//! per compatible placement). It is built once per run and shared by
//! reference with every search worker.
//!
//! ### `Solution`
//!
//! A [`Solution`] owns the assignment tensor `y`, the per-component ordered
//! placement lists and the per-resource cluster sizes, plus caches for the
//! feasibility verdict, response times, slacks and total cost. Solutions are
//! mutated by exactly one worker at a time and moved into an [`EliteResult`]
//! when submitted.
//!
//! ### Search phases
//!
//! [`RandomGreedy`] runs independent randomized construction trials in
//! parallel and keeps the top-K feasible results. [`LocalSearch`] then
//! refines each elite seed with three operators (VM-to-Edge migration,
//! FaaS-to-VM migration, deployment change) that only ever accept
//! feasibility-preserving, non-cost-increasing moves. [`SearchDriver`] chains
//! the two and returns the refined elite.
//!
//! ### Evaluation
//!
//! The [`Evaluator`](eval::Evaluator) runs every check in a fixed order and
//! reports the first violation as an [`Infeasibility`] verdict -- an expected
//! outcome, not an error. Fatal problems (malformed configuration,
//! disconnected layers, no feasible result) surface as [`Error`].
//!
//! ## Reproducibility
//!
//! With [`RandomGreedy::reproducibility`] enabled, trial `i` derives its RNG
//! seed from the base seed and `i` alone, so two runs with the same inputs
//! produce identical elites regardless of thread scheduling.
//!
//! ## Testing Your Configurations
//!
//! The [`testing`] module ships complete fixture configurations and helpers
//! used by the crate's own test-suite:
//!
//! ```
//! use edgeplan::testing::*;
//!
//! let ctx = tiny_edge_context();
//! assert_eq!(ctx.system.components.len(), 1);
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - raw JSON schema of the problem description
//! - [`system`] - the resolved, immutable problem instance
//! - [`perf`] - response-time models and the cold-start predictor boundary
//! - [`solution`] - placement tensors and the solution JSON format
//! - [`eval`] - feasibility checks, response times, cost
//! - [`greedy`] - the multi-start randomized constructor
//! - [`local_search`] - the neighborhood improver
//! - [`elite`] - bounded, thread-safe top-K container
//! - [`driver`] - phase orchestration, cancellation, thread control
//! - [`testing`] - fixtures and assertions for tests

pub mod config;
pub mod context;
pub mod driver;
pub mod elite;
pub mod error;
pub mod eval;
pub mod greedy;
pub mod local_search;
pub mod perf;
pub mod solution;
pub mod system;
pub mod testing;
pub mod types;
pub mod utils;

// General re-exports
pub use config::Config;
pub use context::ProblemContext;
pub use driver::{CancelFlag, SearchDriver};
pub use elite::EliteResult;
pub use error::{Error, Infeasibility, Result, Verdict};
pub use eval::{Evaluator, LocalInfo};
pub use greedy::RandomGreedy;
pub use local_search::{LocalSearch, OperatorCounters};
pub use perf::{AnalyticColdStart, ColdStartPredictor, PerformanceIndex, PerformanceModel};
pub use solution::{SelectedResources, Solution, SolutionData};
pub use system::SystemData;
pub use types::{Placement, ResourceKind};
