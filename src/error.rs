//! Error and verdict types.
//!
//! Two very different failure families live here and must not be conflated:
//!
//! - [`Error`] is fatal: a malformed configuration, an ill-posed network
//!   topology, an I/O problem, or a search that finished without a single
//!   feasible solution. These abort the driver.
//! - [`Infeasibility`] is the routine outcome of evaluating a candidate
//!   placement that violates a constraint. The search handles it locally
//!   (the trial is discarded or the operator reverted); it never escapes
//!   the optimisation loop as an error.

use thiserror::Error;

/// Fatal errors surfaced to the driver.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is absent from the configuration.
    #[error("configuration is missing required field `{0}`")]
    ConfigMissingField(&'static str),

    /// A configuration field is present but unusable.
    #[error("configuration field `{field}`: {reason}")]
    ConfigBadValue {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The configuration contradicts itself (e.g. a path references an
    /// undeclared component).
    #[error("inconsistent configuration: {0}")]
    ConfigInconsistent(String),

    /// No network domain contains both computational layers; the problem is
    /// ill-posed.
    #[error("no network domain connects computational layers `{0}` and `{1}`")]
    NoNetworkDomain(String, String),

    /// The search completed without producing any feasible solution.
    #[error("no feasible solution found")]
    NoFeasibleFound,

    /// The external cold-start predictor failed.
    #[error("cold-start predictor failed: {0}")]
    Predictor(String),

    /// Filesystem failure while reading configuration or writing solutions.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a candidate solution was rejected by the evaluator.
///
/// This is a verdict, not an error: rejected candidates are an expected,
/// frequent outcome of randomized search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Infeasibility {
    /// A partition of the chosen deployment is unplaced, placed twice, or a
    /// replica count exceeds availability.
    InvalidAssignment,
    /// A placement contradicts the compatibility mask.
    CompatibilityViolation,
    /// Aggregate partition memory exceeds a resource's capacity.
    MemoryViolation,
    /// A partition on Edge follows one on VM/FaaS within the same component.
    MonotonicityViolation,
    /// More than one partition on a resource whose model forbids colocation.
    ColocationViolation,
    /// Aggregate utilisation of an Edge/VM resource reached 1.
    UtilisationOverload,
    /// A component's response time exceeds its local constraint.
    LocalResponseViolation(usize),
    /// A path's end-to-end response time exceeds its global constraint.
    GlobalResponseViolation(usize),
}

/// Outcome of a full or scoped feasibility evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// All invariants and constraints hold.
    Feasible,
    /// The first violated constraint, in check order.
    Infeasible(Infeasibility),
}

impl Verdict {
    /// True for [`Verdict::Feasible`].
    #[inline]
    #[must_use]
    pub fn is_feasible(self) -> bool {
        matches!(self, Verdict::Feasible)
    }
}
