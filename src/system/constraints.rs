//! Response-time constraints.

use crate::types::Seconds;

/// Per-component response-time limit. Components without an entry in the
/// configuration get `+inf`.
#[derive(Clone, Debug)]
pub struct LocalConstraint {
    /// Component index.
    pub component: usize,
    /// Maximum admissible response time.
    pub max_response_time: Seconds,
}

/// End-to-end response-time limit over a named path of components.
#[derive(Clone, Debug)]
pub struct GlobalConstraint {
    /// Path name.
    pub path: String,
    /// Ordered component indices along the path.
    pub components: Vec<usize>,
    /// Maximum admissible end-to-end response time.
    pub max_response_time: Seconds,
}
