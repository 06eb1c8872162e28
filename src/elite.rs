//! Bounded top-K solution container.

use crate::error::{Error, Result};
use crate::solution::Solution;
use crate::system::SystemData;
use crate::utils::cost_key;
use std::path::Path;
use std::sync::Mutex;

/// A fixed-capacity list of the best solutions found so far, sorted by
/// ascending total cost.
///
/// [`add`](Self::add) is safe to call from concurrent search workers; the
/// container is the only shared mutable state of a run and the critical
/// section is a sort-and-truncate over at most `capacity + 1` entries.
#[derive(Debug)]
pub struct EliteResult {
    capacity: usize,
    inner: Mutex<Vec<Solution>>,
}

impl EliteResult {
    /// An empty container keeping at most `capacity` solutions.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Vec::with_capacity(capacity + 1)),
        }
    }

    /// Insert a solution, keeping the container sorted and bounded.
    ///
    /// The stable sort preserves insertion order among equal costs, so the
    /// first solution found at a given cost outranks later ties.
    pub fn add(&self, solution: Solution) {
        let mut entries = self.inner.lock().expect("elite container poisoned");
        entries.push(solution);
        entries.sort_by_key(|s| cost_key(s.total_cost()));
        entries.truncate(self.capacity);
    }

    /// Number of stored solutions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("elite container poisoned").len()
    }

    /// True when nothing has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of stored solutions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A copy of the solution at `rank` (0 is the cheapest).
    #[must_use]
    pub fn get(&self, rank: usize) -> Option<Solution> {
        self.inner
            .lock()
            .expect("elite container poisoned")
            .get(rank)
            .cloned()
    }

    /// Cost of the best stored solution.
    #[must_use]
    pub fn best_cost(&self) -> Option<f64> {
        self.inner
            .lock()
            .expect("elite container poisoned")
            .first()
            .map(Solution::total_cost)
    }

    /// Consume the container, returning the ranked solutions.
    #[must_use]
    pub fn into_solutions(self) -> Vec<Solution> {
        self.inner.into_inner().expect("elite container poisoned")
    }

    /// Write the solution at `rank` to a JSON file.
    pub fn write_rank<P: AsRef<Path>>(
        &self,
        system: &SystemData,
        rank: usize,
        path: P,
    ) -> Result<()> {
        let solution = self.get(rank).ok_or(Error::NoFeasibleFound)?;
        solution.write_json(system, path)
    }
}
