//! Workflow transition graph.

use crate::config::DagNodeSpec;
use crate::error::{Error, Result};
use crate::types::{Load, Prob};
use std::collections::BTreeMap;

/// The workflow DAG, with components renumbered so that producers always
/// carry a smaller index than their consumers.
///
/// `matrix[i][j]` is the probability that component `i` runs next, given that
/// component `j` just finished. Rows that are entirely zero have no
/// predecessor; exactly one such root is required and it ends up at index 0.
#[derive(Clone, Debug)]
pub struct Dag {
    matrix: Vec<Vec<Prob>>,
    names: Vec<String>,
}

impl Dag {
    /// Build the DAG from the `DirectedAcyclicGraph` section.
    ///
    /// `component_names` is the full set of declared components (the DAG
    /// section alone misses the leaves, which never appear as keys). The
    /// returned graph is topologically renumbered.
    pub fn from_config(
        spec: &BTreeMap<String, DagNodeSpec>,
        component_names: &[String],
    ) -> Result<Self> {
        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for (i, name) in component_names.iter().enumerate() {
            index.insert(name.as_str(), i);
        }

        let n = component_names.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for (from, node) in spec {
            let Some(&j) = index.get(from.as_str()) else {
                return Err(Error::ConfigInconsistent(format!(
                    "DAG component `{from}` is not declared under Components"
                )));
            };
            for (to, &prob) in node.next.iter().zip(&node.transition_probability) {
                let Some(&i) = index.get(to.as_str()) else {
                    return Err(Error::ConfigInconsistent(format!(
                        "DAG successor `{to}` of `{from}` is not declared under Components"
                    )));
                };
                matrix[i][j] = prob;
            }
        }

        let order = topological_order(&matrix)?;

        // Renumber both the name list and the matrix with the found order.
        let names: Vec<String> = order
            .iter()
            .map(|&old| component_names[old].clone())
            .collect();
        let mut renumbered = vec![vec![0.0; n]; n];
        let mut new_of_old = vec![0usize; n];
        for (new, &old) in order.iter().enumerate() {
            new_of_old[old] = new;
        }
        for (i, row) in matrix.iter().enumerate() {
            for (j, &p) in row.iter().enumerate() {
                if p > 0.0 {
                    renumbered[new_of_old[i]][new_of_old[j]] = p;
                }
            }
        }

        Ok(Self {
            matrix: renumbered,
            names,
        })
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when the workflow has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Component names in topological index order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Incoming transition probabilities of component `i`: entry `j` is the
    /// probability of reaching `i` from `j`.
    #[must_use]
    pub fn incoming(&self, i: usize) -> &[Prob] {
        &self.matrix[i]
    }

    /// Arrival rate of every component given the external rate at the root.
    ///
    /// The root receives `lambda`; every other component receives the
    /// probability-weighted sum of its predecessors' rates. Topological
    /// numbering guarantees predecessors are resolved before their consumers.
    #[must_use]
    pub fn component_loads(&self, lambda: Load) -> Vec<Load> {
        let n = self.len();
        let mut loads = vec![0.0; n];
        for i in 0..n {
            let incoming = &self.matrix[i];
            let fed: Load = incoming.iter().zip(&loads).map(|(p, l)| p * l).sum();
            loads[i] = if incoming.iter().all(|&p| p == 0.0) {
                lambda
            } else {
                fed
            };
        }
        loads
    }
}

/// Breadth-first layering from the unique root.
fn topological_order(matrix: &[Vec<Prob>]) -> Result<Vec<usize>> {
    let n = matrix.len();
    let roots: Vec<usize> = (0..n)
        .filter(|&i| matrix[i].iter().all(|&p| p == 0.0))
        .collect();
    match roots.len() {
        0 => {
            return Err(Error::ConfigInconsistent(
                "workflow DAG has no root component (every component has a predecessor)".into(),
            ));
        }
        1 => {}
        _ => {
            return Err(Error::ConfigInconsistent(format!(
                "workflow DAG has {} root components; exactly one is required",
                roots.len()
            )));
        }
    }

    let mut order = vec![roots[0]];
    let mut placed = vec![false; n];
    placed[roots[0]] = true;
    let mut frontier = vec![roots[0]];

    while order.len() < n {
        let mut next_frontier = Vec::new();
        for &from in &frontier {
            for i in 0..n {
                if !placed[i] && matrix[i][from] > 0.0 {
                    placed[i] = true;
                    order.push(i);
                    next_frontier.push(i);
                }
            }
        }
        if next_frontier.is_empty() {
            // Leftover components are unreachable from the root.
            return Err(Error::ConfigInconsistent(
                "workflow DAG has components unreachable from the root".into(),
            ));
        }
        frontier = next_frontier;
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> BTreeMap<String, DagNodeSpec> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn renumbering_puts_producers_before_consumers() -> anyhow::Result<()> {
        // Declared names are alphabetical, but `zeta` feeds everything.
        let names = vec!["alpha".to_string(), "beta".to_string(), "zeta".to_string()];
        let dag = Dag::from_config(
            &spec(json!({
                "zeta": { "next": ["alpha", "beta"], "transition_probability": [0.7, 0.3] },
                "alpha": { "next": ["beta"], "transition_probability": [1.0] }
            })),
            &names,
        )?;

        assert_eq!(dag.names()[0], "zeta");
        for i in 0..dag.len() {
            for j in 0..dag.len() {
                if dag.incoming(i)[j] > 0.0 {
                    assert!(i > j, "edge {j} -> {i} breaks topological numbering");
                }
            }
        }
        Ok(())
    }

    #[test]
    fn loads_propagate_through_transition_probabilities() -> anyhow::Result<()> {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let dag = Dag::from_config(
            &spec(json!({
                "a": { "next": ["b", "c"], "transition_probability": [0.5, 0.5] },
                "b": { "next": ["c"], "transition_probability": [1.0] }
            })),
            &names,
        )?;

        let loads = dag.component_loads(10.0);
        assert_eq!(loads[0], 10.0);
        // b gets half of a; c gets half of a plus all of b.
        let b = dag.names().iter().position(|n| n == "b").unwrap();
        let c = dag.names().iter().position(|n| n == "c").unwrap();
        assert!((loads[b] - 5.0).abs() < 1e-12);
        assert!((loads[c] - 10.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn two_roots_are_rejected() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let result = Dag::from_config(
            &spec(json!({
                "a": { "next": ["c"], "transition_probability": [1.0] },
                "b": { "next": ["c"], "transition_probability": [1.0] }
            })),
            &names,
        );
        assert!(matches!(result, Err(Error::ConfigInconsistent(_))));
    }
}
