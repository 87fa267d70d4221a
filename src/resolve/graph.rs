//! Reference graph over the entity arena.
//!
//! # Responsibilities
//! - Turn entity reference fields into directed edges between arena slots
//! - Find reference cycles with an explicit in-progress set
//! - Mark every entity whose resolution would run into a cycle
//!
//! # Design Decisions
//! - Nodes are arena indices, never pointers into records
//! - Depth-first search from each node in declaration order; a back edge to
//!   a node still in progress closes a cycle
//! - Each back edge is reported once, so every cycle in the graph shows up
//!   in at least one report entry

use std::collections::VecDeque;

use crate::resolve::entities::{EntityId, EntitySnapshot};
use crate::resolve::references::{entity_reference_fields, reference_values};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Directed reference edges between entities of one snapshot.
#[derive(Debug, Clone)]
pub struct ReferenceGraph {
    edges: Vec<Vec<EntityId>>,
}

impl ReferenceGraph {
    /// Build the graph. References that do not resolve are not edges.
    pub fn build(snapshot: &EntitySnapshot) -> Self {
        let edges = snapshot
            .iter()
            .map(|(_, entity)| {
                entity_reference_fields(entity.key.kind)
                    .iter()
                    .flat_map(|field| {
                        reference_values(&entity.record, field)
                            .into_iter()
                            .filter_map(move |value| snapshot.lookup(field.target, value.id))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { edges }
    }

    /// A graph with explicit adjacency lists.
    pub fn from_edges(edges: Vec<Vec<EntityId>>) -> Self {
        Self { edges }
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self, node: EntityId) -> &[EntityId] {
        &self.edges[node]
    }

    /// Every cycle closed by a back edge, as a path that starts and ends on
    /// the same node (`[p1, r1, p1]`).
    pub fn find_cycles(&self) -> Vec<Vec<EntityId>> {
        let mut state = vec![Visit::Unvisited; self.edges.len()];
        let mut path = Vec::new();
        let mut cycles = Vec::new();
        for node in 0..self.edges.len() {
            if state[node] == Visit::Unvisited {
                self.visit(node, &mut state, &mut path, &mut cycles);
            }
        }
        cycles
    }

    fn visit(&self, node: EntityId, state: &mut [Visit], path: &mut Vec<EntityId>, cycles: &mut Vec<Vec<EntityId>>) {
        state[node] = Visit::InProgress;
        path.push(node);
        for &next in &self.edges[node] {
            match state[next] {
                Visit::Unvisited => self.visit(next, state, path, cycles),
                Visit::InProgress => {
                    if let Some(start) = path.iter().position(|&n| n == next) {
                        let mut cycle = path[start..].to_vec();
                        cycle.push(next);
                        cycles.push(cycle);
                    }
                }
                Visit::Done => {}
            }
        }
        path.pop();
        state[node] = Visit::Done;
    }

    /// For every node, the index of the first cycle it lies on or can reach.
    pub fn cycle_reach(&self, cycles: &[Vec<EntityId>]) -> Vec<Option<usize>> {
        let mut reverse = vec![Vec::new(); self.edges.len()];
        for (from, targets) in self.edges.iter().enumerate() {
            for &to in targets {
                reverse[to].push(from);
            }
        }

        let mut reach = vec![None; self.edges.len()];
        let mut queue = VecDeque::new();
        for (index, cycle) in cycles.iter().enumerate() {
            for &node in cycle {
                if reach[node].is_none() {
                    reach[node] = Some(index);
                    queue.push_back(node);
                }
            }
        }

        while let Some(node) = queue.pop_front() {
            for &from in &reverse[node] {
                if reach[from].is_none() {
                    reach[from] = reach[node];
                    queue.push_back(from);
                }
            }
        }
        reach
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValueTree;

    #[test]
    fn test_acyclic_graph() {
        let graph = ReferenceGraph::from_edges(vec![vec![1, 2], vec![2], vec![]]);
        assert!(graph.find_cycles().is_empty());
        assert_eq!(graph.cycle_reach(&[]), vec![None, None, None]);
    }

    #[test]
    fn test_three_node_cycle() {
        // 0 -> 1 -> 2 -> 0, and 3 -> 1 reaches the cycle.
        let graph = ReferenceGraph::from_edges(vec![vec![1], vec![2], vec![0], vec![1], vec![]]);
        let cycles = graph.find_cycles();
        assert_eq!(cycles, vec![vec![0, 1, 2, 0]]);
        assert_eq!(graph.cycle_reach(&cycles), vec![Some(0), Some(0), Some(0), Some(0), None]);
    }

    #[test]
    fn test_self_reference() {
        let graph = ReferenceGraph::from_edges(vec![vec![0]]);
        assert_eq!(graph.find_cycles(), vec![vec![0, 0]]);
    }

    #[test]
    fn test_built_from_snapshot() {
        let tree: ValueTree = toml::from_str(
            r#"
            [policies.p1]
            rules = ["r1"]

            [rules.r1]
            type = "allow"
            policies = ["p1"]

            [rules.r2]
            type = "deny"
            "#,
        )
        .unwrap();
        let snapshot = EntitySnapshot::from_tree(&tree);
        let graph = ReferenceGraph::build(&snapshot);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edges(0), &[1]);
        assert_eq!(graph.find_cycles(), vec![vec![0, 1, 0]]);
    }
}
