//! Explicit dependency graph between declared resources.
//!
//! Edges point from a dependency to its dependent, so a topological order is
//! a valid creation order.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rbac_core::{LogicalId, RbacError, RbacResult};
use std::collections::HashMap;
use tracing::debug;

/// Directed acyclic graph of declared resources.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<LogicalId, ()>,
    nodes: HashMap<LogicalId, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node. Adding an existing id is a no-op.
    pub fn add_node(&mut self, id: LogicalId) {
        if self.nodes.contains_key(&id) {
            return;
        }
        let index = self.graph.add_node(id.clone());
        self.nodes.insert(id, index);
    }

    /// Returns true if `id` is a node of the graph.
    #[must_use]
    pub fn contains(&self, id: &LogicalId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn index(&self, id: &LogicalId) -> RbacResult<NodeIndex> {
        self.nodes
            .get(id)
            .copied()
            .ok_or_else(|| RbacError::UnknownResource(id.to_string()))
    }

    /// Declares that `dependent` must be created after `dependency`.
    ///
    /// Both ends must already be nodes. Repeating an edge is a no-op.
    pub fn add_dependency(&mut self, dependent: &LogicalId, dependency: &LogicalId) -> RbacResult<()> {
        let to = self.index(dependent)?;
        let from = self.index(dependency)?;
        if self.graph.find_edge(from, to).is_none() {
            debug!(dependent = %dependent, dependency = %dependency, "Adding dependency edge");
            self.graph.add_edge(from, to, ());
        }
        Ok(())
    }

    /// Returns true if `dependent` directly depends on `dependency`.
    #[must_use]
    pub fn depends_on(&self, dependent: &LogicalId, dependency: &LogicalId) -> bool {
        match (self.nodes.get(dependency), self.nodes.get(dependent)) {
            (Some(&from), Some(&to)) => self.graph.find_edge(from, to).is_some(),
            _ => false,
        }
    }

    /// Returns true if `earlier` must be created before `later`, directly or transitively.
    #[must_use]
    pub fn precedes(&self, earlier: &LogicalId, later: &LogicalId) -> bool {
        match (self.nodes.get(earlier), self.nodes.get(later)) {
            (Some(&from), Some(&to)) if from != to => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    /// Direct dependencies of `id`, sorted.
    #[must_use]
    pub fn dependencies_of(&self, id: &LogicalId) -> Vec<LogicalId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct dependents of `id`, sorted.
    #[must_use]
    pub fn dependents_of(&self, id: &LogicalId) -> Vec<LogicalId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &LogicalId, direction: Direction) -> Vec<LogicalId> {
        let Some(&index) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<LogicalId> = self
            .graph
            .neighbors_directed(index, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Returns a creation order, or the node at which a cycle was found.
    pub fn topological_order(&self) -> RbacResult<Vec<LogicalId>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|n| self.graph[n].clone()).collect())
            .map_err(|cycle| RbacError::DependencyCycle(self.graph[cycle.node_id()].to_string()))
    }
}
