//! A directed graph over cross-container object references, with a
//! topological sort that decides materialization order. The graph itself
//! knows nothing about containers, rows, or classes — it only orders
//! opaque [`NodeRef`]s, the same way `pkg-linker`'s resolver only ever
//! asks it to add nodes and edges.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use pkg_format::ObjectIndex;
use thiserror::Error;

/// A class resolved by name rather than by table row — the engine
/// synthesizes it natively, so no container ever holds an import or
/// export for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeClassHandle {
    pub class_name: String,
}

impl NativeClassHandle {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }
}

/// What a [`NodeRef`] names within its container: a concrete table row,
/// or a native class resolved by name alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Row(ObjectIndex),
    Native(NativeClassHandle),
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Row(index) => write!(f, "{index:?}"),
            NodeKey::Native(handle) => write!(f, "native:{}", handle.class_name),
        }
    }
}

/// `(container_name, key)` — the graph's unit of identity. Two nodes are
/// the same node iff both fields are equal; the graph never dereferences
/// either field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub container_name: String,
    pub key: NodeKey,
}

impl NodeRef {
    pub fn row(container_name: impl Into<String>, index: ObjectIndex) -> Self {
        Self {
            container_name: container_name.into(),
            key: NodeKey::Row(index),
        }
    }

    pub fn native(container_name: impl Into<String>, handle: NativeClassHandle) -> Self {
        Self {
            container_name: container_name.into(),
            key: NodeKey::Native(handle),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.container_name, self.key)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("cannot add self-edge on node {0}")]
    SelfEdge(String),
}

/// Edges point from a dependency to its dependent: `add_edge(outer,
/// current)` reads "outer must exist before current". `topo_sort`
/// returns nodes in an order where every node appears after everything
/// it depends on.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    adjacency: IndexMap<NodeRef, IndexSet<NodeRef>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: adding the same node twice is a no-op.
    pub fn add_node(&mut self, node: NodeRef) {
        self.adjacency.entry(node).or_default();
    }

    /// Adds both endpoints if absent, then the edge `from -> to`. Edges
    /// are a set, so adding the same edge twice collapses silently.
    pub fn add_edge(&mut self, from: NodeRef, to: NodeRef) -> Result<(), Error> {
        if from == to {
            return Err(Error::SelfEdge(from.to_string()));
        }
        self.adjacency.entry(to.clone()).or_default();
        self.adjacency.entry(from.clone()).or_default().insert(to);
        Ok(())
    }

    pub fn edges_of(&self, node: &NodeRef) -> impl Iterator<Item = &NodeRef> {
        self.adjacency.get(node).into_iter().flatten()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn contains_node(&self, node: &NodeRef) -> bool {
        self.adjacency.contains_key(node)
    }

    /// Post-order depth-first traversal from every unvisited root, in
    /// insertion order; a node's own completion is pushed once all of its
    /// outgoing edges have been visited, so popping the finished stack
    /// yields a valid topological order (dependencies before dependents).
    ///
    /// A node reachable again while still `InProgress` denotes a cycle;
    /// rather than loop forever, that edge is simply skipped, so a
    /// malformed (non-DAG) input still terminates with *some* total
    /// order instead of overflowing the stack.
    pub fn topo_sort(&self) -> Vec<NodeRef> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            Unvisited,
            InProgress,
            Done,
        }

        let mut color: IndexMap<&NodeRef, Color> =
            self.adjacency.keys().map(|n| (n, Color::Unvisited)).collect();
        let mut finished = Vec::with_capacity(self.adjacency.len());

        for root in self.adjacency.keys() {
            if color[root] != Color::Unvisited {
                continue;
            }

            // (node, next child index to visit) per stack frame.
            let mut stack: Vec<(&NodeRef, usize)> = vec![(root, 0)];
            color.insert(root, Color::InProgress);

            while let Some(&mut (node, ref mut child_index)) = stack.last_mut() {
                let children: Vec<&NodeRef> = self.edges_of(node).collect();
                if *child_index < children.len() {
                    let child = children[*child_index];
                    *child_index += 1;
                    match color.get(child).copied().unwrap_or(Color::Unvisited) {
                        Color::Unvisited => {
                            color.insert(child, Color::InProgress);
                            stack.push((child, 0));
                        }
                        Color::InProgress => {
                            tracing::warn!(
                                node = %node,
                                child = %child,
                                "cycle detected in dependency graph, skipping back edge"
                            );
                        }
                        Color::Done => {}
                    }
                } else {
                    color.insert(node, Color::Done);
                    finished.push(node.clone());
                    stack.pop();
                }
            }
        }

        // `finished` is the completion (push) order of the post-order DFS,
        // which lists each node before everything it depends on. Popping
        // that stack — i.e. reversing it — yields the spec's topological
        // order: every node after everything it depends on.
        finished.reverse();
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, export: usize) -> NodeRef {
        NodeRef::row(name, ObjectIndex::from_export(export))
    }

    #[test]
    fn topo_sort_orders_dependency_before_dependent() {
        let mut graph = DependencyGraph::new();
        let outer = node("A", 0);
        let inner = node("A", 1);
        graph.add_edge(outer.clone(), inner.clone()).unwrap();

        let order = graph.topo_sort();
        let outer_pos = order.iter().position(|n| *n == outer).unwrap();
        let inner_pos = order.iter().position(|n| *n == inner).unwrap();
        assert!(outer_pos < inner_pos);
    }

    #[test]
    fn topo_sort_is_idempotent_under_repeated_inserts() {
        let mut graph = DependencyGraph::new();
        let a = node("A", 0);
        let b = node("A", 1);
        graph.add_edge(a.clone(), b.clone()).unwrap();
        let first = graph.topo_sort();

        graph.add_node(a.clone());
        graph.add_edge(a.clone(), b.clone()).unwrap();
        let second = graph.topo_sort();

        assert_eq!(first, second);
    }

    #[test]
    fn self_edge_is_rejected_and_graph_is_unchanged() {
        let mut graph = DependencyGraph::new();
        let a = node("A", 0);
        graph.add_node(a.clone());
        let before = graph.node_count();

        let err = graph.add_edge(a.clone(), a.clone()).unwrap_err();
        assert!(matches!(err, Error::SelfEdge(_)));
        assert_eq!(graph.node_count(), before);
        assert!(graph.edges_of(&a).next().is_none());
    }

    #[test]
    fn cyclic_graph_terminates_with_a_total_order() {
        let mut graph = DependencyGraph::new();
        let a = node("A", 0);
        let b = node("A", 1);
        let c = node("A", 2);
        graph.add_edge(a.clone(), b.clone()).unwrap();
        graph.add_edge(b.clone(), c.clone()).unwrap();
        graph.add_edge(c.clone(), a.clone()).unwrap();

        let order = graph.topo_sort();
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn native_class_nodes_are_distinct_from_row_nodes() {
        let mut graph = DependencyGraph::new();
        let row = node("A", 0);
        let native = NodeRef::native("A", NativeClassHandle::new("Vector"));
        graph.add_edge(native.clone(), row.clone()).unwrap();

        assert_eq!(graph.node_count(), 2);
        let order = graph.topo_sort();
        assert!(order.iter().position(|n| *n == native).unwrap() < order.iter().position(|n| *n == row).unwrap());
    }
}
