//! # Region Graph
//!
//! The region adjacency graph store.
//!
//! Nodes are kept in an id-keyed table, edges in a table keyed by their
//! canonical endpoint pair, and adjacency in an id → neighbor-set side
//! table. All three use `BTreeMap`/`BTreeSet`, so every iteration order is
//! deterministic and a node pair can never hold two edges.

use crate::{Edge, GraphError, Node, NodeId, canonical};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// Undirected region adjacency graph.
///
/// The graph is supplied pre-populated by an external builder; the
/// proofreading core only merges, deletes and restores records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionGraph {
    /// Node storage: NodeId -> Node
    nodes: BTreeMap<NodeId, Node>,

    /// Edge storage: (low, high) -> Edge
    edges: BTreeMap<(NodeId, NodeId), Edge>,

    /// Adjacency: NodeId -> neighbor ids
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl RegionGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Insert a new node. Fails if the id is already live.
    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.adjacency.entry(node.id).or_default();
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Insert a new edge between two live nodes.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        let (a, b) = edge.key();
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        for id in [a, b] {
            if !self.nodes.contains_key(&id) {
                return Err(GraphError::NodeNotFound(id));
            }
        }
        if self.edges.contains_key(&(a, b)) {
            return Err(GraphError::DuplicateEdge(a, b));
        }
        self.link(edge);
        Ok(())
    }

    /// Insert or overwrite an edge whose endpoints are known to be live.
    pub(crate) fn put_edge(&mut self, edge: Edge) {
        self.link(edge);
    }

    /// Overwrite a node record whose id is known to be live, or re-add one
    /// whose edges are restored separately.
    pub(crate) fn put_node(&mut self, node: Node) {
        self.adjacency.entry(node.id).or_default();
        self.nodes.insert(node.id, node);
    }

    fn link(&mut self, edge: Edge) {
        let (a, b) = edge.key();
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        self.edges.insert((a, b), edge);
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look up the edge between two nodes, in either order.
    #[must_use]
    pub fn edge(&self, a: NodeId, b: NodeId) -> Option<&Edge> {
        self.edges.get(&canonical(a, b))
    }

    pub fn edge_mut(&mut self, a: NodeId, b: NodeId) -> Option<&mut Edge> {
        self.edges.get_mut(&canonical(a, b))
    }

    #[must_use]
    pub fn contains_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.edges.contains_key(&canonical(a, b))
    }

    /// Neighbor ids of a node, ascending. Empty for unknown ids.
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.get(&id).into_iter().flatten().copied()
    }

    /// Edges incident to a node, ordered by neighbor id.
    pub fn incident_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.neighbors(id)
            .filter_map(move |other| self.edges.get(&canonical(id, other)))
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// All node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// All edges in canonical key order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.values_mut()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Sum of all live node sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.nodes
            .values()
            .fold(0u64, |acc, n| acc.saturating_add(n.size))
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Remove one edge and return it.
    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<Edge, GraphError> {
        let key = canonical(a, b);
        let edge = self
            .edges
            .remove(&key)
            .ok_or(GraphError::EdgeNotFound(key.0, key.1))?;
        if let Some(set) = self.adjacency.get_mut(&key.0) {
            set.remove(&key.1);
        }
        if let Some(set) = self.adjacency.get_mut(&key.1) {
            set.remove(&key.0);
        }
        Ok(edge)
    }

    /// Remove a node together with all of its edges.
    ///
    /// Returns the node record and the removed edges in neighbor order.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(Node, Vec<Edge>), GraphError> {
        let node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        let neighbors = self.adjacency.remove(&id).unwrap_or_default();
        let mut removed = Vec::with_capacity(neighbors.len());
        for other in neighbors {
            if let Some(edge) = self.edges.remove(&canonical(id, other)) {
                removed.push(edge);
            }
            if let Some(set) = self.adjacency.get_mut(&other) {
                set.remove(&id);
            }
        }
        Ok((node, removed))
    }

    // -------------------------------------------------------------------------
    // Invariants
    // -------------------------------------------------------------------------

    /// Verify that the edge table and the adjacency table agree and that
    /// every edge joins two distinct live nodes.
    pub fn check_consistency(&self) -> Result<(), GraphError> {
        for (&(a, b), edge) in &self.edges {
            if a >= b || edge.key() != (a, b) {
                return Err(GraphError::Corrupted(format!(
                    "edge {a} -- {b} is not stored canonically"
                )));
            }
            if !self.nodes.contains_key(&a) || !self.nodes.contains_key(&b) {
                return Err(GraphError::Corrupted(format!(
                    "edge {a} -- {b} references a removed node"
                )));
            }
            let linked = |x: NodeId, y: NodeId| {
                self.adjacency
                    .get(&x)
                    .is_some_and(|set| set.contains(&y))
            };
            if !linked(a, b) || !linked(b, a) {
                return Err(GraphError::Corrupted(format!(
                    "edge {a} -- {b} is missing from adjacency"
                )));
            }
        }
        let links: usize = self.adjacency.values().map(BTreeSet::len).sum();
        if links != self.edges.len() * 2 {
            return Err(GraphError::Corrupted(format!(
                "adjacency holds {links} links for {} edges",
                self.edges.len()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of the graph for persistence and exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl From<&RegionGraph> for SerializableGraph {
    fn from(graph: &RegionGraph) -> Self {
        Self {
            nodes: graph.nodes.values().cloned().collect(),
            edges: graph.edges.values().cloned().collect(),
        }
    }
}

impl TryFrom<SerializableGraph> for RegionGraph {
    type Error = GraphError;

    fn try_from(sg: SerializableGraph) -> Result<Self, Self::Error> {
        let mut graph = RegionGraph::new();
        for node in sg.nodes {
            graph.insert_node(node)?;
        }
        for edge in sg.edges {
            // Re-canonicalize in case the document was written by hand.
            let edge = Edge {
                a: edge.a.min(edge.b),
                b: edge.a.max(edge.b),
                ..edge
            };
            graph.insert_edge(edge)?;
        }
        Ok(graph)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> RegionGraph {
        let mut graph = RegionGraph::new();
        for (id, size) in [(1, 10), (2, 20), (3, 30)] {
            graph.insert_node(Node::new(NodeId(id), size)).expect("insert");
        }
        graph
            .insert_edge(Edge::new(NodeId(1), NodeId(2), 0.1))
            .expect("edge");
        graph
            .insert_edge(Edge::new(NodeId(3), NodeId(2), 0.2))
            .expect("edge");
        graph
            .insert_edge(Edge::new(NodeId(1), NodeId(3), 0.3))
            .expect("edge");
        graph
    }

    #[test]
    fn edge_lookup_is_order_insensitive() {
        let graph = triangle();
        let forward = graph.edge(NodeId(2), NodeId(3)).expect("edge");
        let backward = graph.edge(NodeId(3), NodeId(2)).expect("edge");
        assert_eq!(forward, backward);
        assert_eq!(forward.key(), (NodeId(2), NodeId(3)));
    }

    #[test]
    fn duplicate_edge_rejected() {
        let mut graph = triangle();
        let result = graph.insert_edge(Edge::new(NodeId(2), NodeId(1), 0.5));
        assert_eq!(result, Err(GraphError::DuplicateEdge(NodeId(1), NodeId(2))));
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn self_loop_and_dangling_edges_rejected() {
        let mut graph = triangle();
        assert_eq!(
            graph.insert_edge(Edge::new(NodeId(1), NodeId(1), 0.5)),
            Err(GraphError::SelfLoop(NodeId(1)))
        );
        assert_eq!(
            graph.insert_edge(Edge::new(NodeId(1), NodeId(9), 0.5)),
            Err(GraphError::NodeNotFound(NodeId(9)))
        );
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut graph = triangle();
        let (node, edges) = graph.remove_node(NodeId(2)).expect("remove");
        assert_eq!(node.size, 20);
        assert_eq!(edges.len(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.neighbors(NodeId(1)).collect::<Vec<_>>(), vec![NodeId(3)]);
        graph.check_consistency().expect("consistent");
    }

    #[test]
    fn total_size_sums_live_nodes() {
        let graph = triangle();
        assert_eq!(graph.total_size(), 60);
    }

    #[test]
    fn serializable_roundtrip() {
        let graph = triangle();
        let sg = SerializableGraph::from(&graph);
        let restored = RegionGraph::try_from(sg).expect("restore");
        assert_eq!(graph, restored);
    }

    #[test]
    fn serializable_rejects_duplicate_nodes() {
        let sg = SerializableGraph {
            nodes: vec![Node::new(NodeId(1), 1), Node::new(NodeId(1), 2)],
            edges: Vec::new(),
        };
        assert_eq!(
            RegionGraph::try_from(sg),
            Err(GraphError::DuplicateNode(NodeId(1)))
        );
    }
}
