//! # Inclusion Removal
//!
//! Bulk removal of regions that are fully enclosed by a single other region.
//!
//! The graph is decomposed into biconnected components, rooted at a virtual
//! background vertex that touches every boundary region. A component that
//! hangs off the rest of the graph by one articulation node and never
//! reaches the background is an inclusion: all of its members are merged
//! into that articulation node.

use crate::contraction::{AccumulateCombine, merge};
use crate::primitives::BACKGROUND_ID;
use crate::{GraphError, NodeId, RegionGraph};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// A biconnected component attached to the rest of the graph through a
/// single articulation node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inclusion {
    /// The enclosing node; survives the removal.
    pub articulation: NodeId,
    /// Enclosed nodes, ascending.
    pub members: BTreeSet<NodeId>,
}

/// The InclusionRemover finds and contracts inclusions.
pub struct InclusionRemover;

impl InclusionRemover {
    /// List every inclusion that [`Self::remove_inclusions`] would contract.
    ///
    /// Components touching the background are never inclusions, and neither
    /// is a component whose enclosed members carry a preserve edge. Nodes
    /// not connected to the background are ignored.
    #[must_use]
    pub fn find_inclusions(graph: &RegionGraph) -> Vec<Inclusion> {
        biconnected_components(graph)
            .into_iter()
            .filter(|c| c.articulation != BACKGROUND_ID)
            .filter(|c| !c.members.contains(&BACKGROUND_ID))
            .filter(|c| {
                !c.members
                    .iter()
                    .any(|&id| graph.incident_edges(id).any(|e| e.preserve))
            })
            .collect()
    }

    /// Merge every inclusion into its articulation node.
    ///
    /// Returns the number of nodes removed from the graph.
    pub fn remove_inclusions(graph: &mut RegionGraph) -> Result<usize, GraphError> {
        let inclusions = Self::find_inclusions(graph);
        let mut forward: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut removed = 0usize;

        for inclusion in &inclusions {
            for &member in &inclusion.members {
                let target = resolve(&forward, inclusion.articulation);
                let source = resolve(&forward, member);
                if source == target {
                    continue;
                }
                merge(graph, source, target, &mut AccumulateCombine)?;
                forward.insert(source, target);
                removed += 1;
            }
            debug!(
                articulation = inclusion.articulation.0,
                members = inclusion.members.len(),
                "removed inclusion"
            );
        }

        info!(
            components = inclusions.len(),
            removed, "inclusion removal complete"
        );
        Ok(removed)
    }
}

/// Follow merge forwarding to the live survivor.
fn resolve(forward: &BTreeMap<NodeId, NodeId>, mut id: NodeId) -> NodeId {
    while let Some(&next) = forward.get(&id) {
        id = next;
    }
    id
}

// =============================================================================
// BICONNECTED COMPONENTS
// =============================================================================

/// Neighbors used by the decomposition: real contacts (false edges
/// excluded) plus the background for boundary nodes.
fn component_neighbors(graph: &RegionGraph, id: NodeId) -> Vec<NodeId> {
    let mut out: BTreeSet<NodeId> = BTreeSet::new();
    if id == BACKGROUND_ID {
        out.extend(graph.nodes().filter(|n| n.boundary).map(|n| n.id));
    } else if graph.node(id).is_some_and(|n| n.boundary) {
        out.insert(BACKGROUND_ID);
    }
    out.extend(
        graph
            .incident_edges(id)
            .filter(|e| !e.false_edge)
            .filter_map(|e| e.other(id)),
    );
    out.remove(&id);
    out.into_iter().collect()
}

struct Frame {
    node: NodeId,
    parent: Option<NodeId>,
    neighbors: Vec<NodeId>,
    next: usize,
}

/// Iterative Hopcroft–Tarjan from the background root.
///
/// Each returned component lists its articulation (the DFS parent at which
/// it was split off) separately from its other members.
fn biconnected_components(graph: &RegionGraph) -> Vec<Inclusion> {
    let mut disc: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut low: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut vertex_stack: Vec<NodeId> = Vec::new();
    let mut components = Vec::new();
    let mut counter = 0usize;

    disc.insert(BACKGROUND_ID, counter);
    low.insert(BACKGROUND_ID, counter);
    counter += 1;
    let mut frames = vec![Frame {
        node: BACKGROUND_ID,
        parent: None,
        neighbors: component_neighbors(graph, BACKGROUND_ID),
        next: 0,
    }];

    while let Some(frame) = frames.last_mut() {
        if frame.next < frame.neighbors.len() {
            let v = frame.node;
            let w = frame.neighbors[frame.next];
            frame.next += 1;
            if Some(w) == frame.parent {
                continue;
            }
            match disc.get(&w) {
                Some(&dw) => {
                    if let Some(lv) = low.get_mut(&v) {
                        *lv = (*lv).min(dw);
                    }
                }
                None => {
                    disc.insert(w, counter);
                    low.insert(w, counter);
                    counter += 1;
                    vertex_stack.push(w);
                    frames.push(Frame {
                        node: w,
                        parent: Some(v),
                        neighbors: component_neighbors(graph, w),
                        next: 0,
                    });
                }
            }
            continue;
        }

        let Some(done) = frames.pop() else {
            break;
        };
        let Some(parent) = done.parent else {
            continue;
        };
        let low_v = low.get(&done.node).copied().unwrap_or(usize::MAX);
        if let Some(lp) = low.get_mut(&parent) {
            *lp = (*lp).min(low_v);
        }
        let disc_p = disc.get(&parent).copied().unwrap_or(0);
        if low_v >= disc_p {
            let mut members = BTreeSet::new();
            while let Some(top) = vertex_stack.pop() {
                members.insert(top);
                if top == done.node {
                    break;
                }
            }
            components.push(Inclusion {
                articulation: parent,
                members,
            });
        }
    }

    components
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edge, Node};

    fn node(graph: &mut RegionGraph, id: u64, size: u64, boundary: bool) {
        graph
            .insert_node(Node::new(NodeId(id), size).with_boundary(boundary))
            .expect("insert");
    }

    fn edge(graph: &mut RegionGraph, a: u64, b: u64) {
        graph
            .insert_edge(Edge::new(NodeId(a), NodeId(b), 0.5).with_size(1))
            .expect("edge");
    }

    #[test]
    fn enclosed_node_is_merged() {
        let mut graph = RegionGraph::new();
        node(&mut graph, 1, 100, true);
        node(&mut graph, 2, 5, false);
        node(&mut graph, 3, 80, true);
        edge(&mut graph, 1, 2);
        edge(&mut graph, 1, 3);

        let removed = InclusionRemover::remove_inclusions(&mut graph).expect("remove");
        assert_eq!(removed, 1);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node(NodeId(1)).map(|n| n.size), Some(105));
    }

    #[test]
    fn nested_inclusions_collapse_into_outer_region() {
        let mut graph = RegionGraph::new();
        node(&mut graph, 1, 100, true);
        node(&mut graph, 2, 10, false);
        node(&mut graph, 3, 1, false);
        edge(&mut graph, 1, 2);
        edge(&mut graph, 2, 3);

        let removed = InclusionRemover::remove_inclusions(&mut graph).expect("remove");
        assert_eq!(removed, 2);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node(NodeId(1)).map(|n| n.size), Some(111));
    }

    #[test]
    fn cycle_of_enclosed_nodes_is_one_component() {
        let mut graph = RegionGraph::new();
        node(&mut graph, 1, 100, true);
        for id in 2..=4 {
            node(&mut graph, id, 3, false);
        }
        edge(&mut graph, 1, 2);
        edge(&mut graph, 2, 3);
        edge(&mut graph, 3, 4);
        edge(&mut graph, 4, 1);

        let inclusions = InclusionRemover::find_inclusions(&graph);
        assert_eq!(inclusions.len(), 1);
        assert_eq!(inclusions[0].articulation, NodeId(1));
        assert_eq!(inclusions[0].members.len(), 3);

        InclusionRemover::remove_inclusions(&mut graph).expect("remove");
        assert_eq!(graph.node_count(), 1);
        graph.check_consistency().expect("consistent");
    }

    #[test]
    fn region_touching_two_boundary_bodies_is_kept() {
        let mut graph = RegionGraph::new();
        node(&mut graph, 1, 100, true);
        node(&mut graph, 2, 5, false);
        node(&mut graph, 3, 80, true);
        edge(&mut graph, 1, 2);
        edge(&mut graph, 2, 3);

        let removed = InclusionRemover::remove_inclusions(&mut graph).expect("remove");
        assert_eq!(removed, 0);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn preserve_edge_blocks_removal() {
        let mut graph = RegionGraph::new();
        node(&mut graph, 1, 100, true);
        node(&mut graph, 2, 5, false);
        graph
            .insert_edge(Edge::new(NodeId(1), NodeId(2), 0.5).with_preserve(true))
            .expect("edge");

        let removed = InclusionRemover::remove_inclusions(&mut graph).expect("remove");
        assert_eq!(removed, 0);
        assert!(graph.contains_node(NodeId(2)));
    }

    #[test]
    fn false_edges_do_not_connect() {
        let mut graph = RegionGraph::new();
        node(&mut graph, 1, 100, true);
        node(&mut graph, 2, 5, false);
        node(&mut graph, 3, 80, true);
        edge(&mut graph, 1, 2);
        graph
            .insert_edge(Edge::new(NodeId(2), NodeId(3), 0.5).with_false_edge(true))
            .expect("edge");

        let inclusions = InclusionRemover::find_inclusions(&graph);
        assert_eq!(inclusions.len(), 1);
        assert_eq!(inclusions[0].articulation, NodeId(1));
    }

    #[test]
    fn real_background_node_counts_as_exterior() {
        let mut graph = RegionGraph::new();
        node(&mut graph, 0, 1000, false);
        node(&mut graph, 1, 100, false);
        node(&mut graph, 2, 5, false);
        edge(&mut graph, 0, 1);
        edge(&mut graph, 1, 2);

        let inclusions = InclusionRemover::find_inclusions(&graph);
        assert_eq!(inclusions.len(), 1);
        assert_eq!(inclusions[0].members, BTreeSet::from([NodeId(2)]));
    }

    #[test]
    fn unreachable_nodes_are_untouched() {
        let mut graph = RegionGraph::new();
        node(&mut graph, 1, 100, false);
        node(&mut graph, 2, 5, false);
        edge(&mut graph, 1, 2);

        let removed = InclusionRemover::remove_inclusions(&mut graph).expect("remove");
        assert_eq!(removed, 0);
        assert_eq!(graph.node_count(), 2);
    }
}
