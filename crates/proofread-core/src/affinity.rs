//! # Affinity Search
//!
//! Best-first search for the most confident connection between a source
//! region and every region reachable from it.
//!
//! The affinity of an edge is `1 - weight`; the affinity of a path is the
//! product of its edge affinities. The search always expands the candidate
//! with the highest cumulative affinity, so the first time a node is popped
//! its affinity is final.

use crate::primitives::{DEFAULT_CONNECTION_THRESHOLD, MIN_EDGE_AFFINITY};
use crate::{GraphError, NodeId, RegionGraph};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

// =============================================================================
// PARAMETERS AND RESULTS
// =============================================================================

/// Bounds applied to one search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffinityParams {
    /// Maximum number of hops from the source; `0` means unbounded.
    pub max_hops: u32,
    /// Paths whose cumulative affinity drops below this are abandoned.
    pub connection_threshold: f64,
    /// Refuse to connect through preserve-flagged edges.
    pub preserve_aware: bool,
}

impl Default for AffinityParams {
    fn default() -> Self {
        Self {
            max_hops: 0,
            connection_threshold: DEFAULT_CONNECTION_THRESHOLD,
            preserve_aware: false,
        }
    }
}

/// Best connection found from the source to one target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffinityPair {
    pub target: NodeId,
    /// Product of `1 - weight` along the best path, in `[0, 1]`.
    pub affinity: f64,
    /// First node on the path after the source, or the target itself when
    /// the source touches it directly.
    pub via: NodeId,
    pub hops: u32,
}

/// Search results keyed by target id.
pub type AffinityMap = BTreeMap<NodeId, AffinityPair>;

// =============================================================================
// HEAP ENTRY
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Candidate {
    affinity: f64,
    node: NodeId,
    via: NodeId,
    hops: u32,
    incoming: Option<(NodeId, NodeId)>,
}

impl Ord for Candidate {
    /// Higher affinity first; ties go to the smaller id, then fewer hops.
    fn cmp(&self, other: &Self) -> Ordering {
        self.affinity
            .total_cmp(&other.affinity)
            .then_with(|| other.node.cmp(&self.node))
            .then_with(|| other.hops.cmp(&self.hops))
            .then_with(|| other.via.cmp(&self.via))
            .then_with(|| other.incoming.cmp(&self.incoming))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

// =============================================================================
// SEARCH
// =============================================================================

/// The AffinitySearch runs bounded best-first searches on demand.
pub struct AffinitySearch;

impl AffinitySearch {
    /// Find the best connection from `source` to every reachable node.
    ///
    /// Expansion skips:
    /// - the edge the current path arrived through, and finalized nodes
    /// - anything beyond `max_hops`
    /// - nodes whose direct edge to the source is already resolved
    /// - with `preserve_aware`, nodes whose direct edge to the source is
    ///   preserve-flagged, or (without a direct edge) preserve-flagged hops
    /// - edges with affinity below `MIN_EDGE_AFFINITY`, and paths below the
    ///   connection threshold
    ///
    /// The source itself is not part of the result.
    pub fn search(
        graph: &RegionGraph,
        source: NodeId,
        params: &AffinityParams,
    ) -> Result<AffinityMap, GraphError> {
        if !graph.contains_node(source) {
            return Err(GraphError::NodeNotFound(source));
        }

        let mut results = AffinityMap::new();
        let mut finalized: BTreeSet<NodeId> = BTreeSet::new();
        let mut heap = BinaryHeap::new();
        heap.push(Candidate {
            affinity: 1.0,
            node: source,
            via: source,
            hops: 0,
            incoming: None,
        });

        while let Some(current) = heap.pop() {
            if !finalized.insert(current.node) {
                continue;
            }
            if current.node != source {
                results.insert(
                    current.node,
                    AffinityPair {
                        target: current.node,
                        affinity: current.affinity,
                        via: current.via,
                        hops: current.hops,
                    },
                );
            }
            if params.max_hops > 0 && current.hops >= params.max_hops {
                continue;
            }

            for edge in graph.incident_edges(current.node) {
                if Some(edge.key()) == current.incoming {
                    continue;
                }
                let Some(other) = edge.other(current.node) else {
                    continue;
                };
                if finalized.contains(&other) {
                    continue;
                }

                let direct = graph.edge(source, other);
                if direct.is_some_and(|d| d.is_resolved()) {
                    continue;
                }
                if params.preserve_aware && direct.map_or(edge.preserve, |d| d.preserve) {
                    continue;
                }
                let touches_source = direct.is_some_and(|d| !d.false_edge);

                let edge_affinity = (1.0 - edge.weight).min(1.0);
                if edge_affinity < MIN_EDGE_AFFINITY {
                    continue;
                }
                let affinity = current.affinity * edge_affinity;
                if affinity < params.connection_threshold {
                    continue;
                }

                let hops = current.hops + 1;
                let via = if hops > 1 && !touches_source {
                    current.via
                } else {
                    other
                };
                heap.push(Candidate {
                    affinity,
                    node: other,
                    via,
                    hops,
                    incoming: Some(edge.key()),
                });
            }
        }

        Ok(results)
    }

    /// Best unbounded affinity between two nodes, ignoring preserve flags.
    ///
    /// Returns `0.0` when the target is unreachable above the default
    /// connection threshold.
    pub fn path_affinity(
        graph: &RegionGraph,
        source: NodeId,
        target: NodeId,
    ) -> Result<f64, GraphError> {
        if !graph.contains_node(target) {
            return Err(GraphError::NodeNotFound(target));
        }
        let results = Self::search(graph, source, &AffinityParams::default())?;
        Ok(results.get(&target).map_or(0.0, |pair| pair.affinity))
    }
}

// =============================================================================
// TESTS
// =============================================================================
