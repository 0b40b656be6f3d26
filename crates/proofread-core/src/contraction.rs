//! # Graph Contraction
//!
//! Merges one region into another.
//!
//! Every edge of the removed node is re-pointed at the survivor. When the
//! survivor already touches the same far node, a [`CombineStrategy`]
//! decides how the two parallel edges fold into one. The returned
//! [`MergeRecord`] carries everything needed to put the graph back exactly
//! as it was via [`unmerge`].

use crate::{Edge, GraphError, Node, NodeId, RegionGraph};
use serde::{Deserialize, Serialize};
use tracing::debug;

// =============================================================================
// COMBINE STRATEGIES
// =============================================================================

/// Hooks run while two nodes are contracted.
pub trait CombineStrategy {
    /// Fold `removed` into `keep`, where both join the survivor to the same
    /// far node. Flag folding (preserve OR, false-edge AND) runs afterwards.
    fn on_edge_combine(&mut self, keep: &mut Edge, removed: &Edge);

    /// Fold the removed node's record into the survivor, after size and
    /// boundary have been combined.
    fn on_node_combine(&mut self, keep: &mut Node, removed: &Node);
}

/// Keep the most confident separation evidence.
///
/// The removed edge's weight wins when it is lower than the kept weight
/// (both in probability range) or when it is a resolved sentinel.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestWeightCombine;

impl CombineStrategy for LowestWeightCombine {
    fn on_edge_combine(&mut self, keep: &mut Edge, removed: &Edge) {
        let take = (removed.weight <= keep.weight && keep.weight <= 1.0) || removed.weight > 1.0;
        if take {
            keep.weight = removed.weight;
            if !removed.false_edge {
                keep.props = removed.props;
            }
        }
    }

    fn on_node_combine(&mut self, keep: &mut Node, removed: &Node) {
        fold_node_properties(keep, removed);
    }
}

/// Accumulate contact sizes and blend weights by contact size.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccumulateCombine;

impl CombineStrategy for AccumulateCombine {
    fn on_edge_combine(&mut self, keep: &mut Edge, removed: &Edge) {
        if keep.false_edge {
            // A synthetic edge has nothing to accumulate; take the real contact.
            keep.weight = removed.weight;
            keep.size = removed.size;
            keep.props = removed.props;
            return;
        }
        if removed.false_edge {
            return;
        }

        keep.weight = if keep.is_resolved() || removed.is_resolved() {
            keep.weight.max(removed.weight)
        } else {
            let total = keep.size.saturating_add(removed.size);
            if total == 0 {
                (keep.weight + removed.weight) / 2.0
            } else {
                (keep.weight * keep.size as f64 + removed.weight * removed.size as f64)
                    / total as f64
            }
        };

        if removed.size > keep.size {
            keep.props.location = removed.props.location.or(keep.props.location);
        } else {
            keep.props.location = keep.props.location.or(removed.props.location);
        }
        keep.props.edge_size = match (keep.props.edge_size, removed.props.edge_size) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
        };
        keep.size = keep.size.saturating_add(removed.size);
    }

    fn on_node_combine(&mut self, keep: &mut Node, removed: &Node) {
        fold_node_properties(keep, removed);
    }
}

/// Node property folding shared by both strategies.
///
/// The survivor stays an orphan only if both sides were orphans, and
/// synapse weights add up.
fn fold_node_properties(keep: &mut Node, removed: &Node) {
    if keep.props.is_orphan() && !removed.props.is_orphan() {
        keep.props.orphan = Some(false);
    }
    let synapses = keep
        .props
        .synapse_weight()
        .saturating_add(removed.props.synapse_weight());
    if synapses > 0 {
        keep.props.synapse_weight = Some(synapses);
    }
}

// =============================================================================
// MERGE RECORD
// =============================================================================

/// Everything needed to reverse one merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    /// The removed node as it was before the merge.
    pub removed: Node,
    /// The surviving node as it was before the merge.
    pub kept_before: Node,
    /// All edges of the removed node, including the joining edge.
    pub removed_edges: Vec<Edge>,
    /// Survivor edges that absorbed a parallel edge, pre-merge state.
    pub overwritten: Vec<Edge>,
    /// Survivor edges that did not exist before the merge.
    pub created: Vec<(NodeId, NodeId)>,
}

impl MergeRecord {
    /// Id of the surviving node.
    #[must_use]
    pub fn kept(&self) -> NodeId {
        self.kept_before.id
    }
}

// =============================================================================
// MERGE / UNMERGE
// =============================================================================

/// Merge `remove` into `keep`.
///
/// Fails without touching the graph if either node is missing or if the two
/// ids are equal.
pub fn merge<S: CombineStrategy + ?Sized>(
    graph: &mut RegionGraph,
    remove: NodeId,
    keep: NodeId,
    strategy: &mut S,
) -> Result<MergeRecord, GraphError> {
    if remove == keep {
        return Err(GraphError::SelfMerge(keep));
    }
    let kept_before = graph
        .node(keep)
        .cloned()
        .ok_or(GraphError::NodeNotFound(keep))?;
    if !graph.contains_node(remove) {
        return Err(GraphError::NodeNotFound(remove));
    }

    let (removed, removed_edges) = graph.remove_node(remove)?;
    let mut overwritten = Vec::new();
    let mut created = Vec::new();

    for edge in &removed_edges {
        let Some(far) = edge.other(remove) else {
            continue;
        };
        if far == keep {
            continue;
        }
        match graph.edge(keep, far).cloned() {
            Some(existing) => {
                let mut combined = existing.clone();
                strategy.on_edge_combine(&mut combined, edge);
                combined.preserve = existing.preserve || edge.preserve;
                combined.false_edge = existing.false_edge && edge.false_edge;
                overwritten.push(existing);
                graph.put_edge(combined);
            }
            None => {
                let moved = edge.repointed(remove, keep);
                created.push(moved.key());
                graph.put_edge(moved);
            }
        }
    }

    let mut survivor = kept_before.clone();
    survivor.size = survivor.size.saturating_add(removed.size);
    survivor.boundary |= removed.boundary;
    strategy.on_node_combine(&mut survivor, &removed);
    graph.put_node(survivor);

    debug!(
        remove = remove.0,
        keep = keep.0,
        moved = created.len(),
        combined = overwritten.len(),
        "merged nodes"
    );

    Ok(MergeRecord {
        removed,
        kept_before,
        removed_edges,
        overwritten,
        created,
    })
}

/// Reverse a merge produced by [`merge`].
///
/// The graph must be in the state the merge left it in (any later merges
/// already reversed); otherwise `GraphError::Corrupted` is returned.
pub fn unmerge(graph: &mut RegionGraph, record: &MergeRecord) -> Result<(), GraphError> {
    let keep = record.kept();
    if !graph.contains_node(keep) {
        return Err(GraphError::NodeNotFound(keep));
    }
    if graph.contains_node(record.removed.id) {
        return Err(GraphError::Corrupted(format!(
            "node {} is live but should have been merged into {keep}",
            record.removed.id
        )));
    }

    for &(a, b) in &record.created {
        graph.remove_edge(a, b)?;
    }
    for edge in &record.overwritten {
        graph.put_edge(edge.clone());
    }
    graph.put_node(record.kept_before.clone());
    graph.put_node(record.removed.clone());
    for edge in &record.removed_edges {
        for id in [edge.a, edge.b] {
            if !graph.contains_node(id) {
                return Err(GraphError::Corrupted(format!(
                    "cannot restore edge {} -- {}: node {id} is gone",
                    edge.a, edge.b
                )));
            }
        }
        graph.put_edge(edge.clone());
    }

    debug!(restored = record.removed.id.0, keep = keep.0, "unmerged nodes");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
