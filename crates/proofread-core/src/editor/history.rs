//! Undo history of the edge editor.

use crate::contraction::{MergeRecord, unmerge};
use crate::{GraphError, NodeId, RegionGraph};

/// One reversible scheduler decision.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    /// An edge was marked resolved; holds its previous values.
    ValueChange {
        edge: (NodeId, NodeId),
        weight: f64,
        preserve: bool,
        false_edge: bool,
    },
    /// Two nodes were merged.
    StructuralMerge(MergeRecord),
}

impl HistoryEntry {
    /// Snapshot an edge before its weight is overwritten.
    pub(crate) fn value_change(graph: &RegionGraph, a: NodeId, b: NodeId) -> Result<Self, GraphError> {
        let edge = graph.edge(a, b).ok_or(GraphError::EdgeNotFound(a, b))?;
        Ok(Self::ValueChange {
            edge: edge.key(),
            weight: edge.weight,
            preserve: edge.preserve,
            false_edge: edge.false_edge,
        })
    }

    /// Put the graph back to its state before this entry was recorded.
    pub(crate) fn revert(&self, graph: &mut RegionGraph) -> Result<(), GraphError> {
        match self {
            Self::ValueChange {
                edge: (a, b),
                weight,
                preserve,
                false_edge,
            } => {
                let edge = graph
                    .edge_mut(*a, *b)
                    .ok_or(GraphError::EdgeNotFound(*a, *b))?;
                edge.weight = *weight;
                edge.preserve = *preserve;
                edge.false_edge = *false_edge;
                Ok(())
            }
            Self::StructuralMerge(record) => unmerge(graph, record),
        }
    }
}
