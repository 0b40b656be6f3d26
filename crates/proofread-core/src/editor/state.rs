//! Scheduler state document: the resumable session state of an
//! [`EdgeEditor`], kept separate from the graph itself.

use super::{EdgeEditor, EdgeRange, ProcessedCounts, ReviewMode, entropy_delta};
use crate::primitives::{
    DEFAULT_BODY_IGNORE, DEFAULT_EDGE_IGNORE, DEFAULT_NUM_SLICES, DEFAULT_SYNAPSE_IGNORE,
    PRUNE_EDGE_SIZE, PRUNED_EDGE_WEIGHT,
};
use crate::{EditorConfig, GraphError, NodeId, RegionGraph, SchedulerError};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Serialized scheduler state. Every field is optional on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerState {
    pub num_processed: u32,
    pub num_body_processed: u32,
    pub num_syn_processed: u32,
    pub num_orphan_processed: u32,
    pub num_edge_processed: u32,
    pub num_est_remaining: u32,
    pub num_slices: u32,
    pub current_depth: u32,
    /// `[min, max]` weight window for edge mode.
    pub range: [f64; 2],
    pub prune_small_edges: bool,
    /// Ignore size as the user specified it; mode default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_size: Option<f64>,
    pub synapse_mode: bool,
    pub orphan_mode: bool,
    pub prob_mode: bool,
    pub orphan_bodies: Vec<NodeId>,
    pub synapse_bodies: Vec<(NodeId, u64)>,
    pub already_analyzed: Vec<NodeId>,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            num_processed: 0,
            num_body_processed: 0,
            num_syn_processed: 0,
            num_orphan_processed: 0,
            num_edge_processed: 0,
            num_est_remaining: 0,
            num_slices: DEFAULT_NUM_SLICES,
            current_depth: 0,
            range: [0.0, 1.0],
            prune_small_edges: false,
            ignore_size: None,
            synapse_mode: false,
            orphan_mode: false,
            prob_mode: false,
            orphan_bodies: Vec::new(),
            synapse_bodies: Vec::new(),
            already_analyzed: Vec::new(),
        }
    }
}

impl SchedulerState {
    /// Mode encoded by the flags. Edge mode wins over synapse mode, which
    /// wins over orphan mode; no flag means body mode.
    #[must_use]
    pub fn mode(&self) -> ReviewMode {
        if self.prob_mode {
            ReviewMode::Edge
        } else if self.synapse_mode {
            ReviewMode::Synapse
        } else if self.orphan_mode {
            ReviewMode::Orphan
        } else {
            ReviewMode::Body
        }
    }

    fn processed(&self) -> ProcessedCounts {
        ProcessedCounts {
            total: self.num_processed,
            body: self.num_body_processed,
            synapse: self.num_syn_processed,
            orphan: self.num_orphan_processed,
            edge: self.num_edge_processed,
        }
    }
}

const fn default_ignore(mode: ReviewMode) -> f64 {
    match mode {
        ReviewMode::Synapse => DEFAULT_SYNAPSE_IGNORE,
        ReviewMode::Edge => DEFAULT_EDGE_IGNORE,
        ReviewMode::Body | ReviewMode::Orphan => DEFAULT_BODY_IGNORE,
    }
}

impl EdgeEditor {
    /// Resume a session from a state document.
    ///
    /// Node ids listed in the document must exist in `graph`. The document's
    /// slice count overrides `config.num_slices`.
    pub fn from_state(
        graph: RegionGraph,
        state: &SchedulerState,
        config: EditorConfig,
    ) -> Result<Self, SchedulerError> {
        let config = EditorConfig {
            num_slices: state.num_slices,
            ..config
        };
        let mode = state.mode();
        let mut editor = Self::new(graph, config);
        editor.reinitialize(mode);

        editor.ignore_size_orig = state.ignore_size.unwrap_or(default_ignore(mode));
        editor.processed = state.processed();
        editor.estimated_remaining = (state.num_est_remaining > 0).then_some(state.num_est_remaining);
        editor.current_depth = state.current_depth;
        editor.range = EdgeRange {
            min: state.range[0],
            max: state.range[1],
            start: state.range[0],
        };
        editor.prune_small_edges = state.prune_small_edges;

        for &id in &state.already_analyzed {
            let node = editor
                .graph
                .node_mut(id)
                .ok_or(GraphError::NodeNotFound(id))?;
            node.props.examined = Some(true);
        }
        for &(id, weight) in &state.synapse_bodies {
            let node = editor
                .graph
                .node_mut(id)
                .ok_or(GraphError::NodeNotFound(id))?;
            node.props.synapse_weight = Some(weight);
        }
        for &id in &state.orphan_bodies {
            let node = editor
                .graph
                .node_mut(id)
                .ok_or(GraphError::NodeNotFound(id))?;
            node.props.orphan = Some(true);
        }

        match mode {
            ReviewMode::Edge => {
                if state.prune_small_edges {
                    let mut pruned = 0usize;
                    for edge in editor.graph.edges_mut() {
                        if edge.props.edge_size.is_some_and(|s| s <= PRUNE_EDGE_SIZE) {
                            edge.weight = PRUNED_EDGE_WEIGHT;
                            pruned += 1;
                        }
                    }
                    info!(pruned, "pruned small edges");
                }
                editor.ignore_size = editor.ignore_size_orig;
            }
            ReviewMode::Body => {
                editor.volume_size = editor.graph.total_size();
                editor.build_queue(true);
                editor.ignore_size = entropy_delta(
                    editor.config.approx_neurite_size() as f64,
                    editor.ignore_size_orig,
                    editor.volume_size as f64,
                );
            }
            ReviewMode::Synapse => {
                editor.volume_size = editor
                    .graph
                    .nodes()
                    .fold(0u64, |acc, n| acc.saturating_add(n.props.synapse_weight()));
                editor.build_queue(true);
                editor.ignore_size = entropy_delta(
                    editor.ignore_size_orig,
                    editor.ignore_size_orig,
                    editor.volume_size as f64,
                );
            }
            ReviewMode::Orphan => {
                editor.build_queue(true);
                editor.ignore_size = 0.0;
            }
        }

        editor.announce();
        editor.update_priority();
        Ok(editor)
    }

    /// Snapshot the session state. Lists are in ascending node id order.
    #[must_use]
    pub fn export_state(&self) -> SchedulerState {
        let mode = self.mode.unwrap_or(ReviewMode::Body);
        SchedulerState {
            num_processed: self.processed.total,
            num_body_processed: self.processed.body,
            num_syn_processed: self.processed.synapse,
            num_orphan_processed: self.processed.orphan,
            num_edge_processed: self.processed.edge,
            num_est_remaining: self.estimated_remaining.unwrap_or(0),
            num_slices: self.config.num_slices,
            current_depth: self.current_depth,
            range: [self.range.min, self.range.max],
            prune_small_edges: self.prune_small_edges,
            ignore_size: Some(self.ignore_size_orig),
            synapse_mode: mode == ReviewMode::Synapse,
            orphan_mode: mode == ReviewMode::Orphan,
            prob_mode: mode == ReviewMode::Edge,
            orphan_bodies: self
                .graph
                .nodes()
                .filter(|n| n.props.is_orphan())
                .map(|n| n.id)
                .collect(),
            synapse_bodies: self
                .graph
                .nodes()
                .filter(|n| n.props.synapse_weight() > 0)
                .map(|n| (n.id, n.props.synapse_weight()))
                .collect(),
            already_analyzed: self
                .graph
                .nodes()
                .filter(|n| n.props.is_examined())
                .map(|n| n.id)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edge, Node, NodePair};

    fn graph() -> RegionGraph {
        let mut graph = RegionGraph::new();
        for (id, size) in [(1, 10), (2, 5_000), (3, 20_000), (4, 8_000)] {
            graph.insert_node(Node::new(NodeId(id), size)).expect("insert");
        }
        for (a, b, w) in [(1, 2, 0.9), (2, 3, 0.1), (3, 4, 0.2)] {
            graph
                .insert_edge(Edge::new(NodeId(a), NodeId(b), w))
                .expect("edge");
        }
        graph
    }

    #[test]
    fn empty_document_means_body_mode_with_defaults() {
        let state: SchedulerState = serde_json::from_str("{}").expect("parse");
        assert_eq!(state.mode(), ReviewMode::Body);
        assert_eq!(state.num_slices, DEFAULT_NUM_SLICES);

        let editor =
            EdgeEditor::from_state(graph(), &state, EditorConfig::default()).expect("import");
        assert_eq!(editor.mode(), Some(ReviewMode::Body));
        assert_eq!(editor.export_state().ignore_size, Some(DEFAULT_BODY_IGNORE));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let state = SchedulerState {
            orphan_bodies: vec![NodeId(99)],
            ..SchedulerState::default()
        };
        let result = EdgeEditor::from_state(graph(), &state, EditorConfig::default());
        assert!(matches!(
            result,
            Err(SchedulerError::Graph(GraphError::NodeNotFound(NodeId(99))))
        ));
    }

    #[test]
    fn analyzed_bodies_are_not_requeued() {
        let state = SchedulerState {
            ignore_size: Some(1000.0),
            already_analyzed: vec![NodeId(3)],
            ..SchedulerState::default()
        };
        let editor =
            EdgeEditor::from_state(graph(), &state, EditorConfig::default()).expect("import");
        let queued: Vec<NodeId> = editor.queued().iter().map(|i| i.id).collect();
        assert!(!queued.contains(&NodeId(3)));
        assert!(editor.export_state().already_analyzed.contains(&NodeId(3)));
    }

    #[test]
    fn prune_applies_only_in_edge_mode() {
        let mut g = graph();
        if let Some(edge) = g.edge_mut(NodeId(3), NodeId(4)) {
            edge.props.edge_size = Some(1);
        }
        let edge_state = SchedulerState {
            prob_mode: true,
            prune_small_edges: true,
            ..SchedulerState::default()
        };
        let editor = EdgeEditor::from_state(g.clone(), &edge_state, EditorConfig::default())
            .expect("import");
        let weight = editor.graph().edge(NodeId(3), NodeId(4)).map(|e| e.weight);
        assert_eq!(weight, Some(PRUNED_EDGE_WEIGHT));

        let body_state = SchedulerState {
            prune_small_edges: true,
            ..SchedulerState::default()
        };
        let editor =
            EdgeEditor::from_state(g, &body_state, EditorConfig::default()).expect("import");
        let weight = editor.graph().edge(NodeId(3), NodeId(4)).map(|e| e.weight);
        assert_eq!(weight, Some(0.2));
    }

    #[test]
    fn export_then_import_resumes_the_same_session() {
        let mut editor = EdgeEditor::new(graph(), EditorConfig::default());
        editor.set_body_mode(1000.0, 0);
        let pair = editor.get_next_edge().expect("staged");
        editor.set_decision(pair, false).expect("decide");

        let state = editor.export_state();
        assert_eq!(state.num_processed, 1);
        assert_eq!(state.num_body_processed, 1);

        let json = serde_json::to_string(&state).expect("encode");
        let decoded: SchedulerState = serde_json::from_str(&json).expect("decode");
        assert_eq!(decoded, state);

        let resumed = EdgeEditor::from_state(
            editor.graph().clone(),
            &decoded,
            EditorConfig::default(),
        )
        .expect("import");
        assert_eq!(resumed.processed(), editor.processed());
        assert_eq!(resumed.queued(), editor.queued());
        assert_eq!(resumed.staged(), editor.staged());
        assert_eq!(resumed.history_len(), 0);
    }

    fn annotated_graph() -> RegionGraph {
        let mut graph = RegionGraph::new();
        let nodes = [
            Node::new(NodeId(1), 10).with_orphan(true).with_synapse_weight(2),
            Node::new(NodeId(2), 5_000).with_synapse_weight(3),
            Node::new(NodeId(3), 20_000).with_synapse_weight(1),
            Node::new(NodeId(4), 8_000).with_orphan(true),
            Node::new(NodeId(5), 300),
        ];
        for node in nodes {
            graph.insert_node(node).expect("insert");
        }
        for (a, b, w) in [(1, 2, 0.4), (2, 3, 0.1), (3, 4, 0.2), (4, 5, 0.3), (1, 5, 0.45)] {
            graph
                .insert_edge(Edge::new(NodeId(a), NodeId(b), w))
                .expect("edge");
        }
        graph
    }

    #[test]
    fn every_mode_resumes_after_a_decision() {
        for mode in [
            ReviewMode::Body,
            ReviewMode::Synapse,
            ReviewMode::Orphan,
            ReviewMode::Edge,
        ] {
            let mut editor = EdgeEditor::new(annotated_graph(), EditorConfig::default());
            match mode {
                ReviewMode::Body => editor.set_body_mode(1000.0, 0),
                ReviewMode::Synapse => editor.set_synapse_mode(0.1),
                ReviewMode::Orphan => editor.set_orphan_mode(1000.0),
                ReviewMode::Edge => editor.set_edge_mode(0.0, 0.5, 0.0),
            }
            if let Ok(pair) = editor.get_next_edge() {
                editor.set_decision(pair, false).expect("decide");
            }

            let json = serde_json::to_string(&editor.export_state()).expect("encode");
            let decoded: SchedulerState = serde_json::from_str(&json).expect("decode");
            assert_eq!(decoded.mode(), mode);

            let resumed = EdgeEditor::from_state(
                editor.graph().clone(),
                &decoded,
                EditorConfig::default(),
            )
            .expect("import");
            assert_eq!(resumed.mode(), Some(mode), "{mode}");
            assert_eq!(resumed.processed(), editor.processed(), "{mode}");
            assert_eq!(resumed.queued(), editor.queued(), "{mode}");
            assert_eq!(resumed.staged(), editor.staged(), "{mode}");
            assert_eq!(resumed.export_state(), editor.export_state(), "{mode}");
        }
    }

    #[test]
    fn synapse_document_sets_weights() {
        let state = SchedulerState {
            synapse_mode: true,
            synapse_bodies: vec![(NodeId(2), 3), (NodeId(3), 4)],
            ..SchedulerState::default()
        };
        let mut editor =
            EdgeEditor::from_state(graph(), &state, EditorConfig::default()).expect("import");
        assert_eq!(editor.mode(), Some(ReviewMode::Synapse));
        assert_eq!(
            editor.get_next_edge(),
            Ok(NodePair(NodeId(3), NodeId(2)))
        );
        assert_eq!(editor.export_state().synapse_bodies, state.synapse_bodies);
    }
}
