//! # Edge Editor
//!
//! The focused-proofreading scheduler.
//!
//! An [`EdgeEditor`] owns one [`RegionGraph`] and repeatedly stages the
//! adjacency whose resolution is expected to reduce segmentation
//! uncertainty the most. The caller answers each staged edge with
//! [`EdgeEditor::set_decision`]; every answer can be reverted with
//! [`EdgeEditor::undo`].
//!
//! ## Review Modes
//!
//! | Mode | Candidates | Neighbor score |
//! |------|------------|----------------|
//! | Body | nodes with size ≥ ignore size, ranked by size | affinity × entropy delta of sizes |
//! | Synapse | nodes with synapses, ranked by synapse weight | affinity × entropy delta of synapse weights |
//! | Orphan | orphans with synapses or size ≥ ignore size | raw affinity to non-orphans |
//! | Edge | raw edges with weight in `[min, max]` | distance from the start weight |
//!
//! The three ranked modes keep a [`RankedEditQueue`] of head nodes. Staging
//! runs an [`AffinitySearch`] from the head, scores every reachable node,
//! and proposes the edge between the head and the first hop toward the best
//! one. Heads that yield nothing above the mode's ignore threshold are
//! popped.

mod history;
mod scoring;
mod state;

pub use history::HistoryEntry;
pub use scoring::entropy_delta;
pub use state::SchedulerState;

use crate::affinity::{AffinityParams, AffinitySearch};
use crate::contraction::{LowestWeightCombine, merge};
use crate::primitives::RESOLVED_WEIGHT;
use crate::queue::{RankedEditQueue, RankedItem};
use crate::{EditorConfig, GraphError, Location, Node, NodeId, NodePair, RegionGraph, SchedulerError};
use scoring::neighbor_score;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

// =============================================================================
// MODES AND COUNTERS
// =============================================================================

/// The active review strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewMode {
    Body,
    Synapse,
    Orphan,
    Edge,
}

impl ReviewMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Synapse => "synapse",
            Self::Orphan => "orphan",
            Self::Edge => "edge",
        }
    }

    /// Whether staging follows a ranked head-node queue.
    #[must_use]
    pub const fn is_ranked(self) -> bool {
        !matches!(self, Self::Edge)
    }
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decisions taken so far, overall and per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessedCounts {
    pub total: u32,
    pub body: u32,
    pub synapse: u32,
    pub orphan: u32,
    pub edge: u32,
}

impl ProcessedCounts {
    fn slot(&mut self, mode: ReviewMode) -> &mut u32 {
        match mode {
            ReviewMode::Body => &mut self.body,
            ReviewMode::Synapse => &mut self.synapse,
            ReviewMode::Orphan => &mut self.orphan,
            ReviewMode::Edge => &mut self.edge,
        }
    }

    fn record(&mut self, mode: ReviewMode) {
        self.total = self.total.saturating_add(1);
        let slot = self.slot(mode);
        *slot = slot.saturating_add(1);
    }

    fn unrecord(&mut self, mode: ReviewMode) {
        self.total = self.total.saturating_sub(1);
        let slot = self.slot(mode);
        *slot = slot.saturating_sub(1);
    }
}

/// Weight window and start point for edge mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeRange {
    pub min: f64,
    pub max: f64,
    pub start: f64,
}

impl Default for EdgeRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            start: 0.0,
        }
    }
}

// =============================================================================
// EDGE EDITOR
// =============================================================================

/// Priority scheduler over a region graph it exclusively owns.
#[derive(Debug, Clone)]
pub struct EdgeEditor {
    graph: RegionGraph,
    config: EditorConfig,
    mode: Option<ReviewMode>,
    queue: Option<RankedEditQueue>,
    edge_ranking: Vec<NodePair>,
    staged: Option<NodePair>,
    history: Vec<HistoryEntry>,
    processed: ProcessedCounts,
    estimated_remaining: Option<u32>,
    /// Staging threshold in the active mode's score units.
    ignore_size: f64,
    /// Ignore size as passed to the mode setter.
    ignore_size_orig: f64,
    volume_size: u64,
    current_depth: u32,
    range: EdgeRange,
    prune_small_edges: bool,
}

impl EdgeEditor {
    /// Wrap a graph. No mode is active until one of the mode setters runs.
    #[must_use]
    pub fn new(graph: RegionGraph, config: EditorConfig) -> Self {
        Self {
            graph,
            config,
            mode: None,
            queue: None,
            edge_ranking: Vec::new(),
            staged: None,
            history: Vec::new(),
            processed: ProcessedCounts::default(),
            estimated_remaining: None,
            ignore_size: 0.0,
            ignore_size_orig: 0.0,
            volume_size: 0,
            current_depth: 0,
            range: EdgeRange::default(),
            prune_small_edges: false,
        }
    }

    // -------------------------------------------------------------------------
    // Mode setters
    // -------------------------------------------------------------------------

    /// Review the largest bodies first.
    ///
    /// `depth` bounds the affinity search in hops; `0` is unbounded.
    pub fn set_body_mode(&mut self, ignore_size: f64, depth: u32) {
        self.reinitialize(ReviewMode::Body);
        self.ignore_size_orig = ignore_size;
        self.current_depth = depth;
        self.volume_size = self.graph.total_size();
        self.build_queue(false);
        self.ignore_size = entropy_delta(
            self.config.approx_neurite_size() as f64,
            ignore_size,
            self.volume_size as f64,
        );
        self.announce();
        self.update_priority();
    }

    /// Review bodies carrying synapses, heaviest first.
    pub fn set_synapse_mode(&mut self, ignore_size: f64) {
        self.reinitialize(ReviewMode::Synapse);
        self.ignore_size_orig = ignore_size;
        self.current_depth = 0;
        self.volume_size = self
            .graph
            .nodes()
            .fold(0u64, |acc, n| acc.saturating_add(n.props.synapse_weight()));
        self.build_queue(false);
        self.ignore_size = entropy_delta(ignore_size, ignore_size, self.volume_size as f64);
        self.announce();
        self.update_priority();
    }

    /// Attach orphans (bodies not reaching the volume boundary) to anchored
    /// bodies. Preserve flags are ignored in this mode.
    pub fn set_orphan_mode(&mut self, ignore_size: f64) {
        self.reinitialize(ReviewMode::Orphan);
        self.ignore_size_orig = ignore_size;
        self.current_depth = 0;
        self.build_queue(false);
        self.ignore_size = 0.0;
        self.announce();
        self.update_priority();
    }

    /// Walk raw edges with weights in `[lower, upper]`, closest to `start`
    /// first.
    pub fn set_edge_mode(&mut self, lower: f64, upper: f64, start: f64) {
        self.reinitialize(ReviewMode::Edge);
        self.range = EdgeRange {
            min: lower,
            max: upper,
            start,
        };
        self.current_depth = 0;
        self.ignore_size = 1.0;
        self.ignore_size_orig = 1.0;
        self.announce();
        self.update_priority();
    }

    /// Reset everything a mode switch discards.
    fn reinitialize(&mut self, mode: ReviewMode) {
        for node in self.graph.nodes_mut() {
            node.props.examined = None;
        }
        self.mode = Some(mode);
        self.queue = None;
        self.edge_ranking.clear();
        self.staged = None;
        self.history.clear();
        self.estimated_remaining = None;
        self.volume_size = 0;
    }

    fn announce(&self) {
        info!(
            mode = self.mode.map_or("none", ReviewMode::as_str),
            ignore_size = self.ignore_size_orig,
            threshold = self.ignore_size,
            depth = self.current_depth,
            queued = self.queue_len(),
            "review mode set"
        );
    }

    /// Fill a fresh ranked queue with every eligible node.
    fn build_queue(&mut self, skip_examined: bool) {
        let Some(mode) = self.mode else {
            return;
        };
        let orig = self.ignore_size_orig;
        let items: Vec<RankedItem> = self
            .graph
            .nodes()
            .filter(|n| !(skip_examined && n.props.is_examined()))
            .filter_map(|n| queue_rank(mode, n, orig).map(|rank| RankedItem::new(n.id, rank)))
            .collect();
        let mut queue = RankedEditQueue::new();
        for item in items {
            queue.insert(&mut self.graph, item);
        }
        self.queue = Some(queue);
    }

    fn search_params(&self) -> AffinityParams {
        AffinityParams {
            max_hops: self.current_depth,
            connection_threshold: self.config.connection_threshold,
            preserve_aware: self.mode != Some(ReviewMode::Orphan),
        }
    }

    // -------------------------------------------------------------------------
    // Staging
    // -------------------------------------------------------------------------

    /// Recompute the staged edge.
    fn update_priority(&mut self) {
        self.staged = None;
        match self.mode {
            None => {}
            Some(ReviewMode::Edge) => {
                self.edge_ranking = edge_ranking(&self.graph, self.range, self.ignore_size);
                self.staged = self.edge_ranking.first().copied();
            }
            Some(mode) => {
                let params = self.search_params();
                let volume = self.volume_size as f64;
                let Some(queue) = self.queue.as_mut() else {
                    return;
                };
                while let Some(head) = queue.first() {
                    if let Some(pair) = best_partner(
                        &self.graph,
                        mode,
                        head.id,
                        &params,
                        volume,
                        self.ignore_size,
                        self.config.min_body_neighbor_size,
                    ) {
                        self.staged = Some(pair);
                        break;
                    }
                    queue.pop_first(&mut self.graph);
                }
            }
        }
        if let Some(pair) = self.staged {
            debug!(first = pair.0.0, second = pair.1.0, "staged edge");
        }
    }

    /// The staged edge, larger body first.
    ///
    /// Returns `SchedulerError::Empty` once the session is finished.
    pub fn get_next_edge(&mut self) -> Result<NodePair, SchedulerError> {
        if self.mode.is_none() {
            return Err(SchedulerError::NotInitialized);
        }
        if self.staged.is_none() {
            self.update_priority();
        }
        self.staged.ok_or(SchedulerError::Empty)
    }

    /// Contact location of the staged edge, when known.
    #[must_use]
    pub fn staged_location(&self) -> Option<Location> {
        let pair = self.staged?;
        self.graph.edge(pair.0, pair.1)?.props.location
    }

    // -------------------------------------------------------------------------
    // Decisions
    // -------------------------------------------------------------------------

    /// Apply a decision to the staged edge.
    ///
    /// With `accept`, `pair.1` is merged into `pair.0`; otherwise the edge is
    /// marked resolved and never proposed again. Either way the next edge is
    /// staged before returning.
    pub fn set_decision(&mut self, pair: NodePair, accept: bool) -> Result<(), SchedulerError> {
        let mode = self.mode.ok_or(SchedulerError::NotInitialized)?;
        let staged = self.staged.ok_or(SchedulerError::Empty)?;
        if !pair.same_edge(staged) {
            return Err(SchedulerError::NotStaged(pair.0, pair.1));
        }
        if !self.graph.contains_edge(pair.0, pair.1) {
            return Err(GraphError::EdgeNotFound(pair.0, pair.1).into());
        }

        debug!(mode = mode.as_str(), %pair, accept, "decision");

        if accept {
            if mode.is_ranked() {
                self.merge_ranked(mode, pair)?;
            } else {
                let record = merge(&mut self.graph, pair.1, pair.0, &mut LowestWeightCombine)?;
                self.history.push(HistoryEntry::StructuralMerge(record));
                self.update_priority();
            }
        } else {
            self.history
                .push(HistoryEntry::value_change(&self.graph, pair.0, pair.1)?);
            if let Some(edge) = self.graph.edge_mut(pair.0, pair.1) {
                edge.weight = RESOLVED_WEIGHT;
            }
            if let Some(queue) = self.queue.as_mut() {
                queue.start_checkpoint();
            }
            self.update_priority();
            if let Some(queue) = self.queue.as_mut() {
                queue.stop_checkpoint();
            }
        }

        self.processed.record(mode);
        if let Some(remaining) = self.estimated_remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        Ok(())
    }

    /// Merge inside a ranked mode and requeue everything the merge touched,
    /// all inside one queue checkpoint.
    fn merge_ranked(&mut self, mode: ReviewMode, pair: NodePair) -> Result<(), SchedulerError> {
        let params = self.search_params();
        let orig = self.ignore_size_orig;
        let Some(queue) = self.queue.as_mut() else {
            return Err(SchedulerError::NotInitialized);
        };
        queue.start_checkpoint();

        let head = queue.first().map_or(pair.0, |item| item.id);
        let other = if head == pair.0 { pair.1 } else { pair.0 };
        let both_orphans = [head, other]
            .iter()
            .all(|&id| self.graph.node(id).is_some_and(|n| n.props.is_orphan()));

        queue.remove_id(&mut self.graph, other);
        queue.remove_id(&mut self.graph, head);

        let survivor = pair.0;
        let record = match merge(&mut self.graph, pair.1, survivor, &mut LowestWeightCombine) {
            Ok(record) => record,
            Err(e) => {
                queue.stop_checkpoint();
                queue.undo_one(&mut self.graph);
                return Err(e.into());
            }
        };
        self.history.push(HistoryEntry::StructuralMerge(record));

        let survivor_rank = self.graph.node(survivor).and_then(|node| match mode {
            ReviewMode::Body => Some(node.size),
            ReviewMode::Synapse => Some(node.props.synapse_weight()).filter(|&w| w > 0),
            ReviewMode::Orphan => both_orphans.then_some(node.size),
            ReviewMode::Edge => None,
        });
        if let Some(rank) = survivor_rank {
            queue.insert(&mut self.graph, RankedItem::new(survivor, rank));
        }

        match AffinitySearch::search(&self.graph, survivor, &params) {
            Ok(found) => {
                for &target in found.keys() {
                    queue.remove_id(&mut self.graph, target);
                    let rank = self
                        .graph
                        .node(target)
                        .and_then(|n| queue_rank(mode, n, orig));
                    if let Some(rank) = rank {
                        queue.insert(&mut self.graph, RankedItem::new(target, rank));
                    }
                }
            }
            Err(e) => warn!(error = %e, "affinity search from merged body failed"),
        }

        self.update_priority();
        if let Some(queue) = self.queue.as_mut() {
            queue.stop_checkpoint();
        }
        Ok(())
    }

    /// Revert the most recent decision.
    ///
    /// Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, SchedulerError> {
        let Some(entry) = self.history.pop() else {
            return Ok(false);
        };
        entry.revert(&mut self.graph)?;
        if let Some(mode) = self.mode {
            self.processed.unrecord(mode);
        }
        self.estimated_remaining = Some(self.estimated_remaining.unwrap_or(0).saturating_add(1));
        if let Some(queue) = self.queue.as_mut() {
            queue.undo_one(&mut self.graph);
        }
        debug!(history = self.history.len(), "undo");
        self.update_priority();
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Derived queries
    // -------------------------------------------------------------------------

    /// Remaining work: the stored estimate when positive, otherwise the
    /// number of queued heads (ranked modes) or candidate edges (edge mode).
    #[must_use]
    pub fn get_num_remaining(&self) -> usize {
        if self.is_finished() {
            return 0;
        }
        if let Some(estimate) = self.estimated_remaining.filter(|&n| n > 0) {
            return estimate as usize;
        }
        match self.mode {
            Some(ReviewMode::Edge) => self.edge_ranking.len(),
            _ => self.queue_len(),
        }
    }

    /// Simulate the rest of the session with `oracle` answering each staged
    /// edge, then undo the whole simulation.
    ///
    /// Returns the number of decisions the simulation took and stores it as
    /// the work estimate. Graph, queue, history and counters are left
    /// exactly as they were.
    pub fn estimate_work<F>(&mut self, mut oracle: F) -> Result<u32, SchedulerError>
    where
        F: FnMut(&RegionGraph, NodePair) -> bool,
    {
        let saved = self.processed;
        let saved_estimate = self.estimated_remaining;
        self.estimated_remaining = None;

        let mut examined = 0u32;
        while let Some(pair) = self.staged {
            let accept = oracle(&self.graph, pair);
            if let Err(e) = self.set_decision(pair, accept) {
                warn!(error = %e, examined, "simulation aborted, unwinding");
                for _ in 0..examined {
                    self.undo()?;
                }
                self.processed = saved;
                self.estimated_remaining = saved_estimate;
                return Err(e);
            }
            examined += 1;
        }
        for _ in 0..examined {
            self.undo()?;
        }

        self.processed = saved;
        self.estimated_remaining = Some(examined);
        info!(estimate = examined, "work estimated");
        Ok(examined)
    }

    /// Orphans that should have been attached: orphan bodies that carry
    /// synapses or reach `threshold` voxels. Ascending id order.
    #[must_use]
    pub fn get_qa_violators(&self, threshold: u64) -> Vec<NodeId> {
        self.graph
            .nodes()
            .filter(|n| n.props.is_orphan())
            .filter(|n| n.props.synapse_weight() > 0 || n.size >= threshold)
            .map(|n| n.id)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn graph(&self) -> &RegionGraph {
        &self.graph
    }

    /// Give the graph back, ending the session.
    #[must_use]
    pub fn into_graph(self) -> RegionGraph {
        self.graph
    }

    #[must_use]
    pub fn mode(&self) -> Option<ReviewMode> {
        self.mode
    }

    #[must_use]
    pub fn processed(&self) -> ProcessedCounts {
        self.processed
    }

    #[must_use]
    pub fn staged(&self) -> Option<NodePair> {
        self.staged
    }

    /// Nothing is staged and nothing remains to stage.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.staged.is_none()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn estimated_remaining(&self) -> Option<u32> {
        self.estimated_remaining
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.as_ref().map_or(0, RankedEditQueue::len)
    }

    /// Queued heads in rank order. Empty in edge mode.
    #[must_use]
    pub fn queued(&self) -> Vec<RankedItem> {
        self.queue
            .as_ref()
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Rank a node would be queued with in `mode`, or `None` if ineligible.
fn queue_rank(mode: ReviewMode, node: &Node, ignore_size: f64) -> Option<u64> {
    let big_enough = node.size as f64 >= ignore_size;
    let synapses = node.props.synapse_weight();
    match mode {
        ReviewMode::Body => big_enough.then_some(node.size),
        ReviewMode::Synapse => (synapses > 0).then_some(synapses),
        ReviewMode::Orphan => {
            (node.props.is_orphan() && (big_enough || synapses > 0)).then_some(node.size)
        }
        ReviewMode::Edge => None,
    }
}

/// Order an edge's endpoints larger body first; equal sizes put the smaller
/// id first.
fn orient(graph: &RegionGraph, a: NodeId, b: NodeId) -> NodePair {
    let size = |id: NodeId| graph.node(id).map_or(0, |n| n.size);
    let (sa, sb) = (size(a), size(b));
    if sa > sb || (sa == sb && a < b) {
        NodePair(a, b)
    } else {
        NodePair(b, a)
    }
}

/// Best-scoring partner of `head`, if it clears the ignore threshold.
fn best_partner(
    graph: &RegionGraph,
    mode: ReviewMode,
    head: NodeId,
    params: &AffinityParams,
    volume: f64,
    ignore: f64,
    min_body_neighbor_size: u64,
) -> Option<NodePair> {
    let head_node = graph.node(head)?;
    let found = match AffinitySearch::search(graph, head, params) {
        Ok(found) => found,
        Err(e) => {
            warn!(head = head.0, error = %e, "queued head missing from graph");
            return None;
        }
    };

    let mut best: Option<(f64, NodeId)> = None;
    for pair in found.values() {
        let Some(other) = graph.node(pair.target) else {
            continue;
        };
        let Some(score) = neighbor_score(
            mode,
            head_node,
            other,
            pair.affinity,
            volume,
            min_body_neighbor_size,
        ) else {
            continue;
        };
        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, pair.via));
        }
    }

    let (score, via) = best?;
    (score >= ignore).then(|| orient(graph, head, via))
}

/// Candidate edges for edge mode, closest to `range.start` first.
fn edge_ranking(graph: &RegionGraph, range: EdgeRange, ignore: f64) -> Vec<NodePair> {
    let size = |id: NodeId| graph.node(id).map_or(0, |n| n.size) as f64;
    let mut ranked: Vec<(f64, (NodeId, NodeId))> = graph
        .edges()
        .filter(|e| !e.is_resolved())
        .filter(|e| e.weight >= range.min && e.weight <= range.max)
        .filter(|e| size(e.a) > ignore && size(e.b) > ignore)
        .map(|e| ((e.weight - range.start).abs(), e.key()))
        .collect();
    ranked.sort_by(|x, y| x.0.total_cmp(&y.0).then_with(|| x.1.cmp(&y.1)));
    ranked
        .into_iter()
        .map(|(_, (a, b))| orient(graph, a, b))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Edge;

    fn build(nodes: &[(u64, u64)], edges: &[(u64, u64, f64)]) -> RegionGraph {
        let mut graph = RegionGraph::new();
        for &(id, size) in nodes {
            graph.insert_node(Node::new(NodeId(id), size)).expect("insert");
        }
        for &(a, b, w) in edges {
            graph
                .insert_edge(Edge::new(NodeId(a), NodeId(b), w))
                .expect("edge");
        }
        graph
    }

    fn scenario_a() -> EdgeEditor {
        let graph = build(
            &[(1, 10), (2, 5000), (3, 20000)],
            &[(1, 2, 0.9), (2, 3, 0.1)],
        );
        EdgeEditor::new(graph, EditorConfig::default())
    }

    #[test]
    fn no_mode_means_not_initialized() {
        let mut editor = scenario_a();
        assert_eq!(editor.get_next_edge(), Err(SchedulerError::NotInitialized));
        assert!(editor.is_finished());
        assert_eq!(editor.get_num_remaining(), 0);
    }

    #[test]
    fn body_mode_stages_largest_pair() {
        let mut editor = scenario_a();
        editor.set_body_mode(1000.0, 0);
        assert_eq!(editor.queue_len(), 2);
        assert_eq!(editor.get_next_edge(), Ok(NodePair(NodeId(3), NodeId(2))));
    }

    #[test]
    fn rejecting_resolves_the_edge() {
        let mut editor = scenario_a();
        editor.set_body_mode(1000.0, 0);
        let pair = editor.get_next_edge().expect("staged");
        editor.set_decision(pair, false).expect("decide");

        let edge = editor.graph().edge(NodeId(2), NodeId(3)).expect("edge");
        assert_eq!(edge.weight, RESOLVED_WEIGHT);
        assert!(editor.is_finished());
        assert_eq!(editor.get_next_edge(), Err(SchedulerError::Empty));
        assert_eq!(editor.processed().body, 1);
    }

    #[test]
    fn decision_on_unstaged_pair_is_rejected() {
        let mut editor = scenario_a();
        editor.set_body_mode(1000.0, 0);
        let result = editor.set_decision(NodePair(NodeId(1), NodeId(2)), true);
        assert_eq!(result, Err(SchedulerError::NotStaged(NodeId(1), NodeId(2))));
        assert_eq!(editor.processed().total, 0);
        assert_eq!(editor.history_len(), 0);
    }

    #[test]
    fn swapped_pair_is_accepted() {
        let mut editor = scenario_a();
        editor.set_body_mode(1000.0, 0);
        editor
            .set_decision(NodePair(NodeId(2), NodeId(3)), false)
            .expect("decide");
        assert_eq!(editor.history_len(), 1);
    }

    #[test]
    fn merge_then_undo_restores_everything() {
        let mut editor = scenario_a();
        editor.set_body_mode(1000.0, 0);
        let graph_before = editor.graph().clone();
        let queue_before = editor.queued();
        let pair = editor.get_next_edge().expect("staged");

        editor.set_decision(pair, true).expect("merge");
        assert!(!editor.graph().contains_node(NodeId(2)));
        assert_eq!(editor.graph().node(NodeId(3)).map(|n| n.size), Some(25000));

        assert_eq!(editor.undo(), Ok(true));
        assert_eq!(editor.graph(), &graph_before);
        assert_eq!(editor.queued(), queue_before);
        assert_eq!(editor.staged(), Some(pair));
        assert_eq!(editor.processed(), ProcessedCounts::default());
        assert_eq!(editor.undo(), Ok(false));
    }

    #[test]
    fn edge_mode_respects_window() {
        let graph = build(
            &[(1, 10), (2, 10), (3, 10)],
            &[(1, 2, 0.3), (2, 3, 0.7)],
        );
        let mut editor = EdgeEditor::new(graph, EditorConfig::default());
        editor.set_edge_mode(0.0, 0.5, 0.0);
        assert_eq!(editor.get_num_remaining(), 1);
        let pair = editor.get_next_edge().expect("staged");
        assert!(pair.same_edge(NodePair(NodeId(1), NodeId(2))));
        editor.set_decision(pair, false).expect("decide");
        assert_eq!(editor.get_next_edge(), Err(SchedulerError::Empty));
    }

    #[test]
    fn edge_mode_orders_by_distance_from_start() {
        let graph = build(
            &[(1, 10), (2, 10), (3, 10), (4, 10)],
            &[(1, 2, 0.2), (2, 3, 0.5), (3, 4, 0.45)],
        );
        let mut editor = EdgeEditor::new(graph, EditorConfig::default());
        editor.set_edge_mode(0.0, 1.0, 0.5);
        let pair = editor.get_next_edge().expect("staged");
        assert!(pair.same_edge(NodePair(NodeId(2), NodeId(3))));
    }

    #[test]
    fn synapse_mode_merges_synapse_bodies() {
        let mut graph = RegionGraph::new();
        graph
            .insert_node(Node::new(NodeId(1), 100).with_synapse_weight(5))
            .expect("insert");
        graph
            .insert_node(Node::new(NodeId(2), 50).with_synapse_weight(3))
            .expect("insert");
        graph.insert_node(Node::new(NodeId(3), 70)).expect("insert");
        graph
            .insert_edge(Edge::new(NodeId(1), NodeId(2), 0.2))
            .expect("edge");
        graph
            .insert_edge(Edge::new(NodeId(1), NodeId(3), 0.1))
            .expect("edge");

        let mut editor = EdgeEditor::new(graph, EditorConfig::default());
        editor.set_synapse_mode(0.1);
        let pair = editor.get_next_edge().expect("staged");
        assert_eq!(pair, NodePair(NodeId(1), NodeId(2)));

        editor.set_decision(pair, true).expect("merge");
        let survivor = editor.graph().node(NodeId(1)).expect("survivor");
        assert_eq!(survivor.props.synapse_weight, Some(8));
        assert_eq!(editor.processed().synapse, 1);
    }

    #[test]
    fn orphan_mode_ignores_preserve_and_attaches() {
        let mut graph = RegionGraph::new();
        graph
            .insert_node(Node::new(NodeId(1), 30_000).with_orphan(true))
            .expect("insert");
        graph.insert_node(Node::new(NodeId(2), 500)).expect("insert");
        graph
            .insert_edge(Edge::new(NodeId(1), NodeId(2), 0.4).with_preserve(true))
            .expect("edge");

        let mut editor = EdgeEditor::new(graph, EditorConfig::default());
        editor.set_orphan_mode(25_000.0);
        let pair = editor.get_next_edge().expect("staged");
        assert_eq!(pair, NodePair(NodeId(1), NodeId(2)));

        editor.set_decision(pair, true).expect("merge");
        let survivor = editor.graph().node(NodeId(1)).expect("survivor");
        assert_eq!(survivor.props.orphan, Some(false));
        assert!(editor.is_finished());
        assert!(editor.get_qa_violators(25_000).is_empty());
    }

    #[test]
    fn mode_switch_clears_history_and_examined() {
        let mut editor = scenario_a();
        editor.set_body_mode(1000.0, 0);
        let pair = editor.get_next_edge().expect("staged");
        editor.set_decision(pair, false).expect("decide");
        assert_eq!(editor.history_len(), 1);

        editor.set_edge_mode(0.0, 1.0, 0.0);
        assert_eq!(editor.history_len(), 0);
        assert!(
            editor
                .graph()
                .nodes()
                .all(|n| n.props.examined.is_none())
        );
        assert_eq!(editor.undo(), Ok(false));
    }

    #[test]
    fn num_remaining_tracks_undo_in_edge_mode() {
        let graph = build(
            &[(1, 10), (2, 10), (3, 10)],
            &[(1, 2, 0.3), (2, 3, 0.7)],
        );
        let mut editor = EdgeEditor::new(graph, EditorConfig::default());
        editor.set_edge_mode(0.0, 0.5, 0.0);
        let pair = editor.get_next_edge().expect("staged");
        editor.set_decision(pair, true).expect("merge");
        let after = editor.get_num_remaining();
        assert_eq!(after, 0);
        editor.undo().expect("undo");
        assert_eq!(editor.get_num_remaining(), after + 1);
        assert_eq!(editor.estimated_remaining(), Some(1));
    }

    #[test]
    fn undo_without_estimate_counts_one_more() {
        let mut editor = scenario_a();
        editor.set_body_mode(1000.0, 0);
        assert_eq!(editor.estimated_remaining(), None);
        let pair = editor.get_next_edge().expect("staged");
        editor.set_decision(pair, true).expect("merge");
        let first = editor.get_num_remaining();
        assert_eq!(first, 0);
        editor.undo().expect("undo");
        assert_eq!(editor.get_num_remaining(), first + 1);
        assert_eq!(editor.queue_len(), 2);
    }

    #[test]
    fn failed_simulation_restores_estimate_and_counters() {
        let mut editor = scenario_a();
        editor.set_body_mode(1000.0, 0);
        editor.estimated_remaining = Some(7);
        editor.staged = Some(NodePair(NodeId(1), NodeId(3)));
        let graph_before = editor.graph().clone();

        let result = editor.estimate_work(|_, _| true);
        assert_eq!(
            result,
            Err(SchedulerError::Graph(GraphError::EdgeNotFound(NodeId(1), NodeId(3))))
        );
        assert_eq!(editor.estimated_remaining(), Some(7));
        assert_eq!(editor.processed(), ProcessedCounts::default());
        assert_eq!(editor.history_len(), 0);
        assert_eq!(editor.graph(), &graph_before);
    }

    #[test]
    fn failed_decision_leaves_counters_untouched() {
        let mut editor = scenario_a();
        editor.set_body_mode(1000.0, 0);
        editor.estimate_work(|_, _| false).expect("estimate");
        let estimate = editor.estimated_remaining();

        let wrong = NodePair(NodeId(1), NodeId(2));
        assert_eq!(
            editor.set_decision(wrong, true),
            Err(SchedulerError::NotStaged(NodeId(1), NodeId(2)))
        );
        assert_eq!(editor.processed(), ProcessedCounts::default());
        assert_eq!(editor.estimated_remaining(), estimate);
        assert_eq!(editor.history_len(), 0);
    }

    #[test]
    fn qa_violators_reports_big_or_synaptic_orphans() {
        let mut graph = RegionGraph::new();
        graph
            .insert_node(Node::new(NodeId(1), 10).with_orphan(true).with_synapse_weight(1))
            .expect("insert");
        graph
            .insert_node(Node::new(NodeId(2), 10).with_orphan(true))
            .expect("insert");
        graph
            .insert_node(Node::new(NodeId(3), 900).with_orphan(true))
            .expect("insert");
        graph.insert_node(Node::new(NodeId(4), 900)).expect("insert");
        let editor = EdgeEditor::new(graph, EditorConfig::default());
        assert_eq!(editor.get_qa_violators(500), vec![NodeId(1), NodeId(3)]);
    }

    #[test]
    fn staged_location_comes_from_edge() {
        let mut graph = build(&[(1, 10), (2, 10)], &[]);
        graph
            .insert_edge(
                Edge::new(NodeId(1), NodeId(2), 0.2).with_location(Location::new(4, 5, 6)),
            )
            .expect("edge");
        let mut editor = EdgeEditor::new(graph, EditorConfig::default());
        editor.set_edge_mode(0.0, 1.0, 0.0);
        assert_eq!(editor.staged_location(), Some(Location::new(4, 5, 6)));
    }
}
