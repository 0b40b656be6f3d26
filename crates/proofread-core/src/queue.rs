//! # Ranked Edit Queue
//!
//! The ordered set of "head" regions still awaiting review.
//!
//! Larger ranks come first; equal ranks break on the smaller id. Every
//! insert and removal also flips the node's `examined` property in the
//! graph, and can be recorded into checkpoint frames so that one scheduler
//! step is undone as a unit.

use crate::{NodeId, RegionGraph};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// RANKED ITEM
// =============================================================================

/// A candidate head node and the rank it was queued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankedItem {
    pub id: NodeId,
    pub rank: u64,
}

impl RankedItem {
    #[must_use]
    pub const fn new(id: NodeId, rank: u64) -> Self {
        Self { id, rank }
    }
}

impl Ord for RankedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other.rank.cmp(&self.rank).then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for RankedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// UNDO LOG
// =============================================================================

/// One logged queue mutation. `prior_examined` is the node's property value
/// before the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueAction {
    Inserted {
        item: RankedItem,
        replaced: Option<RankedItem>,
        prior_examined: Option<bool>,
    },
    Removed {
        item: RankedItem,
        prior_examined: Option<bool>,
    },
}

// =============================================================================
// QUEUE
// =============================================================================

/// Ordered head-node set with checkpointed undo.
#[derive(Debug, Clone, Default)]
pub struct RankedEditQueue {
    ordered: BTreeSet<RankedItem>,
    by_id: BTreeMap<NodeId, RankedItem>,
    frames: Vec<Vec<QueueAction>>,
    recording: bool,
}

impl RankedEditQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Highest-ranked item.
    #[must_use]
    pub fn first(&self) -> Option<RankedItem> {
        self.ordered.first().copied()
    }

    /// Queued items in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &RankedItem> {
        self.ordered.iter()
    }

    /// Queue a node, replacing any entry it already has, and mark it
    /// unexamined.
    pub fn insert(&mut self, graph: &mut RegionGraph, item: RankedItem) {
        let replaced = self.by_id.remove(&item.id);
        if let Some(old) = replaced {
            self.ordered.remove(&old);
        }
        self.ordered.insert(item);
        self.by_id.insert(item.id, item);
        let prior_examined = set_examined(graph, item.id, Some(false));
        self.log(QueueAction::Inserted {
            item,
            replaced,
            prior_examined,
        });
    }

    /// Drop a node from the queue and mark it examined.
    ///
    /// Returns the removed entry; unknown ids are a no-op.
    pub fn remove_id(&mut self, graph: &mut RegionGraph, id: NodeId) -> Option<RankedItem> {
        let item = self.by_id.remove(&id)?;
        self.ordered.remove(&item);
        let prior_examined = set_examined(graph, id, Some(true));
        self.log(QueueAction::Removed {
            item,
            prior_examined,
        });
        Some(item)
    }

    /// Drop an exact entry; a mismatched rank is a no-op.
    pub fn remove(&mut self, graph: &mut RegionGraph, item: RankedItem) -> bool {
        if self.by_id.get(&item.id) != Some(&item) {
            return false;
        }
        self.remove_id(graph, item.id).is_some()
    }

    /// Remove and return the highest-ranked item.
    pub fn pop_first(&mut self, graph: &mut RegionGraph) -> Option<RankedItem> {
        let head = self.first()?;
        self.remove_id(graph, head.id)
    }

    // -------------------------------------------------------------------------
    // Checkpoints
    // -------------------------------------------------------------------------

    /// Open a new undo frame; mutations are logged into it until
    /// [`Self::stop_checkpoint`].
    pub fn start_checkpoint(&mut self) {
        self.frames.push(Vec::new());
        self.recording = true;
    }

    /// Stop logging. The frame stays available to [`Self::undo_one`].
    pub fn stop_checkpoint(&mut self) {
        self.recording = false;
    }

    /// Revert the most recent frame, newest action first.
    ///
    /// Returns false when no frame is left.
    pub fn undo_one(&mut self, graph: &mut RegionGraph) -> bool {
        let Some(frame) = self.frames.pop() else {
            return false;
        };
        self.recording = false;
        for action in frame.into_iter().rev() {
            match action {
                QueueAction::Inserted {
                    item,
                    replaced,
                    prior_examined,
                } => {
                    self.ordered.remove(&item);
                    self.by_id.remove(&item.id);
                    if let Some(old) = replaced {
                        self.ordered.insert(old);
                        self.by_id.insert(old.id, old);
                    }
                    set_examined(graph, item.id, prior_examined);
                }
                QueueAction::Removed {
                    item,
                    prior_examined,
                } => {
                    self.ordered.insert(item);
                    self.by_id.insert(item.id, item);
                    set_examined(graph, item.id, prior_examined);
                }
            }
        }
        true
    }

    fn log(&mut self, action: QueueAction) {
        if !self.recording {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.push(action);
        }
    }
}

/// Write a node's `examined` property, returning the previous value.
/// Missing nodes are left alone.
fn set_examined(graph: &mut RegionGraph, id: NodeId, value: Option<bool>) -> Option<bool> {
    let node = graph.node_mut(id)?;
    std::mem::replace(&mut node.props.examined, value)
}

// =============================================================================
// TESTS
// =============================================================================
