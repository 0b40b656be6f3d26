//! # proofread-core
//!
//! Region adjacency graph editing for focused segmentation proofreading.
//!
//! A segmentation is modelled as a [`RegionGraph`]: regions (bodies) are
//! nodes, shared faces are edges weighted by the probability that the two
//! regions should stay separate. On top of the graph this crate provides:
//! - `contraction`: reversible merges with pluggable edge combination
//! - `inclusion`: removal of regions fully enclosed by a single neighbor
//! - `affinity`: best-first search for the most confident path between
//!   regions
//! - `queue` + `editor`: the ranked edit scheduler that stages one edge at
//!   a time for review, with exact undo and a resumable state document
//! - `formats`: binary graph snapshots
//!
//! ## Constraints
//!
//! - Deterministic: ordered collections and explicit tie-breaks only
//! - Single-threaded: the editor exclusively owns its graph
//! - No async, no I/O (file handling lives in the app layer)

// =============================================================================
// MODULES
// =============================================================================

pub mod affinity;
pub mod config;
pub mod contraction;
pub mod editor;
pub mod formats;
pub mod graph;
pub mod inclusion;
pub mod primitives;
pub mod queue;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Edge, EdgeProperties, FormatError, GraphError, Location, Node, NodeId, NodePair,
    NodeProperties, SchedulerError, canonical,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use affinity::{AffinityMap, AffinityPair, AffinityParams, AffinitySearch};
pub use config::EditorConfig;
pub use contraction::{
    AccumulateCombine, CombineStrategy, LowestWeightCombine, MergeRecord, merge, unmerge,
};
pub use graph::{RegionGraph, SerializableGraph};
pub use inclusion::{Inclusion, InclusionRemover};
pub use queue::{RankedEditQueue, RankedItem};

// =============================================================================
// RE-EXPORTS: Scheduler
// =============================================================================

pub use editor::{
    EdgeEditor, EdgeRange, HistoryEntry, ProcessedCounts, ReviewMode, SchedulerState,
    entropy_delta,
};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{
    MAX_PERSISTENCE_PAYLOAD_SIZE, PersistenceHeader, graph_from_bytes, graph_to_bytes,
};
