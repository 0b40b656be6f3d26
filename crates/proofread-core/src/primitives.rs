//! # Scheduling Primitives
//!
//! Fixed constants of the proofreading core.
//!
//! Tunable values (connection threshold, slice count) live in
//! [`crate::EditorConfig`]; the constants here are their defaults plus the
//! sentinels and format markers that must never change at runtime.

use crate::NodeId;

// =============================================================================
// EDGE WEIGHT SENTINELS
// =============================================================================

/// Weight written to an edge a reviewer has decided to keep split.
///
/// Any weight above [`RESOLVED_CUTOFF`] is outside the probability range and
/// means "never propose this edge again".
pub const RESOLVED_WEIGHT: f64 = 1.2;

/// Weights strictly above this value count as resolved.
pub const RESOLVED_CUTOFF: f64 = 1.00001;

/// Weight given to tiny contacts when a scheduler state asks to prune them.
pub const PRUNED_EDGE_WEIGHT: f64 = 10.0;

/// Contacts with an `edge_size` at or below this are pruned on request.
pub const PRUNE_EDGE_SIZE: u64 = 1;

// =============================================================================
// AFFINITY SEARCH
// =============================================================================

/// Edges whose affinity (`1 - weight`) falls below this are never traversed.
pub const MIN_EDGE_AFFINITY: f64 = 0.000_001;

/// Default lower bound on cumulative path affinity.
pub const DEFAULT_CONNECTION_THRESHOLD: f64 = 0.01;

// =============================================================================
// INCLUSION REMOVAL
// =============================================================================

/// Virtual root standing in for the volume exterior.
///
/// A real node with this id is treated as part of the exterior too.
pub const BACKGROUND_ID: NodeId = NodeId(0);

// =============================================================================
// REVIEW MODES
// =============================================================================

/// Neighbors smaller than this never score in body mode.
pub const MIN_BODY_NEIGHBOR_SIZE: u64 = 1000;

/// Default number of z-slices used to approximate a neurite's volume.
pub const DEFAULT_NUM_SLICES: u32 = 250;

/// Approximate voxel count of a neurite cross-section per slice.
pub const NEURITE_SIZE_PER_SLICE: u64 = 100;

/// Default ignore size for synapse mode.
pub const DEFAULT_SYNAPSE_IGNORE: f64 = 0.1;

/// Default ignore size for edge mode.
pub const DEFAULT_EDGE_IGNORE: f64 = 27.0;

/// Default ignore size for body and orphan modes.
pub const DEFAULT_BODY_IGNORE: f64 = 25000.0;

// =============================================================================
// BINARY FORMAT
// =============================================================================

/// Magic bytes for the graph snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"PRAG";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;
