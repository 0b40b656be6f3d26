//! # Core Type Definitions
//!
//! This module contains the value types shared by every layer of the
//! proofreading core:
//! - Region identifiers (`NodeId`, `NodePair`)
//! - Graph records (`Node`, `Edge`) and their optional property tables
//! - Error types (`GraphError`, `SchedulerError`, `FormatError`)
//!
//! ## Determinism Guarantees
//!
//! - Identifiers implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Edges are stored with their endpoints in canonical (ascending) order
//! - Property tables distinguish "absent" from "false"/"zero" so that undo
//!   can restore them exactly

use crate::primitives::RESOLVED_CUTOFF;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for a region (node) of the adjacency graph.
///
/// Ids are stable handles: a merged-away id never becomes live again unless
/// the merge is undone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered pair of regions, as handed out and accepted by the editor.
///
/// The order carries meaning: the first node survives a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodePair(pub NodeId, pub NodeId);

impl NodePair {
    /// The endpoints in ascending id order.
    #[must_use]
    pub fn key(self) -> (NodeId, NodeId) {
        canonical(self.0, self.1)
    }

    /// Unordered comparison.
    #[must_use]
    pub fn same_edge(self, other: Self) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Display for NodePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Order two endpoints ascending.
#[must_use]
pub fn canonical(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

// =============================================================================
// PROPERTY TABLES
// =============================================================================

/// A voxel coordinate inside the volume.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Location {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Location {
    #[must_use]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

/// Optional per-node properties.
///
/// Every field is optional; lookups through the accessors default to
/// `false`/`0` and never fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct NodeProperties {
    /// The region does not touch the volume boundary.
    #[serde(default)]
    pub orphan: Option<bool>,
    /// The region has already been reviewed in the current mode.
    #[serde(default)]
    pub examined: Option<bool>,
    /// Number of synaptic annotations inside the region.
    #[serde(default)]
    pub synapse_weight: Option<u64>,
}

impl NodeProperties {
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.orphan.unwrap_or(false)
    }

    #[must_use]
    pub fn is_examined(&self) -> bool {
        self.examined.unwrap_or(false)
    }

    #[must_use]
    pub fn synapse_weight(&self) -> u64 {
        self.synapse_weight.unwrap_or(0)
    }
}

/// Optional per-edge properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct EdgeProperties {
    /// A representative voxel on the contact surface.
    #[serde(default)]
    pub location: Option<Location>,
    /// Number of boundary voxels shared by the two regions.
    #[serde(default)]
    pub edge_size: Option<u64>,
}

// =============================================================================
// NODE
// =============================================================================

/// A region of the segmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Voxel count; accumulates on merge.
    pub size: u64,
    /// The region touches the volume boundary.
    #[serde(default)]
    pub boundary: bool,
    #[serde(default)]
    pub props: NodeProperties,
}

impl Node {
    /// Create a new interior node with an empty property table.
    #[must_use]
    pub fn new(id: NodeId, size: u64) -> Self {
        Self {
            id,
            size,
            boundary: false,
            props: NodeProperties::default(),
        }
    }

    #[must_use]
    pub fn with_boundary(mut self, boundary: bool) -> Self {
        self.boundary = boundary;
        self
    }

    #[must_use]
    pub fn with_orphan(mut self, orphan: bool) -> Self {
        self.props.orphan = Some(orphan);
        self
    }

    #[must_use]
    pub fn with_synapse_weight(mut self, weight: u64) -> Self {
        self.props.synapse_weight = Some(weight);
        self
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// An adjacency between two regions.
///
/// Endpoints are stored canonically (`a < b`). A weight above
/// [`RESOLVED_CUTOFF`] marks an edge a reviewer has explicitly kept split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    /// Boundary probability: 0.0 means certainly the same object.
    pub weight: f64,
    #[serde(default)]
    pub size: u64,
    /// Never merge across this edge automatically.
    #[serde(default)]
    pub preserve: bool,
    /// Synthetic constraint edge with no real contact voxels.
    #[serde(default)]
    pub false_edge: bool,
    #[serde(default)]
    pub props: EdgeProperties,
}

impl Edge {
    /// Create an edge between two regions; endpoints are reordered canonically.
    #[must_use]
    pub fn new(a: NodeId, b: NodeId, weight: f64) -> Self {
        let (a, b) = canonical(a, b);
        Self {
            a,
            b,
            weight,
            size: 0,
            preserve: false,
            false_edge: false,
            props: EdgeProperties::default(),
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_preserve(mut self, preserve: bool) -> Self {
        self.preserve = preserve;
        self
    }

    #[must_use]
    pub fn with_false_edge(mut self, false_edge: bool) -> Self {
        self.false_edge = false_edge;
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.props.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_edge_size(mut self, edge_size: u64) -> Self {
        self.props.edge_size = Some(edge_size);
        self
    }

    /// Canonical key of this edge.
    #[must_use]
    pub const fn key(&self) -> (NodeId, NodeId) {
        (self.a, self.b)
    }

    /// The endpoint opposite `id`, if `id` is an endpoint.
    #[must_use]
    pub fn other(&self, id: NodeId) -> Option<NodeId> {
        if id == self.a {
            Some(self.b)
        } else if id == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Whether a reviewer has already decided to keep this edge split.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.weight > RESOLVED_CUTOFF
    }

    /// Copy of this edge with `from` replaced by `to`, re-canonicalized.
    #[must_use]
    pub fn repointed(&self, from: NodeId, to: NodeId) -> Self {
        let (a, b) = if self.a == from {
            canonical(to, self.b)
        } else {
            canonical(self.a, to)
        };
        Self {
            a,
            b,
            ..self.clone()
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by graph storage and contraction.
///
/// These are precondition violations; a failed operation leaves the graph
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge not found: {0} -- {1}")]
    EdgeNotFound(NodeId, NodeId),

    #[error("Cannot merge node {0} into itself")]
    SelfMerge(NodeId),

    #[error("Self loop on node {0}")]
    SelfLoop(NodeId),

    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeId),

    #[error("Duplicate edge: {0} -- {1}")]
    DuplicateEdge(NodeId, NodeId),

    /// A restore found the graph in a state that does not match its record.
    #[error("Graph corrupted: {0}")]
    Corrupted(String),
}

/// Errors raised by the edit scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// No edge is staged and no candidate remains. This is the normal
    /// terminal state of a review session.
    #[error("Priority queue is empty")]
    Empty,

    #[error("Scheduler has no review mode configured")]
    NotInitialized,

    #[error("Edge {0} -- {1} is not the staged edge")]
    NotStaged(NodeId, NodeId),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors raised by the binary snapshot format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid header: {0}")]
    Header(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

// =============================================================================
// TESTS
// =============================================================================
