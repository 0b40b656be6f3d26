//! # Persistence Format
//!
//! Binary snapshots of a [`RegionGraph`].
//!
//! Format: Header (5 bytes) + postcard-serialized [`SerializableGraph`].
//! - 4 bytes: Magic ("PRAG")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is parsed, and the
//! decoded graph is rebuilt through the checked insert path, so a corrupt
//! snapshot fails with an error instead of producing an inconsistent graph.

use crate::{FormatError, RegionGraph, SerializableGraph, primitives};

// =============================================================================
// LIMITS
// =============================================================================

/// Largest snapshot accepted by [`graph_from_bytes`].
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 512 * 1024 * 1024;

const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header preceding all snapshot data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(FormatError::Header("invalid magic bytes".to_string()));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(FormatError::Header(format!(
                "unsupported version {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let (Some(magic), Some(&version)) = (bytes.first_chunk::<4>(), bytes.get(4)) else {
            return Err(FormatError::Header("header too short".to_string()));
        };
        Ok(Self {
            magic: *magic,
            version,
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Encode a graph as header + payload.
pub fn graph_to_bytes(graph: &RegionGraph) -> Result<Vec<u8>, FormatError> {
    let header = PersistenceHeader::new();
    let payload = postcard::to_stdvec(&SerializableGraph::from(graph))
        .map_err(|e| FormatError::Serialization(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode a graph written by [`graph_to_bytes`].
pub fn graph_from_bytes(bytes: &[u8]) -> Result<RegionGraph, FormatError> {
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(FormatError::Deserialization(format!(
            "snapshot is {} bytes, limit is {}",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }
    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_LEN..).unwrap_or_default();
    let serializable: SerializableGraph = postcard::from_bytes(payload)
        .map_err(|e| FormatError::Deserialization(e.to_string()))?;

    let graph = RegionGraph::try_from(serializable)?;
    graph.check_consistency()?;
    Ok(graph)
}

// =============================================================================
// TESTS
// =============================================================================
