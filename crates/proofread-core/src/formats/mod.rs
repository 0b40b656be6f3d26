//! # Formats
//!
//! Byte-level encodings of the region graph. File I/O stays in the app
//! layer; everything here is a pure transformation.

pub mod persistence;

pub use persistence::{
    MAX_PERSISTENCE_PAYLOAD_SIZE, PersistenceHeader, graph_from_bytes, graph_to_bytes,
};
