//! # proofread
//!
//! Command line driver for `proofread-core`.
//!
//! The core never touches the filesystem; this crate owns argument
//! parsing, graph and state document I/O, and configuration loading.
//! Graphs are read from JSON (`SerializableGraph`) or from binary snapshots
//! (detected by their magic bytes); scheduler states are JSON; the editor
//! configuration is TOML.

pub mod cli;
pub mod error;

pub use error::AppError;
