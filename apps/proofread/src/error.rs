//! # Application Errors
//!
//! One error type for the binary, wrapping the core taxonomy plus the
//! file, JSON and TOML failures that only exist at this layer.

use proofread_core::{FormatError, GraphError, SchedulerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
