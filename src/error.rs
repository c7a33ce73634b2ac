//! Error types for FaceSense
//!
//! Only construction-time and boundary operations (configuration, JSON, files)
//! are fallible. Per-frame scoring, normalization, windowing and fusion never
//! return errors; they degrade to 0.0 or sentinel values instead.

use thiserror::Error;

/// Errors that can occur while building or feeding the engine
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid weights for {emotion}: {reason}")]
    InvalidWeights { emotion: String, reason: String },
}
