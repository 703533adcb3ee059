use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected before any simulation work begins.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Internal bookkeeping went wrong, e.g. a fill of an already resident block.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("trace line {line}: {message}")]
    Trace { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
