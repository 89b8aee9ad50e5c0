//! Error types for model parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while reading or decoding model files.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid frame record at line {line}: {message}")]
    InvalidFrame { line: usize, message: String },
}

impl ModelError {
    /// Create an invalid frame error.
    pub fn invalid_frame(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            line,
            message: message.into(),
        }
    }
}
