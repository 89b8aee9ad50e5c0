//! Error types for the detection engine.

use thiserror::Error;

use condenser_models::ModelError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that stop a detection session.
///
/// Transient signal gaps (no skeletons, no ankles) are never errors; the
/// state machine has explicit policy for them.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Invalid zone #{index}: {reason}")]
    InvalidZone { index: usize, reason: String },

    #[error("Invalid video properties: {0}")]
    InvalidVideo(String),

    #[error("Timestamp went backwards: {current:.3}s after {previous:.3}s")]
    NonMonotonicTimestamp { previous: f64, current: f64 },

    #[error("Timestamp must be finite, got {0}")]
    InvalidTimestamp(f64),

    #[error("Logic step must be at least 1, got {0}")]
    InvalidLogicStep(u32),

    #[error("Frame {sequence} delivered out of order (next expected {expected})")]
    FrameOutOfOrder { sequence: u64, expected: u64 },

    #[error("Missing frame {expected}: {pending} later frames are still buffered")]
    MissingFrames { expected: u64, pending: usize },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl EngineError {
    /// Create an invalid configuration error.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Create an invalid zone error.
    pub fn invalid_zone(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidZone {
            index,
            reason: reason.into(),
        }
    }

    /// Create an invalid video error.
    pub fn invalid_video(message: impl Into<String>) -> Self {
        Self::InvalidVideo(message.into())
    }
}
