//! Error types for scene document operations.

use thiserror::Error;

/// Result type for scene document operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors that can occur in scene document operations.
#[derive(Debug, Error)]
pub enum SceneError {
    /// An imported document is missing required top-level fields.
    #[error("invalid scene document: {0}")]
    Validation(String),

    /// Document serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
