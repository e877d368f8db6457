//! Error types for the persistence tiers and the share-link service.
//!
//! Only [`ShareError`] (and the import `ValidationError` living in
//! `scenery-core`) ever reach a caller; everything else degrades
//! silently to the next tier or is logged and swallowed by the
//! coordinator.

use thiserror::Error;

/// Errors from the remote scene row store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The configured remote base URL is malformed.
    #[error("invalid remote store URL: {0}")]
    InvalidUrl(String),

    /// HTTP layer failed (connection, timeout, TLS).
    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("remote store rejected the request ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the store.
        body: String,
    },

    /// A payload could not be parsed.
    #[error("failed to parse remote payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl RemoteError {
    /// Whether this error is the schema-mismatch signal: the store
    /// rejected a request because one of the newer access columns does
    /// not exist on the target schema.
    #[must_use]
    pub fn is_schema_mismatch(&self) -> bool {
        match self {
            Self::Status { body, .. } => crate::remote::mentions_missing_column(body),
            _ => false,
        }
    }
}

/// Errors from the local persistent cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem access failed.
    #[error("cache IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be serialized.
    #[error("cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the companion server client.
#[derive(Debug, Error)]
pub enum CompanionError {
    /// The configured companion URL is malformed.
    #[error("invalid companion URL: {0}")]
    InvalidUrl(String),

    /// HTTP layer failed.
    #[error("companion request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The companion answered with a non-success status.
    #[error("companion rejected the request ({0})")]
    Status(u16),
}

/// Errors surfaced to the caller by the share-link service.
#[derive(Debug, Error)]
pub enum ShareError {
    /// Sharing was attempted without a signed-in owner. Checked before
    /// any write occurs.
    #[error("sign-in is required before sharing")]
    AuthRequired,

    /// The remote write failed while creating or updating the share
    /// link.
    #[error("share link could not be written: {0}")]
    Failed(String),
}

/// Error returned by a [`crate::MediaUploader`] implementation.
#[derive(Debug, Error)]
#[error("media upload failed: {0}")]
pub struct MediaUploadError(pub String);
