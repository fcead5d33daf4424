//! Mimir error types

use std::time::Duration;

/// Mimir error types
#[derive(Debug, thiserror::Error)]
pub enum MimirError {
    // Source/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("timed out after {after:?} fetching {source_name}")]
    Timeout {
        source_name: String,
        after: Duration,
    },

    /// The source answered but produced nothing usable.
    #[error("{0}")]
    EmptySource(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parse error: {0}")]
    Parse(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The cache's own storage is inconsistent. Never downgraded to a warning.
    #[error("cache error: {0}")]
    Cache(String),
}

impl MimirError {
    /// Whether this error must abort a reconciliation pass instead of being
    /// reported as a degraded source.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Cache(_))
    }
}

impl From<reqwest::Error> for MimirError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            MimirError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            MimirError::Http(err.to_string())
        }
    }
}

/// Result type alias for Mimir operations
pub type Result<T> = std::result::Result<T, MimirError>;
