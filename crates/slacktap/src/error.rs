//! Error types for the Slack tap.

use slacktap_engine::SyncError;
use thiserror::Error;

/// Result type for tap operations.
pub type TapResult<T> = Result<T, TapError>;

/// Errors that can occur in the tap.
#[derive(Error, Debug)]
pub enum TapError {
    /// Invalid configuration.
    #[error("invalid config: {0}")]
    Config(String),

    /// Unknown stream name.
    #[error("unknown stream: {0}")]
    UnknownStream(String),

    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    Http(String),

    /// Engine error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TapError {
    /// Returns true if the error stems from user input rather than the API.
    pub fn is_user_error(&self) -> bool {
        matches!(self, TapError::Config(_) | TapError::UnknownStream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TapError::Config("api_key is required".into());
        assert_eq!(err.to_string(), "invalid config: api_key is required");
        assert!(err.is_user_error());

        let err = TapError::from(SyncError::CheckpointLocked);
        assert_eq!(err.to_string(), "checkpoint file is locked by another process");
        assert!(!err.is_user_error());
    }
}
