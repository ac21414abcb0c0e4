//! Error types for protocol encoding and decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol values.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// JSON serialization or parsing failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A message line was well-formed JSON but not a valid message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A context signature could not be turned back into a context.
    #[error("invalid context signature: {0}")]
    InvalidContext(String),
}

impl ProtocolError {
    /// Creates an invalid message error.
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }
}
