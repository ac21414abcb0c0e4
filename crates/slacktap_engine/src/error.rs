//! Error types for the extraction engine.

use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during extraction.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transient failure: HTTP 429, 5xx, or a transport-level error.
    #[error("retriable error (status {status:?}): {message}")]
    Retriable {
        /// HTTP status, absent for transport failures.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// Permanent failure that aborts the affected resource invocation.
    #[error("fatal error (status {status}): {message}")]
    Fatal {
        /// HTTP status of the response.
        status: u16,
        /// Body-level error code, if any.
        code: Option<String>,
        /// Error message.
        message: String,
    },

    /// The retry budget ran out on a retriable error.
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The last retriable error.
        last: Box<SyncError>,
    },

    /// A record limit was reached; extraction stops cleanly.
    #[error("record limit of {limit} reached")]
    LimitExceeded {
        /// Resource whose own limit was reached, `None` for the run-wide limit.
        resource: Option<String>,
        /// The configured limit.
        limit: u64,
    },

    /// The resource graph is malformed.
    #[error("invalid resource graph: {0}")]
    InvalidGraph(String),

    /// Invalid invocation state transition.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// Checkpoint store failure.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Another process holds the checkpoint file.
    #[error("checkpoint file is locked by another process")]
    CheckpointLocked,

    /// Protocol error (invalid response body, bad message).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Creates a retriable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Retriable {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a fatal error for an HTTP status without a body-level code.
    pub fn fatal_status(status: u16, message: impl Into<String>) -> Self {
        Self::Fatal {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Creates a fatal error for a body-level error code.
    pub fn fatal_code(status: u16, code: impl Into<String>) -> Self {
        let code = code.into();
        Self::Fatal {
            status,
            message: format!("api error: {code}"),
            code: Some(code),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Retriable { .. })
    }

    /// Returns true if this error aborts a resource invocation and marks it failed.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::LimitExceeded { .. })
    }

    /// Returns true if this is the run-wide record limit.
    pub fn is_run_limit(&self) -> bool {
        matches!(self, SyncError::LimitExceeded { resource: None, .. })
    }

    /// Returns true if this is the record limit of `name`.
    pub fn is_resource_limit(&self, name: &str) -> bool {
        matches!(self, SyncError::LimitExceeded { resource: Some(r), .. } if r == name)
    }
}

impl From<slacktap_protocol::ProtocolError> for SyncError {
    fn from(err: slacktap_protocol::ProtocolError) -> Self {
        SyncError::Protocol(err.to_string())
    }
}
