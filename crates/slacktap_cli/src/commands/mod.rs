//! CLI command implementations.

pub mod about;
pub mod discover;
pub mod sync;

use slacktap::TapError;
use slacktap_engine::SyncError;
use slacktap_protocol::ProtocolError;
use thiserror::Error;

/// Errors returned by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid command-line arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Tap configuration or stream selection failed.
    #[error(transparent)]
    Tap(#[from] TapError),

    /// The extraction run failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// State could not be rendered.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
