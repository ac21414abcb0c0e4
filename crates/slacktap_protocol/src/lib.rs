//! # slacktap protocol
//!
//! Message, schema and state types for the slacktap extraction engine.
//!
//! This crate provides:
//! - `Context` for partitioning extraction state
//! - `Schema` declarations and record conformance
//! - Output messages (SCHEMA, RECORD, STATE) and their line codec
//! - The persisted `StateDocument`
//! - Ordering of replication values
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod message;
mod replication;
mod schema;
mod state;

pub use context::Context;
pub use error::{ProtocolError, ProtocolResult};
pub use message::Message;
pub use replication::{
    compare_replication_values, datetime_to_slack_ts, max_replication_value, slack_ts_to_datetime,
    ReplicationFormat,
};
pub use schema::{FieldType, Property, Schema};
pub use state::{PageToken, PartitionState, StateDocument};

/// An output row: field name to value, ordered by field name.
pub type Record = serde_json::Map<String, serde_json::Value>;
