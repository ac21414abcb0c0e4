//! # slacktap
//!
//! Incremental extraction of Slack workspaces.
//!
//! This crate provides:
//! - `TapConfig`: JSON configuration with validation
//! - Stream definitions for channels, channel members, messages, threads,
//!   reactions, users and the admin-only user groups and integration logs
//! - A blocking `reqwest` client for the Slack Web API
//! - Discovery of the stream catalog
//! - `SlackTap`: builds a configured extraction engine
//!
//! ## Example
//!
//! ```no_run
//! use slacktap::{ReqwestClient, SlackTap, TapConfig};
//! use slacktap_engine::{EngineConfig, JsonLinesSink, MemoryCheckpointStore};
//! use std::sync::Arc;
//!
//! let tap = SlackTap::new(TapConfig::new("xoxb-token"))?;
//! let selection = tap.select(&[])?;
//! let mut engine = tap.engine(
//!     EngineConfig::new(),
//!     selection,
//!     Arc::new(ReqwestClient::new()?),
//!     Arc::new(MemoryCheckpointStore::new()),
//!     JsonLinesSink::new(std::io::stdout()),
//! );
//! let summary = engine.run()?;
//! println!("{} records", summary.total_records());
//! # Ok::<(), slacktap::TapError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod client;
mod config;
mod error;
pub mod schemas;
pub mod streams;
mod tap;

pub use catalog::{Catalog, CatalogEntry};
pub use client::{parse_retry_after, ReqwestClient, DEFAULT_TIMEOUT};
pub use config::{TapConfig, CHANNEL_TYPES, DEFAULT_API_BASE_URL};
pub use error::{TapError, TapResult};
pub use tap::{SlackTap, TAP_NAME};
