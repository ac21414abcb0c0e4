//! # Slacktap Engine
//!
//! Incremental extraction engine for paginated JSON APIs.
//!
//! This crate provides:
//! - Declarative resource descriptors and a validated resource graph
//! - Per-invocation state machine (not started → fetching → processing → finalizing → done)
//! - Cursor, page-number and single-page pagination
//! - Per-resource rate limiting
//! - Retry with exponential backoff and `Retry-After` hints
//! - Checkpoint stores with atomic file persistence
//! - JSON-lines message sinks
//!
//! ## Architecture
//!
//! Root resources are extracted one after another. Each record of a parent
//! page fans out into its child resources; drivers may additionally invoke
//! auxiliary resources with an explicit context and an optional side
//! channel record. Virtual resources never touch the network and derive
//! their records from that side channel.
//!
//! ## Key Invariants
//!
//! - A partition position only advances after its page reached the sink
//! - A committed replication value never decreases
//! - A record older than the emission floor is never emitted
//! - Only finalized partitions start the next run from their committed value
//! - Requests to one resource are spaced by its rate limit

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checkpoint;
mod clock;
mod config;
mod engine;
mod error;
mod fetcher;
mod graph;
mod http;
mod paginator;
mod rate_limit;
mod resource;
mod sink;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ApiConfig, EngineConfig, RetryConfig, DEFAULT_FATAL_ERROR_CODES};
pub use engine::{
    InvocationState, ResourceOutcome, ResourceStats, ResourceSummary, RunSummary, SyncEngine,
};
pub use error::{SyncError, SyncResult};
pub use fetcher::{classify_response, FetchOutcome, FetchStats, Fetcher, ResponseClass};
pub use graph::{ResourceGraph, Selection};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MockHttpClient};
pub use paginator::{
    CursorPaginator, PageNumberPaginator, Paginator, PaginatorKind, SinglePagePaginator,
};
pub use rate_limit::{RateLimiter, RateLimiterStats};
pub use resource::{
    AuxiliaryCall, Endpoint, HookContext, Invocation, NoHooks, ReplicationMode,
    ResourceDescriptor, ResourceHooks,
};
pub use sink::{JsonLinesSink, MemorySink, MessageSink};
