//! Resource descriptors and hooks.
//!
//! A resource is described declaratively by a [`ResourceDescriptor`]:
//! endpoint, keys, replication policy, pagination, rate limit and place in
//! the graph. Behavior that differs per resource is supplied through a
//! small [`ResourceHooks`] object; every hook has a default, so most
//! resources override one or two of them.

use crate::error::SyncResult;
use crate::fetcher::{FetchOutcome, Fetcher};
use crate::http::HttpMethod;
use crate::paginator::PaginatorKind;
use crate::rate_limit::RateLimiter;
use serde_json::Value;
use slacktap_protocol::{Context, Record, ReplicationFormat, Schema};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Replication mode of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationMode {
    /// Re-extract everything on every run.
    Full,
    /// Extract records at or after the persisted position.
    Incremental,
}

impl ReplicationMode {
    /// Catalog name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicationMode::Full => "FULL_TABLE",
            ReplicationMode::Incremental => "INCREMENTAL",
        }
    }
}

/// How a resource gets invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Enumerated once per run.
    Root,
    /// Invoked once per record of `parent`.
    Child {
        /// Parent resource name.
        parent: String,
    },
    /// Invoked explicitly from the record processing of `driver`.
    Auxiliary {
        /// Driving resource name.
        driver: String,
    },
}

/// Endpoint of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the API base URL.
    pub path: String,
}

impl Endpoint {
    /// A GET endpoint.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
        }
    }

    /// A POST endpoint.
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
        }
    }
}

/// A request, made while processing a record, to invoke an auxiliary resource.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryCall {
    /// Target resource; must be declared as an auxiliary of the driver.
    pub target: String,
    /// Context of the target partition.
    pub context: Context,
    /// Transient data for the target. Never persisted.
    pub side_channel: Option<Record>,
}

impl AuxiliaryCall {
    /// Creates a call to `target` with `context`.
    pub fn new(target: impl Into<String>, context: Context) -> Self {
        Self {
            target: target.into(),
            context,
            side_channel: None,
        }
    }

    /// Attaches a side-channel record.
    #[must_use]
    pub fn with_side_channel(mut self, record: Record) -> Self {
        self.side_channel = Some(record);
        self
    }
}

/// What a hook can see about the invocation it runs in.
pub struct HookContext<'a> {
    /// Resource being extracted.
    pub resource: &'a str,
    /// Partition context.
    pub context: &'a Context,
    /// Lowest replication value requested from the API, after lookback.
    pub request_floor: Option<&'a Value>,
    /// The API, for hooks that need side requests.
    pub api: &'a Fetcher,
    /// The resource's rate limiter.
    pub limiter: &'a RateLimiter,
}

impl HookContext<'_> {
    /// Sends a side request on behalf of the resource, inside its rate budget.
    pub fn call(
        &self,
        endpoint: &Endpoint,
        params: Vec<(String, String)>,
    ) -> SyncResult<FetchOutcome> {
        let outcome = self.api.call(self.resource, endpoint, params);
        self.limiter.acquire();
        outcome
    }
}

/// Per-resource behavior plugged into the engine.
pub trait ResourceHooks: Send + Sync {
    /// Extra request parameters for one partition.
    fn url_params(&self, _hook: &HookContext<'_>) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Transforms or filters one raw record. `None` drops it along with its
    /// children and auxiliary calls.
    fn post_process(&self, raw: Value, hook: &HookContext<'_>) -> SyncResult<Option<Record>> {
        match raw {
            Value::Object(record) => Ok(Some(record)),
            other => {
                debug!(resource = hook.resource, value = %other, "dropping non-object record");
                Ok(None)
            }
        }
    }

    /// Context handed to child resources for `record`. `None` skips children.
    fn child_context(&self, _record: &Record, _context: &Context) -> Option<Context> {
        None
    }

    /// Auxiliary invocations triggered by `record`.
    ///
    /// `above_floor` is false for records older than the emission floor;
    /// they are not emitted but may still drive auxiliary resources.
    fn auxiliary_calls(
        &self,
        _record: &Record,
        _above_floor: bool,
        _hook: &HookContext<'_>,
    ) -> Vec<AuxiliaryCall> {
        Vec::new()
    }

    /// Records of a virtual resource, derived from the side channel.
    fn derive_records(&self, _context: &Context, _side_channel: Option<&Record>) -> Vec<Record> {
        Vec::new()
    }
}

/// Hooks that keep every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl ResourceHooks for NoHooks {}

/// Declarative description of one resource.
#[derive(Clone)]
pub struct ResourceDescriptor {
    /// Unique resource name.
    pub name: String,
    /// Endpoint; `None` for virtual resources.
    pub endpoint: Option<Endpoint>,
    /// Primary-key fields.
    pub primary_keys: Vec<String>,
    /// Replication field.
    pub replication_key: Option<String>,
    /// Replication mode.
    pub replication_mode: ReplicationMode,
    /// How instants (start date, lookback) render as replication values.
    pub replication_format: ReplicationFormat,
    /// JSON pointer to the record array in a response body.
    pub records_path: String,
    /// Pagination strategy.
    pub paginator: PaginatorKind,
    /// Maximum requests per minute; `0` disables throttling.
    pub max_requests_per_minute: u32,
    /// Page size sent with every request.
    pub page_size: Option<u32>,
    /// Fixed extra query parameters.
    pub extra_params: Vec<(String, String)>,
    /// Place in the resource graph.
    pub invocation: Invocation,
    /// Resources this one may invoke auxiliarily.
    pub auxiliaries: Vec<String>,
    /// Lookback widening the incremental window.
    pub lookback: Option<Duration>,
    /// Whether the API returns records in ascending replication order.
    pub sorted: bool,
    /// Whether the resource is selected when no explicit selection is given.
    pub selected_by_default: bool,
    /// Declared record schema.
    pub schema: Schema,
    /// Behavior hooks.
    pub hooks: Arc<dyn ResourceHooks>,
}

impl ResourceDescriptor {
    /// Creates a root, full-mode, single-page resource with no endpoint.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            endpoint: None,
            primary_keys: Vec::new(),
            replication_key: None,
            replication_mode: ReplicationMode::Full,
            replication_format: ReplicationFormat::default(),
            records_path: String::new(),
            paginator: PaginatorKind::SinglePage,
            max_requests_per_minute: 0,
            page_size: None,
            extra_params: Vec::new(),
            invocation: Invocation::Root,
            auxiliaries: Vec::new(),
            lookback: None,
            sorted: true,
            selected_by_default: true,
            schema,
            hooks: Arc::new(NoHooks),
        }
    }

    /// Sets the endpoint.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the primary-key fields.
    pub fn with_primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Makes the resource incremental on `key`.
    pub fn with_incremental(mut self, key: impl Into<String>) -> Self {
        self.replication_key = Some(key.into());
        self.replication_mode = ReplicationMode::Incremental;
        self
    }

    /// Sets the replication value format.
    pub fn with_replication_format(mut self, format: ReplicationFormat) -> Self {
        self.replication_format = format;
        self
    }

    /// Sets the JSON pointer of the record array.
    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = path.into();
        self
    }

    /// Sets the pagination strategy.
    pub fn with_paginator(mut self, paginator: PaginatorKind) -> Self {
        self.paginator = paginator;
        self
    }

    /// Sets the maximum requests per minute.
    pub fn with_max_requests_per_minute(mut self, rpm: u32) -> Self {
        self.max_requests_per_minute = rpm;
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Adds a fixed query parameter.
    pub fn with_extra_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((key.into(), value.into()));
        self
    }

    /// Makes the resource a child of `parent`.
    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.invocation = Invocation::Child {
            parent: parent.into(),
        };
        self
    }

    /// Makes the resource an auxiliary of `driver`.
    pub fn auxiliary_of(mut self, driver: impl Into<String>) -> Self {
        self.invocation = Invocation::Auxiliary {
            driver: driver.into(),
        };
        self
    }

    /// Declares an auxiliary edge from this resource to `target`.
    pub fn with_auxiliary(mut self, target: impl Into<String>) -> Self {
        self.auxiliaries.push(target.into());
        self
    }

    /// Sets the lookback window.
    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = Some(lookback);
        self
    }

    /// Declares whether the API returns records in ascending replication order.
    pub fn with_sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    /// Sets whether the resource is selected by default.
    pub fn with_selected_by_default(mut self, selected: bool) -> Self {
        self.selected_by_default = selected;
        self
    }

    /// Sets the hooks.
    pub fn with_hooks(mut self, hooks: impl ResourceHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Returns true if the resource derives its records instead of fetching them.
    pub fn is_virtual(&self) -> bool {
        self.endpoint.is_none()
    }

    /// Returns true if the resource is incremental.
    pub fn is_incremental(&self) -> bool {
        self.replication_mode == ReplicationMode::Incremental
    }

    /// Parent resource name, for children.
    pub fn parent(&self) -> Option<&str> {
        match &self.invocation {
            Invocation::Child { parent } => Some(parent),
            _ => None,
        }
    }

    /// Driver resource name, for auxiliaries.
    pub fn driver(&self) -> Option<&str> {
        match &self.invocation {
            Invocation::Auxiliary { driver } => Some(driver),
            _ => None,
        }
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("primary_keys", &self.primary_keys)
            .field("replication_key", &self.replication_key)
            .field("replication_mode", &self.replication_mode)
            .field("paginator", &self.paginator)
            .field("invocation", &self.invocation)
            .field("auxiliaries", &self.auxiliaries)
            .finish_non_exhaustive()
    }
}
