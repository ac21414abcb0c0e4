//! The extraction engine.
//!
//! Walks the resource graph root by root. Every (resource, context) pair is
//! one invocation with its own state machine:
//!
//! ```text
//! NotStarted → FetchingPage → ProcessingPage → FetchingPage …
//!                    │               │
//!                    │               └──────→ Finalizing → Done
//!                    └─ (fatal / limit) ─────────────────→ Done
//! ```
//!
//! Records of a page are processed in API order. Children and auxiliary
//! invocations triggered by record N complete before record N+1 is looked
//! at. Only after a page is fully processed and the sink flushed does the
//! partition position advance.

use crate::checkpoint::CheckpointStore;
use crate::clock::{Clock, SystemClock};
use crate::config::{ApiConfig, EngineConfig};
use crate::error::{SyncError, SyncResult};
use crate::fetcher::{FetchOutcome, Fetcher};
use crate::graph::{ResourceGraph, Selection};
use crate::http::HttpClient;
use crate::rate_limit::RateLimiter;
use crate::resource::{HookContext, ResourceDescriptor};
use crate::sink::MessageSink;
use chrono::{DateTime, Utc};
use serde_json::Value;
use slacktap_protocol::{
    compare_replication_values, max_replication_value, Context, Message, PageToken,
    PartitionState, Record,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// State of one resource invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    /// Not started yet.
    NotStarted,
    /// Requesting a page.
    FetchingPage,
    /// Processing the records of a page.
    ProcessingPage,
    /// Committing the final position.
    Finalizing,
    /// Finished, successfully or not.
    Done,
}

impl InvocationState {
    /// Returns true if the state machine allows moving to `next`.
    pub fn can_transition_to(self, next: InvocationState) -> bool {
        use InvocationState::*;
        matches!(
            (self, next),
            (NotStarted, FetchingPage)
                | (NotStarted, ProcessingPage)
                | (FetchingPage, ProcessingPage)
                | (FetchingPage, Finalizing)
                | (FetchingPage, Done)
                | (ProcessingPage, FetchingPage)
                | (ProcessingPage, Finalizing)
                | (ProcessingPage, Done)
                | (Finalizing, Done)
        )
    }
}

struct InvocationTracker<'a> {
    resource: &'a str,
    context: &'a Context,
    state: InvocationState,
}

impl<'a> InvocationTracker<'a> {
    fn new(resource: &'a str, context: &'a Context) -> Self {
        Self {
            resource,
            context,
            state: InvocationState::NotStarted,
        }
    }

    fn advance(&mut self, next: InvocationState) -> SyncResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(SyncError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                to: format!("{next:?}"),
            });
        }
        debug!(
            resource = self.resource,
            context = %self.context,
            from = ?self.state,
            to = ?next,
            "invocation transition"
        );
        self.state = next;
        Ok(())
    }
}

/// How a resource ended in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResourceOutcome {
    /// Nothing selected at or below the resource.
    Skipped,
    /// Every invocation completed.
    Completed,
    /// A record limit stopped it cleanly.
    Stopped,
    /// At least one invocation failed.
    Failed,
}

/// Counters of one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    /// Invocations started.
    pub partitions: u64,
    /// Pages fetched.
    pub pages: u64,
    /// RECORD messages emitted.
    pub records_emitted: u64,
    /// Records dropped for being older than the emission floor.
    pub records_filtered: u64,
    /// Requests sent, retries included.
    pub requests: u64,
    /// Retries.
    pub retries: u64,
    /// Soft failures.
    pub soft_failures: u64,
    /// Time spent waiting on the rate limiter.
    pub rate_limit_wait: Duration,
}

/// Result of one resource in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSummary {
    /// Final outcome.
    pub outcome: ResourceOutcome,
    /// Errors of failed invocations.
    pub errors: Vec<String>,
    /// Counters.
    pub stats: ResourceStats,
}

impl Default for ResourceSummary {
    fn default() -> Self {
        Self {
            outcome: ResourceOutcome::Skipped,
            errors: Vec::new(),
            stats: ResourceStats::default(),
        }
    }
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time.
    pub finished_at: DateTime<Utc>,
    /// Whether the run-wide record limit ended the run.
    pub stopped_by_limit: bool,
    /// Per-resource results.
    pub resources: BTreeMap<String, ResourceSummary>,
}

impl RunSummary {
    /// Returns true if any resource failed.
    pub fn has_failures(&self) -> bool {
        self.resources
            .values()
            .any(|r| r.outcome == ResourceOutcome::Failed)
    }

    /// Names of failed resources.
    pub fn failed_resources(&self) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, r)| r.outcome == ResourceOutcome::Failed)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Outcome of `resource`.
    pub fn outcome(&self, resource: &str) -> Option<ResourceOutcome> {
        self.resources.get(resource).map(|r| r.outcome)
    }

    /// RECORD messages emitted for `resource`.
    pub fn records_emitted(&self, resource: &str) -> u64 {
        self.resources
            .get(resource)
            .map_or(0, |r| r.stats.records_emitted)
    }

    /// RECORD messages emitted in total.
    pub fn total_records(&self) -> u64 {
        self.resources.values().map(|r| r.stats.records_emitted).sum()
    }
}

#[derive(Debug, Default)]
struct RunTracker {
    total_emitted: u64,
    pages_since_state: u64,
    resources: BTreeMap<String, ResourceSummary>,
}

impl RunTracker {
    fn entry(&mut self, resource: &str) -> &mut ResourceSummary {
        self.resources.entry(resource.to_string()).or_default()
    }

    fn raise(&mut self, resource: &str, outcome: ResourceOutcome) {
        let entry = self.entry(resource);
        entry.outcome = entry.outcome.max(outcome);
    }

    fn emitted(&self, resource: &str) -> u64 {
        self.resources
            .get(resource)
            .map_or(0, |r| r.stats.records_emitted)
    }
}

/// Floors of one incremental partition.
struct Floors {
    committed: Option<Value>,
    emission: Option<Value>,
    request: Option<Value>,
}

/// Extracts resources from an API into a message sink.
pub struct SyncEngine<S: MessageSink> {
    graph: Arc<ResourceGraph>,
    selection: Selection,
    config: EngineConfig,
    client: Arc<dyn HttpClient>,
    api: ApiConfig,
    clock: Arc<dyn Clock>,
    fetcher: Arc<Fetcher>,
    limiters: HashMap<String, Arc<RateLimiter>>,
    store: Arc<dyn CheckpointStore>,
    sink: S,
    tracker: RunTracker,
}

impl<S: MessageSink> SyncEngine<S> {
    /// Creates an engine using the system clock and the graph's default selection.
    pub fn new(
        graph: ResourceGraph,
        config: EngineConfig,
        client: Arc<dyn HttpClient>,
        api: ApiConfig,
        store: Arc<dyn CheckpointStore>,
        sink: S,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let selection = graph.default_selection();
        let graph = Arc::new(graph);
        let fetcher = Arc::new(Fetcher::new(
            Arc::clone(&client),
            api.clone(),
            config.retry.clone(),
            Arc::clone(&clock),
        ));
        let limiters = build_limiters(&graph, &clock);
        Self {
            graph,
            selection,
            config,
            client,
            api,
            clock,
            fetcher,
            limiters,
            store,
            sink,
            tracker: RunTracker::default(),
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self.fetcher = Arc::new(Fetcher::new(
            Arc::clone(&self.client),
            self.api.clone(),
            self.config.retry.clone(),
            Arc::clone(&self.clock),
        ));
        self.limiters = build_limiters(&self.graph, &self.clock);
        self
    }

    /// Replaces the selection.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// The resource graph.
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// The active selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The checkpoint store.
    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the engine, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs one extraction over every root resource.
    ///
    /// Fatal errors of individual resources are reported in the summary and
    /// do not end the run. Errors returned here come from the sink or the
    /// checkpoint store.
    pub fn run(&mut self) -> SyncResult<RunSummary> {
        let run_id = Uuid::new_v4();
        let started_at = self.clock.now();
        self.tracker = RunTracker::default();
        info!(%run_id, "starting extraction run");

        let graph = Arc::clone(&self.graph);
        for resource in graph.resources() {
            self.tracker.entry(&resource.name);
            if self.selection.is_selected(&resource.name) {
                self.sink.emit(Message::schema(
                    resource.name.clone(),
                    &resource.schema,
                    &resource.primary_keys,
                    resource.replication_key.as_deref(),
                ))?;
            }
        }

        let mut stopped_by_limit = false;
        for root in graph.roots() {
            if !graph.needs_traversal(&root.name, &self.selection) {
                debug!(resource = %root.name, "nothing selected, skipping");
                continue;
            }
            info!(resource = %root.name, "syncing root resource");
            let result = self.sync_partition(root, &Context::root(), None);
            match self.settle(root, result) {
                Ok(()) => self.emit_state()?,
                Err(e) if e.is_run_limit() => {
                    info!(resource = %root.name, "run record limit reached, stopping");
                    stopped_by_limit = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        self.emit_state()?;
        let finished_at = self.clock.now();
        let summary = self.summary(run_id, started_at, finished_at, stopped_by_limit);
        info!(
            %run_id,
            records = summary.total_records(),
            failed = ?summary.failed_resources(),
            "extraction run finished"
        );
        Ok(summary)
    }

    fn summary(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        stopped_by_limit: bool,
    ) -> RunSummary {
        let mut resources = self.tracker.resources.clone();
        for (name, summary) in resources.iter_mut() {
            let fetched = self.fetcher.stats_for(name);
            summary.stats.requests = fetched.requests;
            summary.stats.retries = fetched.retries;
            summary.stats.soft_failures = fetched.soft_failures;
            if let Some(limiter) = self.limiters.get(name) {
                summary.stats.rate_limit_wait = limiter.stats().waited;
            }
        }
        RunSummary {
            run_id,
            started_at,
            finished_at,
            stopped_by_limit,
            resources,
        }
    }

    /// Records the outcome of an invocation of `resource`.
    ///
    /// Own record limits and resource failures are absorbed; the run-wide
    /// limit and sink or store errors are passed on.
    fn settle(&mut self, resource: &ResourceDescriptor, result: SyncResult<()>) -> SyncResult<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_resource_limit(&resource.name) => {
                info!(resource = %resource.name, "resource record limit reached");
                self.tracker.raise(&resource.name, ResourceOutcome::Stopped);
                Ok(())
            }
            Err(e) if is_resource_failure(&e) => {
                error!(resource = %resource.name, error = %e, "resource invocation failed");
                self.tracker.raise(&resource.name, ResourceOutcome::Failed);
                self.tracker.entry(&resource.name).errors.push(e.to_string());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn check_limits(&self, resource: &ResourceDescriptor) -> SyncResult<()> {
        if let Some(limit) = self.config.record_limit {
            if self.tracker.total_emitted >= limit {
                return Err(SyncError::LimitExceeded {
                    resource: None,
                    limit,
                });
            }
        }
        if let Some(limit) = self.config.resource_record_limit {
            if self.tracker.emitted(&resource.name) >= limit {
                return Err(SyncError::LimitExceeded {
                    resource: Some(resource.name.clone()),
                    limit,
                });
            }
        }
        Ok(())
    }

    fn limiter(&self, resource: &ResourceDescriptor) -> Arc<RateLimiter> {
        self.limiters
            .get(&resource.name)
            .cloned()
            .unwrap_or_else(|| Arc::new(RateLimiter::per_minute(0, Arc::clone(&self.clock))))
    }

    fn floors(&self, resource: &ResourceDescriptor, prior: Option<&PartitionState>) -> Floors {
        if !resource.is_incremental() {
            return Floors {
                committed: None,
                emission: None,
                request: None,
            };
        }

        let committed = prior.and_then(|p| p.replication_value.clone());
        let emission = committed.clone().or_else(|| {
            self.config
                .start_date
                .map(|start| resource.replication_format.render(start))
        });
        let request = match (&emission, resource.lookback) {
            (Some(floor), Some(lookback)) => {
                let lookback =
                    chrono::Duration::from_std(lookback).unwrap_or(chrono::Duration::zero());
                let lookback_floor = resource
                    .replication_format
                    .render(self.clock.now() - lookback);
                if compare_replication_values(&lookback_floor, floor) == Ordering::Less {
                    Some(lookback_floor)
                } else {
                    Some(floor.clone())
                }
            }
            (floor, _) => floor.clone(),
        };

        Floors {
            committed,
            emission,
            request,
        }
    }

    fn sync_partition(
        &mut self,
        resource: &ResourceDescriptor,
        context: &Context,
        side_channel: Option<&Record>,
    ) -> SyncResult<()> {
        if resource.is_virtual() {
            return self.sync_virtual(resource, context, side_channel);
        }

        self.check_limits(resource)
            .map_err(|stop| self.stopped(resource, stop))?;
        let mut invocation = InvocationTracker::new(&resource.name, context);
        self.tracker.raise(&resource.name, ResourceOutcome::Completed);
        self.tracker.entry(&resource.name).stats.partitions += 1;

        let prior = self.store.get(&resource.name, context);
        let floors = self.floors(resource, prior.as_ref());
        let (mut token, mut progress) = match prior {
            Some(p) if p.is_resumable() => {
                info!(resource = %resource.name, %context, "resuming from saved page token");
                (p.page_token, p.progress_value)
            }
            _ => (None, None),
        };

        let fetcher = Arc::clone(&self.fetcher);
        let limiter = self.limiter(resource);
        let hook = HookContext {
            resource: &resource.name,
            context,
            request_floor: floors.request.as_ref(),
            api: &fetcher,
            limiter: &limiter,
        };
        let params = resource.hooks.url_params(&hook);
        let mut paginator = resource.paginator.build(Arc::clone(&limiter));
        debug!(
            resource = %resource.name,
            %context,
            emission_floor = ?floors.emission,
            request_floor = ?floors.request,
            "starting invocation"
        );

        loop {
            invocation.advance(InvocationState::FetchingPage)?;
            if let Err(stop) = self.check_limits(resource) {
                self.save_stopped(resource, context, &floors, token, progress)?;
                invocation.advance(InvocationState::Done)?;
                return Err(self.stopped(resource, stop));
            }

            // Pages that reach the paginator are paced by it; failed fetches
            // are paced here.
            let outcome = match fetcher.fetch_page(resource, &params, token.as_ref()) {
                Ok(outcome) => outcome,
                Err(e) => {
                    limiter.acquire();
                    invocation.advance(InvocationState::Done)?;
                    return Err(e);
                }
            };
            let (records, body) = match outcome {
                FetchOutcome::Page { records, body } => (records, body),
                FetchOutcome::SoftFailure { code } if token.is_some() => {
                    limiter.acquire();
                    warn!(
                        resource = %resource.name,
                        %context,
                        %code,
                        "soft error after first page, keeping partition resumable"
                    );
                    self.save_stopped(resource, context, &floors, token, progress)?;
                    invocation.advance(InvocationState::Done)?;
                    return Ok(());
                }
                FetchOutcome::SoftFailure { code } => {
                    limiter.acquire();
                    warn!(
                        resource = %resource.name,
                        %context,
                        %code,
                        "ending partition after soft error"
                    );
                    invocation.advance(InvocationState::Finalizing)?;
                    break;
                }
            };

            invocation.advance(InvocationState::ProcessingPage)?;
            let mut page_max = None;
            for raw in records {
                match self.process_record(resource, context, &hook, &floors, raw) {
                    Ok(value) => page_max = max_replication_value(page_max, value),
                    Err(e) => {
                        invocation.advance(InvocationState::Done)?;
                        if is_resource_failure(&e) {
                            return Err(e);
                        }
                        self.save_stopped(resource, context, &floors, token, progress)?;
                        return Err(self.stopped(resource, e));
                    }
                }
            }

            let next = paginator.next_token(&body);
            progress = max_replication_value(progress, page_max);
            self.sink.flush()?;
            self.store.set(
                &resource.name,
                context,
                PartitionState {
                    page_token: next.clone(),
                    replication_key: resource.replication_key.clone(),
                    replication_value: floors.committed.clone(),
                    progress_value: progress.clone(),
                    finalized: false,
                },
            )?;
            self.page_done(resource)?;

            match next {
                Some(next) => token = Some(next),
                None => {
                    invocation.advance(InvocationState::Finalizing)?;
                    break;
                }
            }
        }

        let replication_value = if resource.is_incremental() {
            max_replication_value(floors.committed, progress)
        } else {
            None
        };
        self.store.set(
            &resource.name,
            context,
            PartitionState {
                page_token: None,
                replication_key: resource.replication_key.clone(),
                replication_value,
                progress_value: None,
                finalized: false,
            },
        )?;
        self.store.finalize(&resource.name, context)?;
        invocation.advance(InvocationState::Done)?;
        debug!(resource = %resource.name, %context, "partition finalized");
        Ok(())
    }

    /// Processes one raw record and returns its replication value if it was kept.
    fn process_record(
        &mut self,
        resource: &ResourceDescriptor,
        context: &Context,
        hook: &HookContext<'_>,
        floors: &Floors,
        raw: Value,
    ) -> SyncResult<Option<Value>> {
        let Some(record) = resource.hooks.post_process(raw, hook)? else {
            return Ok(None);
        };
        let (record, dropped) = resource.schema.conform(record);
        if !dropped.is_empty() {
            debug!(resource = %resource.name, fields = ?dropped, "dropped fields outside schema");
        }

        let value = resource
            .replication_key
            .as_ref()
            .and_then(|key| record.get(key))
            .filter(|v| !v.is_null())
            .cloned();
        let above_floor = match (&floors.emission, &value) {
            (Some(floor), Some(v)) => compare_replication_values(v, floor) != Ordering::Less,
            _ => true,
        };

        let graph = Arc::clone(&self.graph);
        if above_floor {
            if self.selection.is_selected(&resource.name) {
                self.emit_record(resource, record.clone())?;
            }

            let children: Vec<&ResourceDescriptor> = graph
                .children_of(&resource.name)
                .filter(|child| graph.needs_traversal(&child.name, &self.selection))
                .collect();
            if !children.is_empty() {
                if let Some(child_context) = resource.hooks.child_context(&record, context) {
                    for child in children {
                        let result = self.sync_partition(child, &child_context, Some(&record));
                        self.settle(child, result)?;
                    }
                }
            }
        } else {
            debug!(resource = %resource.name, value = ?value, "record below emission floor");
            self.tracker.entry(&resource.name).stats.records_filtered += 1;
        }

        for call in resource.hooks.auxiliary_calls(&record, above_floor, hook) {
            if !graph.is_auxiliary_edge(&resource.name, &call.target) {
                return Err(SyncError::InvalidGraph(format!(
                    "{} invoked undeclared auxiliary {}",
                    resource.name, call.target
                )));
            }
            if !graph.needs_traversal(&call.target, &self.selection) {
                continue;
            }
            if let Some(target) = graph.get(&call.target) {
                let result = self.sync_partition(target, &call.context, call.side_channel.as_ref());
                self.settle(target, result)?;
            }
        }

        Ok(if above_floor { value } else { None })
    }

    /// Marks `resource` stopped when `err` is a record limit, passing `err` on.
    fn stopped(&mut self, resource: &ResourceDescriptor, err: SyncError) -> SyncError {
        if matches!(err, SyncError::LimitExceeded { .. }) {
            self.tracker.raise(&resource.name, ResourceOutcome::Stopped);
        }
        err
    }

    fn sync_virtual(
        &mut self,
        resource: &ResourceDescriptor,
        context: &Context,
        side_channel: Option<&Record>,
    ) -> SyncResult<()> {
        self.check_limits(resource)
            .map_err(|stop| self.stopped(resource, stop))?;
        let mut invocation = InvocationTracker::new(&resource.name, context);
        self.tracker.raise(&resource.name, ResourceOutcome::Completed);
        self.tracker.entry(&resource.name).stats.partitions += 1;

        invocation.advance(InvocationState::ProcessingPage)?;
        for record in resource.hooks.derive_records(context, side_channel) {
            let (record, _) = resource.schema.conform(record);
            if self.selection.is_selected(&resource.name) {
                self.emit_record(resource, record)?;
            }
        }
        invocation.advance(InvocationState::Done)
    }

    /// Saves the safest position of a partition that ends before its last
    /// page, either on a record limit or on a soft error past the first page.
    ///
    /// Sorted incremental partitions commit their progress. Everything else
    /// keeps the pending page token and its previous committed value, and
    /// stays unfinalized so the next run resumes at that page. A limit hit
    /// inside a child leaves the parent on the page being processed, so its
    /// records before the stop are emitted again on resume.
    fn save_stopped(
        &mut self,
        resource: &ResourceDescriptor,
        context: &Context,
        floors: &Floors,
        token: Option<PageToken>,
        progress: Option<Value>,
    ) -> SyncResult<()> {
        if token.is_none() && progress.is_none() {
            return Ok(());
        }
        self.sink.flush()?;

        if resource.is_incremental() && resource.sorted {
            self.store.set(
                &resource.name,
                context,
                PartitionState {
                    page_token: None,
                    replication_key: resource.replication_key.clone(),
                    replication_value: max_replication_value(floors.committed.clone(), progress),
                    progress_value: None,
                    finalized: false,
                },
            )?;
            return self.store.finalize(&resource.name, context);
        }

        self.store.set(
            &resource.name,
            context,
            PartitionState {
                page_token: token,
                replication_key: resource.replication_key.clone(),
                replication_value: floors.committed.clone(),
                progress_value: progress,
                finalized: false,
            },
        )
    }

    fn emit_record(&mut self, resource: &ResourceDescriptor, record: Record) -> SyncResult<()> {
        self.sink
            .emit(Message::record(resource.name.clone(), record, self.clock.now()))?;
        self.tracker.total_emitted += 1;
        self.tracker.entry(&resource.name).stats.records_emitted += 1;
        Ok(())
    }

    fn page_done(&mut self, resource: &ResourceDescriptor) -> SyncResult<()> {
        self.tracker.entry(&resource.name).stats.pages += 1;
        self.tracker.pages_since_state += 1;
        if self.tracker.pages_since_state >= self.config.state_interval_pages {
            self.emit_state()?;
        }
        Ok(())
    }

    /// Flushes, emits a STATE message with the current snapshot and persists it.
    fn emit_state(&mut self) -> SyncResult<()> {
        self.sink.flush()?;
        self.sink.emit(Message::state(self.store.snapshot()))?;
        self.sink.flush()?;
        self.store.persist()?;
        self.tracker.pages_since_state = 0;
        Ok(())
    }
}

fn build_limiters(
    graph: &ResourceGraph,
    clock: &Arc<dyn Clock>,
) -> HashMap<String, Arc<RateLimiter>> {
    graph
        .resources()
        .iter()
        .map(|r| {
            (
                r.name.clone(),
                Arc::new(RateLimiter::per_minute(
                    r.max_requests_per_minute,
                    Arc::clone(clock),
                )),
            )
        })
        .collect()
}

/// Errors that fail one resource invocation without ending the run.
fn is_resource_failure(err: &SyncError) -> bool {
    matches!(
        err,
        SyncError::Retriable { .. }
            | SyncError::Fatal { .. }
            | SyncError::RetriesExhausted { .. }
            | SyncError::Protocol(_)
            | SyncError::InvalidGraph(_)
            | SyncError::Json(_)
    )
}
