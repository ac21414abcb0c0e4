//! Resource fetching.
//!
//! One request per page: the fetcher builds the request from the resource
//! descriptor, the partition's parameters and the page token, runs it
//! through the [`HttpClient`], classifies the response and retries
//! transient failures with exponential backoff.
//!
//! Classification:
//!
//! | response                                     | class     |
//! |----------------------------------------------|-----------|
//! | transport failure, 429, 5xx                  | retriable |
//! | other 4xx                                    | fatal     |
//! | 2xx, `ok: false`, code in the fatal set      | fatal     |
//! | 2xx, `ok: false`, any other code             | soft      |
//! | 2xx, body is not JSON                        | fatal     |
//!
//! Soft failures are not errors: the page is skipped and the partition
//! ends normally.

use crate::clock::Clock;
use crate::config::{ApiConfig, RetryConfig};
use crate::error::{SyncError, SyncResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::resource::{Endpoint, ResourceDescriptor};
use parking_lot::Mutex;
use serde_json::Value;
use slacktap_protocol::PageToken;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of fetching one page.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The page was retrieved.
    Page {
        /// Raw records found at the resource's records path.
        records: Vec<Value>,
        /// Full response body, for pagination.
        body: Value,
    },
    /// The API reported a non-fatal error; the page is skipped.
    SoftFailure {
        /// Body-level error code.
        code: String,
    },
}

/// Classification of a single response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseClass {
    /// Usable body.
    Success(Value),
    /// Body-level error that does not abort extraction.
    Soft(String),
}

/// Classifies a raw response.
///
/// Returns the body or soft-failure code on success, a retriable or fatal
/// [`SyncError`] otherwise.
pub fn classify_response(response: &HttpResponse, api: &ApiConfig) -> SyncResult<ResponseClass> {
    let status = response.status;
    if status == 429 || status >= 500 {
        return Err(SyncError::Retriable {
            status: Some(status),
            message: truncate(&response.body),
        });
    }
    if status >= 400 {
        return Err(SyncError::fatal_status(status, truncate(&response.body)));
    }

    let body: Value = serde_json::from_str(&response.body).map_err(|e| SyncError::Fatal {
        status,
        code: None,
        message: format!("unparseable response body: {e}"),
    })?;

    if body.get("ok").and_then(Value::as_bool) == Some(false) {
        let code = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        if api.is_fatal_code(&code) {
            return Err(SyncError::fatal_code(status, code));
        }
        return Ok(ResponseClass::Soft(code));
    }

    Ok(ResponseClass::Success(body))
}

fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Request counters of one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Requests sent, retries included.
    pub requests: u64,
    /// Retries after retriable failures.
    pub retries: u64,
    /// Soft failures.
    pub soft_failures: u64,
    /// Time spent in retry backoff.
    pub backoff: Duration,
}

/// Issues requests and classifies their responses.
pub struct Fetcher {
    client: Arc<dyn HttpClient>,
    api: ApiConfig,
    retry: RetryConfig,
    clock: Arc<dyn Clock>,
    stats: Mutex<HashMap<String, FetchStats>>,
}

impl Fetcher {
    /// Creates a fetcher.
    pub fn new(
        client: Arc<dyn HttpClient>,
        api: ApiConfig,
        retry: RetryConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            api,
            retry,
            clock,
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// The API configuration.
    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    /// Counters for `resource`.
    pub fn stats_for(&self, resource: &str) -> FetchStats {
        self.stats.lock().get(resource).copied().unwrap_or_default()
    }

    /// Builds the request for one page of `descriptor`.
    ///
    /// Parameter order: page size, page token, fixed extras, partition
    /// parameters, global parameters.
    pub fn page_request(
        &self,
        descriptor: &ResourceDescriptor,
        endpoint: &Endpoint,
        partition_params: &[(String, String)],
        token: Option<&PageToken>,
    ) -> HttpRequest {
        let mut params = Vec::new();
        if let Some(size) = descriptor.page_size {
            params.push((self.api.page_size_param.clone(), size.to_string()));
        }
        if let (Some(token), Some(param)) = (token, descriptor.paginator.token_param()) {
            params.push((param.to_string(), token.to_string()));
        }
        params.extend(descriptor.extra_params.iter().cloned());
        params.extend(partition_params.iter().cloned());
        self.request(endpoint, params)
    }

    fn request(&self, endpoint: &Endpoint, mut params: Vec<(String, String)>) -> HttpRequest {
        params.extend(self.api.global_params.iter().cloned());
        HttpRequest {
            method: endpoint.method,
            url: format!("{}{}", self.api.base_url, endpoint.path),
            path: endpoint.path.clone(),
            params,
            bearer_token: self.api.bearer_token.clone(),
        }
    }

    /// Fetches one page of `descriptor`.
    pub fn fetch_page(
        &self,
        descriptor: &ResourceDescriptor,
        partition_params: &[(String, String)],
        token: Option<&PageToken>,
    ) -> SyncResult<FetchOutcome> {
        let endpoint = descriptor.endpoint.as_ref().ok_or_else(|| {
            SyncError::InvalidGraph(format!("{} has no endpoint to fetch", descriptor.name))
        })?;
        let request = self.page_request(descriptor, endpoint, partition_params, token);

        match self.execute(&descriptor.name, &request)? {
            ResponseClass::Success(body) => {
                let records = match body.pointer(&descriptor.records_path) {
                    Some(Value::Array(items)) => items.clone(),
                    Some(other) => {
                        debug!(resource = %descriptor.name, found = %other, "records path is not an array");
                        Vec::new()
                    }
                    None => Vec::new(),
                };
                Ok(FetchOutcome::Page { records, body })
            }
            ResponseClass::Soft(code) => Ok(FetchOutcome::SoftFailure { code }),
        }
    }

    /// Sends a single side request (e.g. joining a channel) on behalf of `label`.
    pub fn call(
        &self,
        label: &str,
        endpoint: &Endpoint,
        params: Vec<(String, String)>,
    ) -> SyncResult<FetchOutcome> {
        let request = self.request(endpoint, params);
        match self.execute(label, &request)? {
            ResponseClass::Success(body) => Ok(FetchOutcome::Page {
                records: Vec::new(),
                body,
            }),
            ResponseClass::Soft(code) => Ok(FetchOutcome::SoftFailure { code }),
        }
    }

    /// Runs `request` with retries and classifies the final response.
    fn execute(&self, label: &str, request: &HttpRequest) -> SyncResult<ResponseClass> {
        let mut retry_after = None;
        let mut last_error = None;

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay_with_hint(attempt, retry_after.take());
                warn!(
                    resource = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request to {}",
                    request.path
                );
                self.clock.sleep(delay);
                self.bump(label, |s| {
                    s.retries += 1;
                    s.backoff += delay;
                });
            }

            self.bump(label, |s| s.requests += 1);
            let result = match self.client.execute(request) {
                Ok(response) => {
                    retry_after = response.retry_after;
                    classify_response(&response, &self.api)
                }
                Err(message) => Err(SyncError::transport_retryable(message)),
            };

            match result {
                Ok(ResponseClass::Soft(code)) => {
                    warn!(resource = label, code = %code, "api reported a soft error, skipping page");
                    self.bump(label, |s| s.soft_failures += 1);
                    return Ok(ResponseClass::Soft(code));
                }
                Ok(class) => return Ok(class),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(SyncError::RetriesExhausted {
            attempts: self.retry.max_attempts,
            last: Box::new(
                last_error.unwrap_or_else(|| SyncError::transport_retryable("no attempt made")),
            ),
        })
    }

    fn bump(&self, label: &str, update: impl FnOnce(&mut FetchStats)) {
        let mut stats = self.stats.lock();
        update(stats.entry(label.to_string()).or_default());
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("base_url", &self.api.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
