//! HTTP client abstraction.
//!
//! The engine never talks to the network directly. It hands an
//! [`HttpRequest`] to an [`HttpClient`] and classifies the
//! [`HttpResponse`] it gets back. Implement this trait to provide the
//! actual HTTP transport (the `slacktap` crate ships a blocking reqwest
//! client); [`MockHttpClient`] serves scripted responses for tests.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET with query parameters.
    Get,
    /// POST with form-encoded parameters.
    Post,
}

/// A request to the API.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Endpoint path relative to the base URL (e.g. `/conversations.list`).
    pub path: String,
    /// Query (GET) or form (POST) parameters, in order.
    pub params: Vec<(String, String)>,
    /// Bearer token for the `Authorization` header.
    pub bearer_token: String,
}

impl HttpRequest {
    /// Returns the first parameter named `key`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A raw response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed `Retry-After` header, if present.
    pub retry_after: Option<Duration>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// A 200 response with `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    /// A response with an arbitrary status.
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    /// Attaches a `Retry-After` hint.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

/// HTTP client abstraction.
///
/// A transport-level failure (connection refused, timeout) is returned as
/// `Err(message)` and treated as retriable.
pub trait HttpClient: Send + Sync {
    /// Executes a request.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

type Outcome = Result<HttpResponse, String>;

/// A scripted client for tests.
///
/// Responses are queued per endpoint path, optionally narrowed to requests
/// carrying a given parameter value. When a queue holds a single response
/// it is served repeatedly; otherwise responses are served in order. Every
/// executed request is recorded.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    routes: Mutex<HashMap<RouteKey, VecDeque<Outcome>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    path: String,
    param: Option<(String, String)>,
}

impl MockHttpClient {
    /// Creates an empty mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for every request to `path`.
    pub fn respond(&self, path: &str, response: HttpResponse) -> &Self {
        self.push(
            RouteKey {
                path: path.into(),
                param: None,
            },
            Ok(response),
        );
        self
    }

    /// Queues a JSON body with status 200 for `path`.
    pub fn respond_json(&self, path: &str, body: serde_json::Value) -> &Self {
        self.respond(path, HttpResponse::ok(body.to_string()))
    }

    /// Queues a response for requests to `path` whose `key` parameter equals `value`.
    pub fn respond_when(
        &self,
        path: &str,
        key: &str,
        value: &str,
        response: HttpResponse,
    ) -> &Self {
        self.push(
            RouteKey {
                path: path.into(),
                param: Some((key.into(), value.into())),
            },
            Ok(response),
        );
        self
    }

    /// Queues a JSON body with status 200 for a parameter-narrowed route.
    pub fn respond_json_when(
        &self,
        path: &str,
        key: &str,
        value: &str,
        body: serde_json::Value,
    ) -> &Self {
        self.respond_when(path, key, value, HttpResponse::ok(body.to_string()))
    }

    /// Queues a transport failure for `path`.
    pub fn fail(&self, path: &str, message: &str) -> &Self {
        self.push(
            RouteKey {
                path: path.into(),
                param: None,
            },
            Err(message.into()),
        );
        self
    }

    /// All requests executed so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests executed against `path`.
    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    fn push(&self, key: RouteKey, outcome: Outcome) {
        self.routes.lock().entry(key).or_default().push_back(outcome);
    }

    fn take(queue: &mut VecDeque<Outcome>) -> Option<Outcome> {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl HttpClient for MockHttpClient {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        self.requests.lock().push(request.clone());

        let mut routes = self.routes.lock();
        let narrowed = request.params.iter().find_map(|(k, v)| {
            let key = RouteKey {
                path: request.path.clone(),
                param: Some((k.clone(), v.clone())),
            };
            routes.contains_key(&key).then_some(key)
        });
        let key = narrowed.unwrap_or(RouteKey {
            path: request.path.clone(),
            param: None,
        });

        routes
            .get_mut(&key)
            .and_then(Self::take)
            .unwrap_or_else(|| {
                Ok(HttpResponse::with_status(
                    404,
                    format!("no mock response for {}", request.path),
                ))
            })
    }
}
