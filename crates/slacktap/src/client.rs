//! Blocking HTTP client for the Slack Web API.

use crate::error::{TapError, TapResult};
use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use slacktap_engine::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use std::time::Duration;

/// Request timeout used by [`ReqwestClient::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// [`HttpClient`] backed by `reqwest`'s blocking client.
///
/// GET parameters go into the query string, POST parameters into a form
/// body. Authentication is a bearer token.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new() -> TapResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> TapResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("slacktap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TapError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url).query(&request.params),
            HttpMethod::Post => self.client.post(&request.url).form(&request.params),
        };
        let response = builder
            .bearer_auth(&request.bearer_token)
            .send()
            .map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(
            response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        let body = response.text().map_err(|e| e.to_string())?;
        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// Parses a `Retry-After` header given in seconds.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value?.trim().parse::<u64>().ok().map(Duration::from_secs)
}
