//! Configuration for the extraction engine.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Body-level error codes that abort a resource even on HTTP 200.
pub const DEFAULT_FATAL_ERROR_CODES: &[&str] = &[
    "invalid_auth",
    "not_authed",
    "account_inactive",
    "token_revoked",
    "token_expired",
    "missing_scope",
    "no_permission",
];

/// Configuration for an extraction run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Floor for incremental resources without a persisted position.
    pub start_date: Option<DateTime<Utc>>,
    /// Stop the whole run after this many emitted records.
    pub record_limit: Option<u64>,
    /// Stop each resource after this many emitted records.
    pub resource_record_limit: Option<u64>,
    /// Emit a STATE message every this many pages fetched during the run.
    pub state_interval_pages: u64,
    /// Retry configuration.
    pub retry: RetryConfig,
}

impl EngineConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self {
            start_date: None,
            record_limit: None,
            resource_record_limit: None,
            state_interval_pages: 10,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the initial incremental floor.
    pub fn with_start_date(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    /// Sets the run-wide record limit.
    pub fn with_record_limit(mut self, limit: u64) -> Self {
        self.record_limit = Some(limit);
        self
    }

    /// Sets the per-resource record limit.
    pub fn with_resource_record_limit(mut self, limit: u64) -> Self {
        self.resource_record_limit = Some(limit);
        self
    }

    /// Sets how often STATE messages are emitted.
    pub fn with_state_interval_pages(mut self, pages: u64) -> Self {
        self.state_interval_pages = pages.max(1);
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How requests reach the API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Bearer token sent on every request.
    pub bearer_token: String,
    /// Query parameters added to every request.
    pub global_params: Vec<(String, String)>,
    /// Name of the page size query parameter.
    pub page_size_param: String,
    /// Body-level error codes classified as fatal.
    pub fatal_error_codes: Vec<String>,
}

impl ApiConfig {
    /// Creates an API configuration.
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
            global_params: Vec::new(),
            page_size_param: "limit".into(),
            fatal_error_codes: DEFAULT_FATAL_ERROR_CODES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }

    /// Adds a query parameter sent on every request.
    pub fn with_global_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.global_params.push((key.into(), value.into()));
        self
    }

    /// Replaces the fatal error codes.
    pub fn with_fatal_error_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fatal_error_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if `code` aborts a resource.
    pub fn is_fatal_code(&self, code: &str) -> bool {
        self.fatal_error_codes.iter().any(|c| c == code)
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(15),
            backoff_multiplier: 2.0,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        Duration::from_secs_f64(base_delay.min(self.max_delay.as_secs_f64()))
    }

    /// Delay before `attempt`, raised to a server-provided `Retry-After` but
    /// never above `max_delay`.
    pub fn delay_with_hint(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.delay_for_attempt(attempt);
        match retry_after {
            Some(hint) => backoff.max(hint.min(self.max_delay)),
            None => backoff,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn engine_config_builder() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let config = EngineConfig::new()
            .with_start_date(start)
            .with_record_limit(100)
            .with_resource_record_limit(10)
            .with_state_interval_pages(0)
            .with_retry(RetryConfig::no_retry());

        assert_eq!(config.start_date, Some(start));
        assert_eq!(config.record_limit, Some(100));
        assert_eq!(config.resource_record_limit, Some(10));
        assert_eq!(config.state_interval_pages, 1);
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn api_config_defaults() {
        let api = ApiConfig::new("https://slack.com/api/", "xoxb-1").with_global_param("team_id", "T1");

        assert_eq!(api.base_url, "https://slack.com/api");
        assert_eq!(api.page_size_param, "limit");
        assert!(api.is_fatal_code("invalid_auth"));
        assert!(api.is_fatal_code("missing_scope"));
        assert!(!api.is_fatal_code("not_in_channel"));
        assert_eq!(api.global_params, vec![("team_id".into(), "T1".into())]);
    }

    #[test]
    fn retry_delay_calculation() {
        let config = RetryConfig::default();

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(15));

        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(15));
        assert_eq!(config.delay_for_attempt(9), Duration::from_secs(15));
    }

    #[test]
    fn retry_after_hint_is_capped() {
        let config = RetryConfig::default();

        assert_eq!(
            config.delay_with_hint(1, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        assert_eq!(
            config.delay_with_hint(1, Some(Duration::from_secs(120))),
            Duration::from_secs(15)
        );
        assert_eq!(config.delay_with_hint(3, None), Duration::from_secs(4));
    }
}
