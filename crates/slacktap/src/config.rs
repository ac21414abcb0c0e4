//! Tap configuration.
//!
//! Loaded from a JSON file:
//!
//! ```json
//! {
//!   "api_key": "xoxb-…",
//!   "start_date": "2024-01-01T00:00:00Z",
//!   "channel_types": ["public_channel", "private_channel"],
//!   "auto_join_channels": true
//! }
//! ```

use crate::error::{TapError, TapResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slacktap_engine::ApiConfig;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Conversation types accepted in `channel_types`.
pub const CHANNEL_TYPES: &[&str] = &["public_channel", "private_channel", "mpim", "im"];

/// Default Slack Web API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

/// Configuration of the Slack tap.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TapConfig {
    /// Bot or user token.
    pub api_key: String,
    /// Earliest message date to extract.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Days to look back for new thread replies to older messages.
    #[serde(default = "default_thread_lookback_days")]
    pub thread_lookback_days: u32,
    /// Conversation types to extract.
    #[serde(default = "default_channel_types")]
    pub channel_types: Vec<String>,
    /// Join public channels the bot is not a member of.
    #[serde(default)]
    pub auto_join_channels: bool,
    /// Channel ids to extract; all when absent.
    #[serde(default)]
    pub selected_channels: Option<Vec<String>>,
    /// Channel ids never to extract. Wins over `selected_channels`.
    #[serde(default)]
    pub excluded_channels: Option<Vec<String>>,
    /// Include streams that need admin scopes.
    #[serde(default)]
    pub include_admin_streams: bool,
    /// Workspace of an Enterprise Grid organization.
    #[serde(default)]
    pub team_id: String,
    /// API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Records per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_thread_lookback_days() -> u32 {
    1
}

fn default_channel_types() -> Vec<String> {
    vec!["public_channel".to_string()]
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_page_size() -> u32 {
    500
}

impl TapConfig {
    /// Creates a configuration with defaults for everything but the token.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            start_date: None,
            thread_lookback_days: default_thread_lookback_days(),
            channel_types: default_channel_types(),
            auto_join_channels: false,
            selected_channels: None,
            excluded_channels: None,
            include_admin_streams: false,
            team_id: String::new(),
            api_base_url: default_api_base_url(),
            page_size: default_page_size(),
        }
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> TapResult<Self> {
        let config: TapConfig =
            serde_json::from_str(json).map_err(|e| TapError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> TapResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Sets the start date.
    pub fn with_start_date(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    /// Sets the thread lookback in days.
    pub fn with_thread_lookback_days(mut self, days: u32) -> Self {
        self.thread_lookback_days = days;
        self
    }

    /// Sets the conversation types.
    pub fn with_channel_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channel_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Enables joining channels the bot is not a member of.
    pub fn with_auto_join(mut self, enabled: bool) -> Self {
        self.auto_join_channels = enabled;
        self
    }

    /// Restricts extraction to `channels`.
    pub fn with_selected_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_channels = Some(channels.into_iter().map(Into::into).collect());
        self
    }

    /// Excludes `channels` from extraction.
    pub fn with_excluded_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_channels = Some(channels.into_iter().map(Into::into).collect());
        self
    }

    /// Includes the admin-only streams.
    pub fn with_admin_streams(mut self, enabled: bool) -> Self {
        self.include_admin_streams = enabled;
        self
    }

    /// Sets the workspace id.
    pub fn with_team_id(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = team_id.into();
        self
    }

    /// Sets the API base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::Config`] if:
    /// - `api_key` is empty
    /// - `channel_types` is empty or names an unknown type
    /// - `page_size` is zero
    /// - `api_base_url` is not an http(s) URL
    pub fn validate(&self) -> TapResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(TapError::Config("api_key is required".into()));
        }
        if self.channel_types.is_empty() {
            return Err(TapError::Config("channel_types cannot be empty".into()));
        }
        if let Some(unknown) = self
            .channel_types
            .iter()
            .find(|t| !CHANNEL_TYPES.contains(&t.as_str()))
        {
            return Err(TapError::Config(format!(
                "unknown channel type {unknown}, expected one of {}",
                CHANNEL_TYPES.join(", ")
            )));
        }
        if self.page_size == 0 {
            return Err(TapError::Config("page_size must be positive".into()));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(TapError::Config(format!(
                "api_base_url must be an http(s) URL, got {}",
                self.api_base_url
            )));
        }
        Ok(())
    }

    /// Lookback window for messages and threads.
    pub fn thread_lookback(&self) -> Duration {
        Duration::from_secs(u64::from(self.thread_lookback_days) * 86_400)
    }

    /// Returns true if the channel passes the allow and deny lists.
    pub fn is_channel_selected(&self, channel_id: &str) -> bool {
        if let Some(excluded) = &self.excluded_channels {
            if excluded.iter().any(|c| c == channel_id) {
                return false;
            }
        }
        match &self.selected_channels {
            Some(selected) => selected.iter().any(|c| c == channel_id),
            None => true,
        }
    }

    /// The engine's API configuration.
    pub fn api_config(&self) -> ApiConfig {
        let api = ApiConfig::new(self.api_base_url.clone(), self.api_key.clone());
        if self.team_id.is_empty() {
            api
        } else {
            api.with_global_param("team_id", self.team_id.clone())
        }
    }
}

impl fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TapConfig")
            .field("api_key", &"<redacted>")
            .field("start_date", &self.start_date)
            .field("thread_lookback_days", &self.thread_lookback_days)
            .field("channel_types", &self.channel_types)
            .field("auto_join_channels", &self.auto_join_channels)
            .field("selected_channels", &self.selected_channels)
            .field("excluded_channels", &self.excluded_channels)
            .field("include_admin_streams", &self.include_admin_streams)
            .field("team_id", &self.team_id)
            .field("api_base_url", &self.api_base_url)
            .field("page_size", &self.page_size)
            .finish()
    }
}
