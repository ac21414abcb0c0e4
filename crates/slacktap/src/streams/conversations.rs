//! Channels and channel members.

use crate::config::TapConfig;
use serde_json::{json, Value};
use slacktap_engine::{Endpoint, FetchOutcome, HookContext, ResourceHooks, SyncResult};
use slacktap_protocol::{Context, Record};
use tracing::{debug, info, warn};

/// Hooks of the `channels` stream.
///
/// Applies the channel allow and deny lists, optionally joins public
/// channels the bot is not a member of, and hands `channel_id` to the
/// per-channel streams.
#[derive(Debug, Clone)]
pub struct ChannelHooks {
    config: TapConfig,
}

impl ChannelHooks {
    /// Creates the hooks for `config`.
    pub fn new(config: TapConfig) -> Self {
        Self { config }
    }

    /// Joins `channel_id`. Soft errors leave the channel as it is; fatal ones
    /// fail the `channels` invocation.
    fn join(&self, channel_id: &str, hook: &HookContext<'_>) -> SyncResult<bool> {
        let params = vec![("channel".to_string(), channel_id.to_string())];
        match hook.call(&Endpoint::post("/conversations.join"), params)? {
            FetchOutcome::Page { .. } => {
                info!(channel = channel_id, "joined channel");
                Ok(true)
            }
            FetchOutcome::SoftFailure { code } => {
                warn!(channel = channel_id, %code, "could not join channel");
                Ok(false)
            }
        }
    }
}

impl ResourceHooks for ChannelHooks {
    fn url_params(&self, _hook: &HookContext<'_>) -> Vec<(String, String)> {
        vec![("types".to_string(), self.config.channel_types.join(","))]
    }

    fn post_process(&self, raw: Value, hook: &HookContext<'_>) -> SyncResult<Option<Record>> {
        let Value::Object(mut record) = raw else {
            return Ok(None);
        };
        let Some(id) = record.get("id").and_then(Value::as_str).map(str::to_string) else {
            debug!("dropping channel without id");
            return Ok(None);
        };
        if !self.config.is_channel_selected(&id) {
            debug!(channel = %id, "channel filtered out by config");
            return Ok(None);
        }

        let is_member = record.get("is_member").and_then(Value::as_bool);
        let is_private = record
            .get("is_private")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if self.config.auto_join_channels
            && is_member == Some(false)
            && !is_private
            && self.join(&id, hook)?
        {
            record.insert("is_member".into(), json!(true));
        }
        Ok(Some(record))
    }

    fn child_context(&self, record: &Record, _context: &Context) -> Option<Context> {
        record
            .get("id")
            .and_then(Value::as_str)
            .map(|id| Context::root().with("channel_id", id))
    }
}

/// Hooks of the `channel_members` stream.
///
/// `conversations.members` returns bare user ids; each becomes a
/// `{channel_id, user_id}` row.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelMemberHooks;

impl ResourceHooks for ChannelMemberHooks {
    fn url_params(&self, hook: &HookContext<'_>) -> Vec<(String, String)> {
        channel_param(hook.context)
    }

    fn post_process(&self, raw: Value, hook: &HookContext<'_>) -> SyncResult<Option<Record>> {
        let Some(user_id) = raw.as_str() else {
            return Ok(None);
        };
        let mut record = Record::new();
        record.insert(
            "channel_id".into(),
            json!(hook.context.get_str("channel_id").unwrap_or_default()),
        );
        record.insert("user_id".into(), json!(user_id));
        Ok(Some(record))
    }
}

pub(crate) fn channel_param(context: &Context) -> Vec<(String, String)> {
    context
        .get_str("channel_id")
        .map(|id| vec![("channel".to_string(), id.to_string())])
        .unwrap_or_default()
}
