//! Messages and thread replies.

use super::conversations::channel_param;
use super::{MESSAGE_REACTIONS, THREADS, THREAD_REACTIONS};
use serde_json::{json, Value};
use slacktap_engine::{AuxiliaryCall, HookContext, ResourceHooks, SyncResult};
use slacktap_protocol::{compare_replication_values, Record};
use std::cmp::Ordering;
use tracing::debug;

fn oldest_param(hook: &HookContext<'_>) -> Option<(String, String)> {
    hook.request_floor
        .and_then(Value::as_str)
        .map(|floor| ("oldest".to_string(), floor.to_string()))
}

fn str_field<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn has_reactions(record: &Record) -> bool {
    record
        .get("reactions")
        .and_then(Value::as_array)
        .is_some_and(|r| !r.is_empty())
}

fn reaction_call(target: &str, record: &Record, hook: &HookContext<'_>) -> AuxiliaryCall {
    AuxiliaryCall::new(target, hook.context.clone()).with_side_channel(record.clone())
}

/// Hooks of the `messages` stream.
///
/// A thread parent (`thread_ts == ts`, at least one reply) at or after the
/// request floor drives a `threads` invocation even when the message itself
/// is older than the emission floor: new replies land on old messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageHooks;

impl ResourceHooks for MessageHooks {
    fn url_params(&self, hook: &HookContext<'_>) -> Vec<(String, String)> {
        let mut params = channel_param(hook.context);
        params.extend(oldest_param(hook));
        params
    }

    fn post_process(&self, raw: Value, hook: &HookContext<'_>) -> SyncResult<Option<Record>> {
        let Value::Object(mut record) = raw else {
            return Ok(None);
        };
        if let Some(channel) = hook.context.get_str("channel_id") {
            record.insert("channel_id".into(), json!(channel));
        }
        Ok(Some(record))
    }

    fn auxiliary_calls(
        &self,
        record: &Record,
        above_floor: bool,
        hook: &HookContext<'_>,
    ) -> Vec<AuxiliaryCall> {
        let mut calls = Vec::new();

        if let Some(ts) = thread_parent_ts(record) {
            let ts_value = json!(ts);
            let recent = hook
                .request_floor
                .is_none_or(|floor| compare_replication_values(&ts_value, floor) != Ordering::Less);
            if recent {
                calls.push(AuxiliaryCall::new(
                    THREADS,
                    hook.context.clone().with("thread_ts", ts),
                ));
            } else {
                debug!(ts, "thread parent older than lookback, skipping replies");
            }
        }

        if above_floor && has_reactions(record) {
            calls.push(reaction_call(MESSAGE_REACTIONS, record, hook));
        }
        calls
    }
}

fn thread_parent_ts(record: &Record) -> Option<&str> {
    let ts = str_field(record, "ts")?;
    let replies = record.get("reply_count").and_then(Value::as_u64).unwrap_or(0);
    (str_field(record, "thread_ts") == Some(ts) && replies > 0).then_some(ts)
}

/// Hooks of the `threads` stream.
///
/// `conversations.replies` returns the parent message first; it is already
/// extracted by `messages` and is skipped here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadHooks;

impl ResourceHooks for ThreadHooks {
    fn url_params(&self, hook: &HookContext<'_>) -> Vec<(String, String)> {
        let mut params = channel_param(hook.context);
        if let Some(thread_ts) = hook.context.get_str("thread_ts") {
            params.push(("ts".to_string(), thread_ts.to_string()));
        }
        params.extend(oldest_param(hook));
        params
    }

    fn post_process(&self, raw: Value, hook: &HookContext<'_>) -> SyncResult<Option<Record>> {
        let Value::Object(mut record) = raw else {
            return Ok(None);
        };
        let thread_ts = hook.context.get_str("thread_ts");
        if thread_ts.is_some() && str_field(&record, "ts") == thread_ts {
            return Ok(None);
        }
        if let Some(channel) = hook.context.get_str("channel_id") {
            record.insert("channel_id".into(), json!(channel));
        }
        if let Some(thread_ts) = thread_ts {
            record
                .entry("thread_ts")
                .or_insert_with(|| json!(thread_ts));
        }
        Ok(Some(record))
    }

    fn auxiliary_calls(
        &self,
        record: &Record,
        above_floor: bool,
        hook: &HookContext<'_>,
    ) -> Vec<AuxiliaryCall> {
        if above_floor && has_reactions(record) {
            vec![reaction_call(THREAD_REACTIONS, record, hook)]
        } else {
            Vec::new()
        }
    }
}
