//! Reactions, derived from the message that carries them.

use serde_json::{json, Value};
use slacktap_engine::ResourceHooks;
use slacktap_protocol::{Context, Record};

/// Hooks of `message_reactions` and `thread_reactions`.
///
/// One record per (reaction, user) of the side-channel message. The id is
/// `channel:ts:reaction:user`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReactionHooks;

impl ResourceHooks for ReactionHooks {
    fn derive_records(&self, context: &Context, side_channel: Option<&Record>) -> Vec<Record> {
        let Some(message) = side_channel else {
            return Vec::new();
        };
        let channel = context
            .get_str("channel_id")
            .or_else(|| message.get("channel_id").and_then(Value::as_str))
            .unwrap_or_default();
        let Some(ts) = message.get("ts").and_then(Value::as_str) else {
            return Vec::new();
        };
        let thread_ts = message.get("thread_ts").cloned().unwrap_or(Value::Null);
        let author = message.get("user").cloned().unwrap_or(Value::Null);

        let reactions = message
            .get("reactions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut records = Vec::new();
        for reaction in reactions {
            let Some(name) = reaction.get("name").and_then(Value::as_str) else {
                continue;
            };
            let users = reaction
                .get("users")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for user in users.iter().filter_map(Value::as_str) {
                let mut record = Record::new();
                record.insert("id".into(), json!(format!("{channel}:{ts}:{name}:{user}")));
                record.insert("channel_id".into(), json!(channel));
                record.insert("ts".into(), json!(ts));
                record.insert("thread_ts".into(), thread_ts.clone());
                record.insert("reaction".into(), json!(name));
                record.insert("user".into(), json!(user));
                record.insert("original_msg_author".into(), author.clone());
                records.push(record);
            }
        }
        records
    }
}
