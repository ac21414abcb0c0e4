//! Output messages.
//!
//! Every message is one line of JSON tagged by `"type"`:
//!
//! ```text
//! {"type":"SCHEMA","stream":"users","schema":{...},"key_properties":["id"],"bookmark_properties":[]}
//! {"type":"RECORD","stream":"users","record":{...},"time_extracted":"2024-01-01T00:00:00Z"}
//! {"type":"STATE","value":{"bookmarks":{...}}}
//! ```

use crate::error::{ProtocolError, ProtocolResult};
use crate::schema::Schema;
use crate::state::StateDocument;
use crate::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in the output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message {
    /// Declares the shape of a resource's records.
    Schema {
        /// Resource name.
        stream: String,
        /// JSON Schema of the records.
        schema: Value,
        /// Primary-key fields.
        key_properties: Vec<String>,
        /// Replication key, if incremental.
        #[serde(default)]
        bookmark_properties: Vec<String>,
    },
    /// One emitted row.
    Record {
        /// Resource name.
        stream: String,
        /// Conformed record.
        record: Record,
        /// Time the record was extracted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<DateTime<Utc>>,
    },
    /// Snapshot of the checkpoint store.
    State {
        /// The state document.
        value: StateDocument,
    },
}

impl Message {
    /// Builds a SCHEMA message.
    pub fn schema(
        stream: impl Into<String>,
        schema: &Schema,
        key_properties: &[String],
        replication_key: Option<&str>,
    ) -> Self {
        Message::Schema {
            stream: stream.into(),
            schema: schema.to_json_schema(),
            key_properties: key_properties.to_vec(),
            bookmark_properties: replication_key.map(str::to_string).into_iter().collect(),
        }
    }

    /// Builds a RECORD message.
    pub fn record(stream: impl Into<String>, record: Record, extracted: DateTime<Utc>) -> Self {
        Message::Record {
            stream: stream.into(),
            record,
            time_extracted: Some(extracted),
        }
    }

    /// Builds a STATE message.
    pub fn state(value: StateDocument) -> Self {
        Message::State { value }
    }

    /// Returns the message type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Schema { .. } => "SCHEMA",
            Message::Record { .. } => "RECORD",
            Message::State { .. } => "STATE",
        }
    }

    /// Resource name for SCHEMA and RECORD messages.
    pub fn stream(&self) -> Option<&str> {
        match self {
            Message::Schema { stream, .. } | Message::Record { stream, .. } => Some(stream),
            Message::State { .. } => None,
        }
    }

    /// Encodes the message as a single line (without the trailing newline).
    pub fn to_line(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a message from one line.
    pub fn from_line(line: &str) -> ProtocolResult<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::invalid_message("empty line"));
        }
        Ok(serde_json::from_str(trimmed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn schema_message_shape() {
        let schema = Schema::new()
            .required_field("channel_id", FieldType::String)
            .required_field("ts", FieldType::String);
        let msg = Message::schema(
            "messages",
            &schema,
            &["channel_id".into(), "ts".into()],
            Some("ts"),
        );

        let value: Value = serde_json::from_str(&msg.to_line().unwrap()).unwrap();
        assert_eq!(value["type"], "SCHEMA");
        assert_eq!(value["stream"], "messages");
        assert_eq!(value["key_properties"], json!(["channel_id", "ts"]));
        assert_eq!(value["bookmark_properties"], json!(["ts"]));
    }

    #[test]
    fn record_line_parses_back() {
        let record: Record = serde_json::from_value(json!({"id": "U1", "name": "ada"})).unwrap();
        let extracted = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let msg = Message::record("users", record, extracted);

        let line = msg.to_line().unwrap();
        assert!(!line.contains('\n'));
        assert!(line.starts_with(r#"{"type":"RECORD""#));
        assert_eq!(Message::from_line(&line).unwrap(), msg);
    }

    #[test]
    fn state_message_wraps_document() {
        let msg = Message::state(StateDocument::new());
        assert_eq!(msg.type_name(), "STATE");
        assert_eq!(msg.stream(), None);
        assert_eq!(
            msg.to_line().unwrap(),
            r#"{"type":"STATE","value":{"bookmarks":{}}}"#
        );
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(Message::from_line(r#"{"type":"ACTIVATE_VERSION","stream":"x"}"#).is_err());
        assert!(Message::from_line("   ").is_err());
    }
}
