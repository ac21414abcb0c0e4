//! Captured sync output and the built-in tap checks.
//!
//! A [`SyncCapture`] holds every message of one run, either collected
//! from a [`slacktap_engine::MemorySink`] or parsed from the
//! line-delimited output of the CLI. The checks mirror what a tap test
//! suite asserts about any stream:
//!
//! | check | asserts |
//! |---|---|
//! | `stream_returns_record` | at least one record |
//! | `record_schema_matches_catalog` | no record field outside the schema |
//! | `catalog_schema_matches_records` | every schema property seen in some record |
//! | `primary_key` | key tuples non-null and unique |
//! | `attribute_not_null` | attribute never null |
//! | `attribute_unique` | attribute values distinct |
//! | `attribute_accepted_values` | attribute within an allowed set |

use serde::Serialize;
use serde_json::Value;
use slacktap_protocol::{Message, ProtocolResult, Record, StateDocument};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// A failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    /// Name of the check.
    pub check: &'static str,
    /// Stream the check ran on.
    pub stream: String,
    /// What went wrong.
    pub detail: String,
}

impl CheckFailure {
    fn new(check: &'static str, stream: &str, detail: impl Into<String>) -> Self {
        Self {
            check,
            stream: stream.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for {}: {}", self.check, self.stream, self.detail)
    }
}

impl std::error::Error for CheckFailure {}

/// Result of one check.
pub type CheckResult = Result<(), CheckFailure>;

/// Declared shape of a stream, taken from its SCHEMA message.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSchema {
    /// JSON Schema.
    pub schema: Value,
    /// Primary-key fields.
    pub key_properties: Vec<String>,
}

impl StreamSchema {
    /// Declared property names.
    pub fn property_names(&self) -> BTreeSet<String> {
        self.schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Every message of one sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncCapture {
    messages: Vec<Message>,
}

impl SyncCapture {
    /// Wraps already decoded messages.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Parses line-delimited output, skipping blank lines.
    pub fn from_lines(output: &str) -> ProtocolResult<Self> {
        let messages = output
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(Message::from_line)
            .collect::<ProtocolResult<Vec<_>>>()?;
        Ok(Self { messages })
    }

    /// All messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Schemas announced during the run.
    pub fn schemas(&self) -> BTreeMap<&str, StreamSchema> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Schema {
                    stream,
                    schema,
                    key_properties,
                    ..
                } => Some((
                    stream.as_str(),
                    StreamSchema {
                        schema: schema.clone(),
                        key_properties: key_properties.clone(),
                    },
                )),
                _ => None,
            })
            .collect()
    }

    /// Records of `stream` in emission order.
    pub fn records(&self, stream: &str) -> Vec<&Record> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Total number of records.
    pub fn record_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::Record { .. }))
            .count()
    }

    /// STATE payloads in order.
    pub fn states(&self) -> Vec<&StateDocument> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }

    /// The last STATE payload.
    pub fn final_state(&self) -> Option<&StateDocument> {
        self.states().last().copied()
    }

    fn schema(&self, check: &'static str, stream: &str) -> Result<StreamSchema, CheckFailure> {
        self.schemas()
            .remove(stream)
            .ok_or_else(|| CheckFailure::new(check, stream, "no SCHEMA message"))
    }

    /// The stream emitted at least one record.
    pub fn stream_returns_record(&self, stream: &str) -> CheckResult {
        if self.records(stream).is_empty() {
            return Err(CheckFailure::new(
                "stream_returns_record",
                stream,
                "no records",
            ));
        }
        Ok(())
    }

    /// No record carries a field the schema does not declare.
    pub fn record_schema_matches_catalog(&self, stream: &str) -> CheckResult {
        const CHECK: &str = "record_schema_matches_catalog";
        let declared = self.schema(CHECK, stream)?.property_names();
        let undeclared: BTreeSet<&str> = self
            .records(stream)
            .into_iter()
            .flat_map(|r| r.keys())
            .filter(|k| !declared.contains(*k))
            .map(String::as_str)
            .collect();
        if !undeclared.is_empty() {
            return Err(CheckFailure::new(
                CHECK,
                stream,
                format!("undeclared fields {undeclared:?}"),
            ));
        }
        Ok(())
    }

    /// Every declared property appears in at least one record.
    pub fn catalog_schema_matches_records(&self, stream: &str) -> CheckResult {
        const CHECK: &str = "catalog_schema_matches_records";
        let declared = self.schema(CHECK, stream)?.property_names();
        let seen: BTreeSet<&str> = self
            .records(stream)
            .into_iter()
            .flat_map(|r| r.keys())
            .map(String::as_str)
            .collect();
        let missing: Vec<&str> = declared
            .iter()
            .map(String::as_str)
            .filter(|p| !seen.contains(p))
            .collect();
        if !missing.is_empty() {
            return Err(CheckFailure::new(
                CHECK,
                stream,
                format!("properties never seen {missing:?}"),
            ));
        }
        Ok(())
    }

    /// Primary-key tuples are non-null and unique.
    pub fn primary_key(&self, stream: &str) -> CheckResult {
        const CHECK: &str = "primary_key";
        let keys = self.schema(CHECK, stream)?.key_properties;
        if keys.is_empty() {
            return Err(CheckFailure::new(CHECK, stream, "no key properties"));
        }
        let mut seen = HashSet::new();
        for record in self.records(stream) {
            let tuple: Vec<&Value> = keys
                .iter()
                .map(|k| record.get(k).unwrap_or(&Value::Null))
                .collect();
            if tuple.iter().any(|v| v.is_null()) {
                return Err(CheckFailure::new(
                    CHECK,
                    stream,
                    format!("null key in {tuple:?}"),
                ));
            }
            let signature = Value::Array(tuple.into_iter().cloned().collect()).to_string();
            if !seen.insert(signature) {
                return Err(CheckFailure::new(
                    CHECK,
                    stream,
                    format!("duplicate key for {keys:?}"),
                ));
            }
        }
        Ok(())
    }

    /// `attribute` is present and non-null in every record.
    pub fn attribute_not_null(&self, stream: &str, attribute: &str) -> CheckResult {
        let nulls = self
            .records(stream)
            .iter()
            .filter(|r| r.get(attribute).is_none_or(Value::is_null))
            .count();
        if nulls > 0 {
            return Err(CheckFailure::new(
                "attribute_not_null",
                stream,
                format!("{attribute} is null in {nulls} records"),
            ));
        }
        Ok(())
    }

    /// Non-null values of `attribute` are distinct.
    pub fn attribute_unique(&self, stream: &str, attribute: &str) -> CheckResult {
        let mut seen = HashSet::new();
        for value in self.attribute_values(stream, attribute) {
            if !seen.insert(value.to_string()) {
                return Err(CheckFailure::new(
                    "attribute_unique",
                    stream,
                    format!("{attribute} repeats {value}"),
                ));
            }
        }
        Ok(())
    }

    /// Non-null values of `attribute` are among `accepted`.
    pub fn attribute_accepted_values(
        &self,
        stream: &str,
        attribute: &str,
        accepted: &[Value],
    ) -> CheckResult {
        if let Some(value) = self
            .attribute_values(stream, attribute)
            .into_iter()
            .find(|v| !accepted.contains(v))
        {
            return Err(CheckFailure::new(
                "attribute_accepted_values",
                stream,
                format!("{attribute} has unexpected value {value}"),
            ));
        }
        Ok(())
    }

    fn attribute_values(&self, stream: &str, attribute: &str) -> Vec<&Value> {
        self.records(stream)
            .into_iter()
            .filter_map(|r| r.get(attribute))
            .filter(|v| !v.is_null())
            .collect()
    }

    /// Runs the schema and key checks on every stream that emitted records.
    pub fn standard_checks(&self) -> Vec<CheckFailure> {
        let streams: BTreeSet<&str> = self
            .messages
            .iter()
            .filter(|m| matches!(m, Message::Record { .. }))
            .filter_map(Message::stream)
            .collect();
        let mut failures = Vec::new();
        for stream in streams {
            let checks = [
                self.record_schema_matches_catalog(stream),
                self.catalog_schema_matches_records(stream),
                self.primary_key(stream),
            ];
            failures.extend(checks.into_iter().filter_map(Result::err));
        }
        failures
    }
}
