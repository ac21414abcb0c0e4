//! Persisted extraction state.
//!
//! ```text
//! {
//!   "bookmarks": {
//!     "<resource>": {
//!       "<context signature>": {
//!         "page_token": ...,          // present while mid-pagination
//!         "replication_key": "ts",
//!         "replication_value": ...,   // committed between runs
//!         "progress_value": ...,      // max seen in an unfinished run
//!         "finalized": true
//!       }
//!     }
//!   }
//! }
//! ```

use crate::context::Context;
use crate::error::ProtocolResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A token asking the API for the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageToken {
    /// Page number for page-number pagination.
    Page(u64),
    /// Opaque cursor for cursor pagination.
    Cursor(String),
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageToken::Page(n) => write!(f, "{n}"),
            PageToken::Cursor(c) => f.write_str(c),
        }
    }
}

/// Position of one resource partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionState {
    /// Token of the next page still to be fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<PageToken>,
    /// Field the replication value refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
    /// Committed replication value, the floor of the next run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_value: Option<Value>,
    /// Highest replication value seen by a run that has not finished yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_value: Option<Value>,
    /// Whether the partition completed and its position is safe to resume from.
    #[serde(default)]
    pub finalized: bool,
}

impl PartitionState {
    /// Returns true if a previous run stopped mid-pagination.
    pub fn is_resumable(&self) -> bool {
        !self.finalized && self.page_token.is_some()
    }
}

/// Complete mapping from (resource, context signature) to partition state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Partition states keyed by resource name, then context signature.
    #[serde(default)]
    pub bookmarks: BTreeMap<String, BTreeMap<String, PartitionState>>,
}

impl StateDocument {
    /// Creates an empty state document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a state document from JSON.
    ///
    /// Both a bare document and a STATE message payload of the form
    /// `{"value": {...}}` are accepted.
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        let inner = match value {
            Value::Object(mut map) if !map.contains_key("bookmarks") && map.contains_key("value") => {
                map.remove("value").unwrap_or(Value::Null)
            }
            other => other,
        };
        if inner.is_null() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_value(inner)?)
    }

    /// Serializes the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the state of one partition.
    pub fn get(&self, resource: &str, context: &Context) -> Option<&PartitionState> {
        self.bookmarks
            .get(resource)
            .and_then(|parts| parts.get(&context.signature()))
    }

    /// Replaces the state of one partition.
    pub fn set(&mut self, resource: &str, context: &Context, state: PartitionState) {
        self.bookmarks
            .entry(resource.to_string())
            .or_default()
            .insert(context.signature(), state);
    }

    /// Mutable access to one partition, creating it if missing.
    pub fn entry(&mut self, resource: &str, context: &Context) -> &mut PartitionState {
        self.bookmarks
            .entry(resource.to_string())
            .or_default()
            .entry(context.signature())
            .or_default()
    }

    /// Iterates the partitions of one resource.
    pub fn partitions(&self, resource: &str) -> impl Iterator<Item = (&str, &PartitionState)> {
        self.bookmarks
            .get(resource)
            .into_iter()
            .flat_map(|parts| parts.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Number of finalized partitions of one resource.
    pub fn finalized_count(&self, resource: &str) -> usize {
        self.partitions(resource).filter(|(_, p)| p.finalized).count()
    }

    /// Returns true if no partition is tracked.
    pub fn is_empty(&self) -> bool {
        self.bookmarks.values().all(BTreeMap::is_empty)
    }
}
