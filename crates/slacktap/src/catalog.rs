//! Stream catalog produced by discovery.

use crate::error::TapResult;
use serde::Serialize;
use serde_json::Value;
use slacktap_engine::{ResourceGraph, Selection};

/// One stream of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Stream identifier.
    pub tap_stream_id: String,
    /// Stream name.
    pub stream: String,
    /// Primary-key fields.
    pub key_properties: Vec<String>,
    /// Replication field of incremental streams.
    pub replication_key: Option<String>,
    /// `FULL_TABLE` or `INCREMENTAL`.
    pub replication_method: String,
    /// Parent or driving stream.
    pub parent_stream: Option<String>,
    /// Whether the stream is selected in this catalog.
    pub selected: bool,
    /// Whether the stream is selected when nothing is chosen explicitly.
    pub selected_by_default: bool,
    /// JSON Schema of the records.
    pub schema: Value,
}

/// The streams a tap can extract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    /// Streams in extraction order.
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Describes every resource of `graph`.
    pub fn from_graph(graph: &ResourceGraph, selection: &Selection) -> Self {
        let streams = graph
            .resources()
            .iter()
            .map(|r| CatalogEntry {
                tap_stream_id: r.name.clone(),
                stream: r.name.clone(),
                key_properties: r.primary_keys.clone(),
                replication_key: r.replication_key.clone(),
                replication_method: r.replication_mode.as_str().to_string(),
                parent_stream: r.parent().or_else(|| r.driver()).map(str::to_string),
                selected: selection.is_selected(&r.name),
                selected_by_default: r.selected_by_default,
                schema: r.schema.to_json_schema(),
            })
            .collect();
        Self { streams }
    }

    /// Looks up a stream.
    pub fn get(&self, stream: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|s| s.stream == stream)
    }

    /// Selected streams.
    pub fn selected(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.streams.iter().filter(|s| s.selected)
    }

    /// Pretty JSON rendering.
    pub fn to_json_pretty(&self) -> TapResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
