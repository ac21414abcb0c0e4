//! The Slack tap facade.

use crate::catalog::Catalog;
use crate::config::TapConfig;
use crate::error::{TapError, TapResult};
use crate::streams;
use slacktap_engine::{
    CheckpointStore, EngineConfig, HttpClient, MessageSink, ResourceGraph, Selection, SyncEngine,
};
use std::sync::Arc;
use tracing::debug;

/// Tap name reported by `about`.
pub const TAP_NAME: &str = "tap-slack";

/// A configured Slack tap.
#[derive(Debug, Clone)]
pub struct SlackTap {
    config: TapConfig,
    graph: ResourceGraph,
}

impl SlackTap {
    /// Validates `config` and builds the stream graph.
    pub fn new(config: TapConfig) -> TapResult<Self> {
        config.validate()?;
        let graph = streams::graph(&config)?;
        debug!(streams = graph.resources().len(), "built stream graph");
        Ok(Self { config, graph })
    }

    /// The configuration.
    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    /// The stream graph.
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Names of all streams in extraction order.
    pub fn stream_names(&self) -> Vec<&str> {
        self.graph
            .resources()
            .iter()
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Selection of `streams`, or the default selection when empty.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::UnknownStream`] for names that are not streams.
    pub fn select(&self, streams: &[String]) -> TapResult<Selection> {
        if streams.is_empty() {
            return Ok(self.graph.default_selection());
        }
        if let Some(unknown) = streams.iter().find(|s| !self.graph.contains(s)) {
            return Err(TapError::UnknownStream(unknown.clone()));
        }
        Ok(Selection::new(streams.iter().cloned()))
    }

    /// Catalog of every stream, marking `selection`.
    pub fn catalog(&self, selection: &Selection) -> Catalog {
        Catalog::from_graph(&self.graph, selection)
    }

    /// Applies the configured start date unless `config` already has one.
    pub fn engine_config(&self, config: EngineConfig) -> EngineConfig {
        match (config.start_date, self.config.start_date) {
            (None, Some(start)) => config.with_start_date(start),
            _ => config,
        }
    }

    /// Builds an engine extracting `selection` into `sink`.
    pub fn engine<S: MessageSink>(
        &self,
        config: EngineConfig,
        selection: Selection,
        client: Arc<dyn HttpClient>,
        store: Arc<dyn CheckpointStore>,
        sink: S,
    ) -> SyncEngine<S> {
        SyncEngine::new(
            self.graph.clone(),
            self.engine_config(config),
            client,
            self.config.api_config(),
            store,
            sink,
        )
        .with_selection(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn rejects_invalid_config() {
        assert!(SlackTap::new(TapConfig::new("")).is_err());
    }

    #[test]
    fn selection_defaults_and_errors() {
        let tap = SlackTap::new(TapConfig::new("k")).unwrap();

        let default = tap.select(&[]).unwrap();
        assert!(default.is_selected("messages"));
        assert!(!default.is_selected("channel_members"));

        let explicit = tap.select(&["users".to_string()]).unwrap();
        assert!(explicit.is_selected("users"));
        assert!(!explicit.is_selected("messages"));

        let err = tap.select(&["files".to_string()]).unwrap_err();
        assert!(matches!(err, TapError::UnknownStream(name) if name == "files"));
    }

    #[test]
    fn start_date_flows_into_engine_config() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let tap = SlackTap::new(TapConfig::new("k").with_start_date(start)).unwrap();

        assert_eq!(tap.engine_config(EngineConfig::new()).start_date, Some(start));

        let override_start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let config = EngineConfig::new().with_start_date(override_start);
        assert_eq!(tap.engine_config(config).start_date, Some(override_start));
    }

    #[test]
    fn stream_names_in_order() {
        let tap = SlackTap::new(TapConfig::new("k")).unwrap();
        assert_eq!(
            tap.stream_names(),
            vec![
                "channels",
                "channel_members",
                "messages",
                "threads",
                "message_reactions",
                "thread_reactions",
                "users"
            ]
        );
    }
}
