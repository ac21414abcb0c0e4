//! Sync command implementation.

use super::{CliError, CliResult};
use slacktap::{ReqwestClient, SlackTap, TapConfig};
use slacktap_engine::{
    CheckpointStore, EngineConfig, FileCheckpointStore, JsonLinesSink, MemoryCheckpointStore,
    RetryConfig, RunSummary,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Options of the sync command.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Configuration file.
    pub config: PathBuf,
    /// State file to resume from and checkpoint into.
    pub state: Option<PathBuf>,
    /// Additional destination of the final state.
    pub state_out: Option<PathBuf>,
    /// Streams to extract.
    pub streams: Vec<String>,
    /// Run-wide record limit.
    pub record_limit: Option<u64>,
    /// Per-stream record limit.
    pub resource_record_limit: Option<u64>,
    /// Attempts per request.
    pub max_attempts: Option<u32>,
    /// Pages between STATE messages.
    pub state_interval: Option<u64>,
}

impl SyncOptions {
    /// Engine tuning derived from the flags.
    pub fn engine_config(&self) -> CliResult<EngineConfig> {
        let mut config = EngineConfig::new();
        if let Some(limit) = self.record_limit {
            config = config.with_record_limit(limit);
        }
        if let Some(limit) = self.resource_record_limit {
            config = config.with_resource_record_limit(limit);
        }
        if let Some(attempts) = self.max_attempts {
            if attempts == 0 {
                return Err(CliError::InvalidArgument(
                    "--max-attempts must be at least 1".into(),
                ));
            }
            let retry = RetryConfig {
                max_attempts: attempts,
                ..config.retry.clone()
            };
            config = config.with_retry(retry);
        }
        if let Some(pages) = self.state_interval {
            if pages == 0 {
                return Err(CliError::InvalidArgument(
                    "--state-interval must be at least 1".into(),
                ));
            }
            config = config.with_state_interval_pages(pages);
        }
        Ok(config)
    }
}

/// Runs the sync command, writing messages to stdout.
pub fn run(options: &SyncOptions) -> CliResult<RunSummary> {
    let config = TapConfig::load(&options.config)?;
    let tap = SlackTap::new(config)?;
    let selection = tap.select(&options.streams)?;
    let engine_config = options.engine_config()?;

    let store = open_store(options.state.as_deref().or(options.state_out.as_deref()))?;
    let client = Arc::new(ReqwestClient::new()?);
    let stdout = std::io::stdout().lock();

    let mut engine = tap.engine(
        engine_config,
        selection,
        client,
        store.clone(),
        JsonLinesSink::new(stdout),
    );
    let summary = engine.run()?;
    engine.into_sink().into_inner()?.flush()?;

    if let (Some(out), Some(state)) = (&options.state_out, &options.state) {
        if out != state {
            write_state(out, store.as_ref())?;
        }
    }

    report(&summary);
    Ok(summary)
}

fn open_store(path: Option<&Path>) -> CliResult<Arc<dyn CheckpointStore>> {
    Ok(match path {
        Some(path) => {
            info!(path = %path.display(), "using state file");
            Arc::new(FileCheckpointStore::open(path)?)
        }
        None => Arc::new(MemoryCheckpointStore::new()),
    })
}

fn write_state(path: &Path, store: &dyn CheckpointStore) -> CliResult<()> {
    let json = store.snapshot().to_json_pretty()?;
    fs::write(path, json)?;
    info!(path = %path.display(), "wrote final state");
    Ok(())
}

fn report(summary: &RunSummary) {
    for (name, resource) in &summary.resources {
        info!(
            stream = %name,
            outcome = ?resource.outcome,
            records = resource.stats.records_emitted,
            requests = resource.stats.requests,
            "stream finished"
        );
        for error in &resource.errors {
            warn!(stream = %name, %error, "stream error");
        }
    }
    if summary.stopped_by_limit {
        info!("run stopped at the record limit");
    }
}
