//! Discover command implementation.

use super::CliResult;
use slacktap::{Catalog, SlackTap, TapConfig};
use std::path::Path;

/// Builds the catalog for the configuration at `config`.
pub fn catalog(config: &Path, streams: &[String]) -> CliResult<Catalog> {
    let tap = SlackTap::new(TapConfig::load(config)?)?;
    let selection = tap.select(streams)?;
    Ok(tap.catalog(&selection))
}

/// Runs the discover command.
pub fn run(config: &Path, streams: &[String]) -> CliResult<()> {
    println!("{}", catalog(config, streams)?.to_json_pretty()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CliError;
    use slacktap::TapError;
    use std::fs;

    fn write_config(dir: &Path, json: &str) -> std::path::PathBuf {
        let path = dir.join("config.json");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn lists_admin_streams_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{"api_key": "xoxb-1", "include_admin_streams": true}"#,
        );

        let catalog = catalog(&path, &[]).unwrap();

        assert!(catalog.get("user_groups").is_some());
        assert!(catalog.get("integration_logs").is_some());
        assert!(catalog.get("messages").unwrap().selected);
    }

    #[test]
    fn marks_requested_streams() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), r#"{"api_key": "xoxb-1"}"#);

        let catalog = catalog(&path, &["users".to_string()]).unwrap();

        assert!(catalog.get("users").unwrap().selected);
        assert!(!catalog.get("messages").unwrap().selected);
    }

    #[test]
    fn unknown_stream_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), r#"{"api_key": "xoxb-1"}"#);

        let err = catalog(&path, &["files".to_string()]).unwrap_err();
        assert!(matches!(err, CliError::Tap(TapError::UnknownStream(_))));
    }
}
