//! About command implementation.

use super::{CliError, CliResult};
use serde::Serialize;
use slacktap::{SlackTap, TapConfig, TAP_NAME};

/// Description of the tap.
#[derive(Debug, Serialize)]
pub struct AboutInfo {
    /// Tap name.
    pub name: String,
    /// Tap version.
    pub version: String,
    /// Accepted configuration keys.
    pub settings: Vec<String>,
    /// Streams, including the admin-only ones.
    pub streams: Vec<String>,
}

/// Collects the tap description.
pub fn info() -> CliResult<AboutInfo> {
    let template = TapConfig::new("about").with_admin_streams(true);
    let settings = match serde_json::to_value(&template)? {
        serde_json::Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };
    let tap = SlackTap::new(template)?;
    Ok(AboutInfo {
        name: TAP_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        settings,
        streams: tap.stream_names().into_iter().map(str::to_string).collect(),
    })
}

/// Runs the about command.
pub fn run(format: &str) -> CliResult<()> {
    let info = info()?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&info)?),
        "text" => {
            println!("{} v{}", info.name, info.version);
            println!();
            println!("Settings:");
            for key in &info.settings {
                println!("  {key}");
            }
            println!();
            println!("Streams:");
            for stream in &info.streams {
                println!("  {stream}");
            }
        }
        other => {
            return Err(CliError::InvalidArgument(format!(
                "unknown format {other}, expected text or json"
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_settings_and_streams() {
        let info = info().unwrap();

        assert_eq!(info.name, "tap-slack");
        assert!(info.settings.contains(&"api_key".to_string()));
        assert!(info.settings.contains(&"thread_lookback_days".to_string()));
        assert!(info.streams.contains(&"integration_logs".to_string()));
        assert_eq!(info.streams.first().map(String::as_str), Some("channels"));
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(matches!(run("yaml"), Err(CliError::InvalidArgument(_))));
    }
}
