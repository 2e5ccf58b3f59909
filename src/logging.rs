//! Structured logging via `tracing`, written to a file because the terminal
//! is owned by the map UI.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Build the filter: explicit directives, else `RUST_LOG`, else the base level.
/// `verbosity` (from `-v` flags) raises the base level. Bad explicit directives
/// are an error rather than a silent fallback.
pub fn build_filter(config: &LoggingConfig, verbosity: u8) -> Result<EnvFilter> {
    let level = match verbosity {
        0 => config.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    if let Some(ref custom) = config.filter {
        return EnvFilter::try_new(custom)
            .with_context(|| format!("invalid log filter `{custom}`"));
    }
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => {
            EnvFilter::try_new(level).with_context(|| format!("invalid log level `{level}`"))
        }
    }
}

/// Install the global subscriber. Call once at start-up.
pub fn init_logging(config: &LoggingConfig, verbosity: u8) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .with_context(|| format!("opening log file {}", config.file.display()))?;

    let subscriber = tracing_subscriber::registry()
        .with(build_filter(config, verbosity)?)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_target(true)
                .with_writer(Mutex::new(file)),
        );

    // Already set (tests, repeated init) is not an error
    let _ = tracing::subscriber::set_global_default(subscriber);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_filter_wins() {
        let config = LoggingConfig {
            filter: Some("flagmap=trace".to_string()),
            ..LoggingConfig::default()
        };
        assert!(build_filter(&config, 0)
            .unwrap()
            .to_string()
            .contains("flagmap=trace"));
    }

    #[test]
    fn test_bad_filter_is_error() {
        let config = LoggingConfig {
            filter: Some("flagmap=notalevel".to_string()),
            ..LoggingConfig::default()
        };
        assert!(build_filter(&config, 0).is_err());
    }

    #[test]
    fn test_init_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            file: dir.path().join("flagmap.log"),
            ..LoggingConfig::default()
        };
        init_logging(&config, 0).unwrap();
        assert!(config.file.exists());
    }

    #[test]
    fn test_unwritable_log_file_is_error() {
        let config = LoggingConfig {
            file: "/no/such/dir/flagmap.log".into(),
            ..LoggingConfig::default()
        };
        assert!(init_logging(&config, 0).is_err());
    }
}
