//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Mirror log lines into an optional file
//! - Configure log level from config, CLI and environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for log collectors, pretty format for humans
//! - Precedence: `--log-level`, then `RUST_LOG`, then the configured level

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unable to open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("logging already initialised: {0}")]
    Init(#[from] TryInitError),
}

/// Build the event filter: `level_override` if given, else `RUST_LOG` if
/// set, else the configured `level`.
pub fn build_filter(level: &str, level_override: Option<&str>) -> EnvFilter {
    match level_override {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
    }
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::File {
            path: path.to_path_buf(),
            source,
        })
}

/// Install the global subscriber. `level_override` (from the CLI) replaces
/// both `RUST_LOG` and the configured level.
pub fn init(config: &LoggingConfig, level_override: Option<&str>) -> Result<(), LoggingError> {
    let stderr_layer = match config.format {
        LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
        LogFormat::Pretty => fmt::layer().with_writer(io::stderr).boxed(),
    };

    let file_layer = match &config.file {
        Some(path) => {
            let file = open_log_file(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(build_filter(&config.level, level_override))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_beats_environment() {
        let filter = build_filter("info", Some("container_init=trace"));
        assert_eq!(filter.to_string(), "container_init=trace");
    }

    #[test]
    fn opens_log_file_in_append_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init.log");
        std::fs::write(&path, "previous\n").unwrap();

        open_log_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous\n");
    }

    #[test]
    fn unwritable_log_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_log_file(&dir.path().join("missing/dir/init.log")).unwrap_err();
        assert!(err.to_string().contains("unable to open log file"));
    }
}
