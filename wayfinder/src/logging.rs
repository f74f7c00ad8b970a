//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; the host application decides
//! where they go by calling [`init`] once at startup.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::{NavError, Result};

/// Filter used when neither `RUST_LOG` nor the config provides one.
pub const DEFAULT_FILTER: &str = "info,wayfinder=info";

/// Prefix of rolling log file names.
const LOG_FILE_PREFIX: &str = "wayfinder.log";

/// Logging configuration.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string, e.g. `"info,wayfinder=debug"`.
    pub filter: String,

    /// Directory for daily rolling log files. Logs go to stderr when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    /// Build the filter; `RUST_LOG` takes precedence over the configured directive.
    fn env_filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.filter)
            .map_err(|e| NavError::Config(format!("invalid log filter '{}': {}", self.filter, e)))
    }
}

/// Install the global tracing subscriber.
///
/// When logging to files the returned guard must be kept alive for the
/// lifetime of the program; dropping it flushes and stops the writer thread.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = config.env_filter()?;

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| NavError::Config(format!("logging already initialized: {}", e)))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| NavError::Config(format!("logging already initialized: {}", e)))?;
            Ok(None)
        }
    }
}
