//! Structured logging setup and per-request cache events.

use std::fmt;
use std::time::Duration;

use offline_core::{CacheStatus, Request};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the log filter.
pub const LOG_ENV: &str = "OFFLINE_LOG";

/// Log level for the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Map a `-v` count to a level: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format (for development).
    #[default]
    Human,
    /// JSON format (for log aggregation).
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Minimum level for the offline crates.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
}

impl LogConfig {
    /// Create a new logging configuration.
    pub fn new(level: LogLevel, format: LogFormat) -> Self {
        Self { level, format }
    }

    /// Filter directive used when `OFFLINE_LOG` is not set.
    pub fn directive(&self) -> String {
        let level = self.level.as_filter();
        format!("warn,offline={level},offline_cache={level},offline_store={level},offline_fetch={level},offline_sdk={level}")
    }
}

/// Errors from subscriber installation.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Install the global `tracing` subscriber. Logs go to stderr.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive),
        Err(_) => EnvFilter::try_new(config.directive()),
    }
    .map_err(|e| LoggingError::Filter(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match config.format {
        LogFormat::Human => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))
}

/// One routed request, as logged.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEvent {
    /// Request method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Partition the strategy ran against, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    /// How the request was answered.
    pub status: CacheStatus,
    /// Response status code handed to the page.
    pub response_status: u16,
    /// Time spent routing, in microseconds.
    pub elapsed_us: u64,
}

impl CacheEvent {
    /// Build an event for a routed request.
    pub fn new(
        request: &Request,
        partition: Option<&str>,
        status: CacheStatus,
        response_status: u16,
        elapsed: Duration,
    ) -> Self {
        Self {
            method: request.method.to_string(),
            url: request.url.to_string(),
            partition: partition.map(str::to_string),
            status,
            response_status,
            elapsed_us: elapsed.as_micros() as u64,
        }
    }

    /// Emit the event through `tracing`.
    pub fn emit(&self) {
        match self.status {
            CacheStatus::Offline => tracing::warn!(
                method = %self.method,
                url = %self.url,
                partition = self.partition.as_deref().unwrap_or("-"),
                cache = %self.status,
                status = self.response_status,
                elapsed_us = self.elapsed_us,
                "request answered offline"
            ),
            _ => tracing::debug!(
                method = %self.method,
                url = %self.url,
                partition = self.partition.as_deref().unwrap_or("-"),
                cache = %self.status,
                status = self.response_status,
                elapsed_us = self.elapsed_us,
                "request routed"
            ),
        }
    }

    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.url.clone())
    }
}
