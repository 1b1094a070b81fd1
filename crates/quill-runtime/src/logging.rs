//! Logging setup
//!
//! Installs a `tracing` subscriber with a reloadable [`EnvFilter`] so that the
//! `set_log_level()` scripting function can change verbosity at runtime.

use crate::services::LogControl;
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    /// Single line per event
    #[default]
    Compact,
    /// JSON for structured collection
    Json,
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(LogError::UnknownFormat(other.to_string())),
        }
    }
}

/// Logging errors
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Unknown log format '{0}'")]
    UnknownFormat(String),

    #[error("Invalid filter directive '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("A global subscriber is already installed")]
    AlreadyInitialized,

    #[error("Failed to reload filter: {0}")]
    Reload(String),
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `quill_runtime=debug,warn`
    pub level: String,
    pub format: LogFormat,
    /// Include the event target in each line
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            with_target: false,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LogError> {
    EnvFilter::try_new(directive).map_err(|e| LogError::InvalidFilter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// Handle to the installed subscriber's filter
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    current: Mutex<String>,
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("current", &self.current_level())
            .finish()
    }
}

impl LogHandle {
    /// Swap the active filter
    pub fn reload(&self, directive: &str) -> Result<(), LogError> {
        let filter = parse_filter(directive)?;
        self.handle
            .reload(filter)
            .map_err(|e| LogError::Reload(e.to_string()))?;
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = directive.to_string();
        tracing::info!(directive, "log level changed");
        Ok(())
    }
}

impl LogControl for LogHandle {
    fn set_level(&self, directive: &str) -> Result<(), String> {
        self.reload(directive).map_err(|e| e.to_string())
    }

    fn current_level(&self) -> String {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Initialize the global logging system
///
/// Writes to stderr. Fails if a global subscriber is already installed.
pub fn init_logging(config: LogConfig) -> Result<LogHandle, LogError> {
    let (filter, handle) = reload::Layer::new(parse_filter(&config.level)?);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.with_target)
                    .pretty(),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.with_target)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.with_target)
                    .json(),
            )
            .try_init(),
    };
    result.map_err(|_| LogError::AlreadyInitialized)?;

    Ok(LogHandle {
        handle,
        current: Mutex::new(config.level),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_invalid_filter_rejected() {
        assert!(parse_filter("info").is_ok());
        assert!(parse_filter("quill_runtime=debug,warn").is_ok());
        assert!(matches!(
            parse_filter("quill=loud"),
            Err(LogError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = LogConfig::new()
            .with_level("debug")
            .with_format(LogFormat::Json)
            .with_target(true);
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.with_target);
    }

    #[test]
    fn test_init_and_reload() {
        let handle = match init_logging(LogConfig::new().with_level("warn")) {
            Ok(handle) => handle,
            // a subscriber is already installed in this process
            Err(LogError::AlreadyInitialized) => return,
            Err(e) => panic!("unexpected error: {}", e),
        };
        assert_eq!(handle.current_level(), "warn");
        handle.set_level("debug").unwrap();
        assert_eq!(handle.current_level(), "debug");
        assert!(handle.set_level("quill=loud").is_err());
        assert_eq!(handle.current_level(), "debug");
    }
}
