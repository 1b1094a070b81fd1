//! Quill Configuration System
//!
//! Provides configuration management for applications embedding the Quill
//! function runtime:
//! - Project configuration (quill.toml)
//! - Global user configuration (~/.quill/config.toml)
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.quill/config.toml)
//! 2. Project config (./quill.toml)
//! 3. Environment variables (QUILL_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use quill_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("locale: {}", config.locale());
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Module identifiers understood by `[licensing] modules`
pub const KNOWN_MODULES: &[&str] = &["core", "ui", "crypto"];

/// Dialect names understood by `[runtime] dialect`
pub const KNOWN_DIALECTS: &[&str] = &["template", "script"];

/// Log levels understood by `[logging] level`
pub const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Log formats understood by `[logging] format`
pub const KNOWN_LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::ProjectConfig;

pub(crate) fn validate_one_of(field: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("must be one of {}, got '{}'", allowed.join(", "), value),
    })
}
