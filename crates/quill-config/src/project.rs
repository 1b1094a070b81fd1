//! Project Configuration (quill.toml)
//!
//! Handles project-level configuration stored in `quill.toml` at the project root.

use crate::{
    validate_one_of, ConfigError, ConfigResult, KNOWN_DIALECTS, KNOWN_LOG_FORMATS,
    KNOWN_LOG_LEVELS, KNOWN_MODULES,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Project configuration from quill.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Evaluation defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeConfig>,

    /// Licensed modules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub licensing: Option<LicensingConfig>,

    /// Logging configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Process-wide cache configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    /// Security configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,

    /// Free-form settings exposed to scripts through `config()`
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, toml::Value>,
}

/// Evaluation defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Calling dialect ("template" or "script")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,

    /// Initial locale for new contexts (e.g., "en_US")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Licensing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LicensingConfig {
    /// Modules available to this installation
    pub modules: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level (trace, debug, info, warn, error, off)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Output format (pretty, compact, json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Default entry lifetime in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeout: Option<u64>,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Environment variables scripts may read ("*" or "PREFIX_*" patterns allowed)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    /// Secret used by `encrypt`/`decrypt`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(runtime) = &self.runtime {
            if let Some(dialect) = &runtime.dialect {
                validate_one_of("runtime.dialect", dialect, KNOWN_DIALECTS)?;
            }
            if let Some(locale) = &runtime.locale {
                if !is_valid_locale(locale) {
                    return Err(ConfigError::InvalidValue {
                        field: "runtime.locale".to_string(),
                        reason: format!("invalid locale '{}'", locale),
                    });
                }
            }
        }

        if let Some(licensing) = &self.licensing {
            for module in &licensing.modules {
                validate_one_of("licensing.modules", module, KNOWN_MODULES)?;
            }
        }

        if let Some(logging) = &self.logging {
            if let Some(level) = &logging.level {
                validate_one_of("logging.level", level, KNOWN_LOG_LEVELS)?;
            }
            if let Some(format) = &logging.format {
                validate_one_of("logging.format", format, KNOWN_LOG_FORMATS)?;
            }
        }

        if let Some(security) = &self.security {
            if security.env.iter().any(|pattern| pattern.is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: "security.env".to_string(),
                    reason: "pattern cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the configured dialect, if present
    pub fn dialect(&self) -> Option<&str> {
        self.runtime.as_ref().and_then(|r| r.dialect.as_deref())
    }

    /// Get the configured locale, if present
    pub fn locale(&self) -> Option<&str> {
        self.runtime.as_ref().and_then(|r| r.locale.as_deref())
    }

    /// Get the licensed modules, if configured
    pub fn modules(&self) -> Option<&[String]> {
        self.licensing.as_ref().map(|l| l.modules.as_slice())
    }

    /// Flatten `[settings]` into dotted keys with string values
    ///
    /// Nested tables become `outer.inner`; arrays render as TOML text.
    pub fn flattened_settings(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (key, value) in &self.settings {
            flatten_into(&mut out, key, value);
        }
        out
    }

    /// Merge another project config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &ProjectConfig) {
        if other.runtime.is_some() {
            self.runtime = other.runtime.clone();
        }
        if other.licensing.is_some() {
            self.licensing = other.licensing.clone();
        }
        if other.logging.is_some() {
            self.logging = other.logging.clone();
        }
        if other.cache.is_some() {
            self.cache = other.cache.clone();
        }
        if other.security.is_some() {
            self.security = other.security.clone();
        }
        if !other.settings.is_empty() {
            self.settings.extend(other.settings.clone());
        }
    }
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: &str, value: &toml::Value) {
    match value {
        toml::Value::Table(table) => {
            for (key, nested) in table {
                flatten_into(out, &format!("{}.{}", prefix, key), nested);
            }
        }
        toml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

/// Locale tags look like `en`, `en_US` or `en-US`
pub(crate) fn is_valid_locale(locale: &str) -> bool {
    let mut parts = locale.split(['_', '-']);
    let language = parts.next().unwrap_or("");
    if language.len() < 2 || language.len() > 3 || !language.chars().all(|c| c.is_ascii_alphabetic())
    {
        return false;
    }
    match (parts.next(), parts.next()) {
        (None, None) => true,
        (Some(country), None) => {
            country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic())
        }
        _ => false,
    }
}
