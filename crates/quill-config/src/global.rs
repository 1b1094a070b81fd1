//! Global Configuration (~/.quill/config.toml)
//!
//! Handles user-level configuration stored in `~/.quill/config.toml`.

use crate::project::is_valid_locale;
use crate::{
    validate_one_of, ConfigError, ConfigResult, KNOWN_DIALECTS, KNOWN_LOG_FORMATS,
    KNOWN_LOG_LEVELS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.quill/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Logging preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<GlobalLoggingConfig>,

    /// Permission defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionsConfig>,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Default dialect when a project does not choose one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,

    /// Default locale when a project does not choose one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Global logging preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GlobalLoggingConfig {
    /// Minimum level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Permission defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PermissionsConfig {
    /// Environment variables ("allow", "deny")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

impl GlobalConfig {
    /// Load global configuration from a file
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

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(perms) = &self.permissions {
            if let Some(env) = &perms.env {
                validate_one_of("permissions.env", env, &["allow", "deny"])?;
            }
        }

        if let Some(defaults) = &self.defaults {
            if let Some(dialect) = &defaults.dialect {
                validate_one_of("defaults.dialect", dialect, KNOWN_DIALECTS)?;
            }
            if let Some(locale) = &defaults.locale {
                if !is_valid_locale(locale) {
                    return Err(ConfigError::InvalidValue {
                        field: "defaults.locale".to_string(),
                        reason: format!("invalid locale '{}'", locale),
                    });
                }
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

        Ok(())
    }

    /// Get the global config file path (~/.quill/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".quill").join("config.toml"))
    }

    /// Get the default dialect
    pub fn default_dialect(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.dialect.as_deref())
    }

    /// Get the default locale
    pub fn default_locale(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.locale.as_deref())
    }

    /// Whether environment access is granted to every variable by default
    pub fn env_allowed(&self) -> bool {
        self.permissions
            .as_ref()
            .and_then(|p| p.env.as_deref())
            .map(|v| v == "allow")
            .unwrap_or(false)
    }

    /// Merge another global config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &GlobalConfig) {
        if other.defaults.is_some() {
            self.defaults = other.defaults.clone();
        }
        if other.logging.is_some() {
            self.logging = other.logging.clone();
        }
        if other.permissions.is_some() {
            self.permissions = other.permissions.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_global_config() {
        let toml = r#"
[defaults]
locale = "en_GB"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_locale(), Some("en_GB"));
        assert_eq!(config.default_dialect(), None);
    }

    #[test]
    fn test_parse_full_global_config() {
        let toml = r#"
[defaults]
dialect = "script"
locale = "de"

[logging]
level = "warn"
format = "compact"

[permissions]
env = "allow"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_dialect(), Some("script"));
        assert!(config.env_allowed());
    }

    #[test]
    fn test_invalid_permission_value() {
        let config = GlobalConfig {
            permissions: Some(PermissionsConfig {
                env: Some("prompt".to_string()),
            }),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_configs() {
        let mut base = GlobalConfig::default();
        let override_config = GlobalConfig {
            defaults: Some(DefaultsConfig {
                dialect: Some("template".to_string()),
                locale: None,
            }),
            ..Default::default()
        };

        base.merge(&override_config);
        assert_eq!(base.default_dialect(), Some("template"));
        assert!(!base.env_allowed());
    }
}
