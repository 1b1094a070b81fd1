//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{is_valid_locale, LoggingConfig, ProjectConfig, RuntimeConfig};
use crate::{
    validate_one_of, ConfigError, ConfigResult, KNOWN_DIALECTS, KNOWN_LOG_LEVELS, KNOWN_MODULES,
};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const PROJECT_FILE: &str = "quill.toml";

/// Default cache entry lifetime in seconds
pub const DEFAULT_CACHE_TIMEOUT: u64 = 60;

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.quill/config.toml) - lowest priority
/// 2. Project config (./quill.toml) - overrides global
/// 3. Environment variables (QUILL_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where quill.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Create a loader that reads the global config from an explicit path
    pub fn with_global_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find quill.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;

        // Global config is optional and never blocks a project load
        let global_config = self.load_global_config().unwrap_or_default();

        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config().unwrap_or_default();
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.quill/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    ///
    /// Recognized variables: QUILL_LOCALE, QUILL_DIALECT, QUILL_LOG, QUILL_MODULES
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(locale) = env::var("QUILL_LOCALE") {
            if !is_valid_locale(&locale) {
                return Err(ConfigError::InvalidValue {
                    field: "QUILL_LOCALE".to_string(),
                    reason: format!("invalid locale '{}'", locale),
                });
            }
            config
                .runtime
                .get_or_insert_with(RuntimeConfig::default)
                .locale = Some(locale);
        }

        if let Ok(dialect) = env::var("QUILL_DIALECT") {
            let dialect = dialect.to_lowercase();
            validate_one_of("QUILL_DIALECT", &dialect, KNOWN_DIALECTS)?;
            config
                .runtime
                .get_or_insert_with(RuntimeConfig::default)
                .dialect = Some(dialect);
        }

        if let Ok(level) = env::var("QUILL_LOG") {
            let level = level.to_lowercase();
            validate_one_of("QUILL_LOG", &level, KNOWN_LOG_LEVELS)?;
            config
                .logging
                .get_or_insert_with(LoggingConfig::default)
                .level = Some(level);
        }

        if let Ok(modules) = env::var("QUILL_MODULES") {
            let modules: Vec<String> = modules
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            for module in &modules {
                validate_one_of("QUILL_MODULES", module, KNOWN_MODULES)?;
            }
            config.licensing = Some(crate::project::LicensingConfig { modules });
        }

        Ok(config)
    }

    /// Get the global configuration directory (~/.quill)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".quill"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Effective dialect (project > global > "template")
    pub fn dialect(&self) -> &str {
        self.project
            .dialect()
            .or_else(|| self.global.default_dialect())
            .unwrap_or("template")
    }

    /// Effective locale (project > global > "en_US")
    pub fn locale(&self) -> &str {
        self.project
            .locale()
            .or_else(|| self.global.default_locale())
            .unwrap_or("en_US")
    }

    /// Effective log level (project > global > "info")
    pub fn log_level(&self) -> &str {
        self.project
            .logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .or_else(|| self.global.logging.as_ref().and_then(|l| l.level.as_deref()))
            .unwrap_or("info")
    }

    /// Effective log format (project > global > "compact")
    pub fn log_format(&self) -> &str {
        self.project
            .logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .or_else(|| self.global.logging.as_ref().and_then(|l| l.format.as_deref()))
            .unwrap_or("compact")
    }

    /// Licensed modules; every known module when nothing is configured
    pub fn modules(&self) -> Vec<String> {
        match self.project.modules() {
            Some(modules) => modules.to_vec(),
            None => KNOWN_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Environment variable patterns scripts may read
    pub fn env_patterns(&self) -> Vec<String> {
        let mut patterns = self
            .project
            .security
            .as_ref()
            .map(|s| s.env.clone())
            .unwrap_or_default();
        if self.global.env_allowed() && !patterns.iter().any(|p| p == "*") {
            patterns.push("*".to_string());
        }
        patterns
    }

    /// Secret for `encrypt`/`decrypt`, if configured
    pub fn secret(&self) -> Option<&str> {
        self.project
            .security
            .as_ref()
            .and_then(|s| s.secret.as_deref())
    }

    /// Default cache lifetime in seconds
    pub fn cache_timeout(&self) -> u64 {
        self.project
            .cache
            .as_ref()
            .and_then(|c| c.default_timeout)
            .unwrap_or(DEFAULT_CACHE_TIMEOUT)
    }

    /// Flattened `[settings]` table
    pub fn settings(&self) -> BTreeMap<String, String> {
        self.project.flattened_settings()
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has quill.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(PROJECT_FILE);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    fn isolated_loader(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::with_global_config_path(dir.path().join("no-global.toml"))
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[runtime]
locale = "fr_FR"
"#,
        );

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let mut loader = isolated_loader(&temp_dir);
        let config = loader.load_from_directory(&sub_dir).unwrap();

        assert_eq!(config.locale(), "fr_FR");
        assert_eq!(config.project_root(), Some(temp_dir.path()));
    }

    #[test]
    #[serial]
    fn test_env_override_locale() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[runtime]
locale = "en_US"
"#,
        );

        env::set_var("QUILL_LOCALE", "de_DE");

        let mut loader = isolated_loader(&temp_dir);
        let config = loader.load_from_directory(temp_dir.path()).unwrap();

        env::remove_var("QUILL_LOCALE");

        assert_eq!(config.locale(), "de_DE");
    }

    #[test]
    fn test_defaults_without_any_config() {
        let config = Config::default();

        assert_eq!(config.dialect(), "template");
        assert_eq!(config.locale(), "en_US");
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.cache_timeout(), DEFAULT_CACHE_TIMEOUT);
        assert_eq!(config.modules().len(), KNOWN_MODULES.len());
        assert!(config.env_patterns().is_empty());
    }
}
