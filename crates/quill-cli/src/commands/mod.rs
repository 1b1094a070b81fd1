//! Subcommands and the runtime session they share

pub mod call;
pub mod doc;
pub mod functions;

use anyhow::{Context, Result};
use quill_config::{Config, ConfigLoader};
use quill_runtime::logging::{init_logging, LogConfig, LogFormat};
use quill_runtime::security::TracingAuditLogger;
use quill_runtime::{ActionContext, Dialect, FunctionRegistry, Licensing, Locale, Services};
use std::sync::Arc;

/// Registry, services and defaults built from the effective configuration
pub struct Session {
    pub registry: Arc<FunctionRegistry>,
    pub services: Arc<Services>,
    pub dialect: Dialect,
    pub locale: Locale,
}

impl Session {
    /// Load quill.toml (if any), install logging and build the registry
    ///
    /// `dialect` comes from the command line and wins over configuration.
    pub fn load(dialect: Option<Dialect>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = ConfigLoader::new()
            .load_from_directory(&cwd)
            .context("Failed to load configuration")?;
        Self::from_config(&config, dialect)
    }

    pub fn from_config(config: &Config, dialect: Option<Dialect>) -> Result<Self> {
        let mut services =
            Services::from_config(config).with_audit_logger(Arc::new(TracingAuditLogger));

        let log_config = LogConfig::new()
            .with_level(config.log_level())
            .with_format(config.log_format().parse::<LogFormat>().unwrap_or_default());
        // Keep the in-memory log control if a subscriber is already installed
        if let Ok(handle) = init_logging(log_config) {
            services = services.with_log_control(Arc::new(handle));
        }

        let registry = FunctionRegistry::with_builtins(Licensing::new(config.modules()))?;
        tracing::debug!(functions = registry.len(), "registry ready");

        let dialect = match dialect {
            Some(dialect) => dialect,
            None => config
                .dialect()
                .parse::<Dialect>()
                .map_err(anyhow::Error::msg)?,
        };
        let locale = Locale::parse(config.locale())
            .with_context(|| format!("Invalid locale '{}'", config.locale()))?;

        Ok(Self {
            registry: Arc::new(registry),
            services: Arc::new(services),
            dialect,
            locale,
        })
    }

    /// Fresh evaluation context using the session defaults
    pub fn context(&self) -> ActionContext {
        let mut ctx = ActionContext::new(Arc::clone(&self.registry), Arc::clone(&self.services));
        ctx.set_dialect(self.dialect);
        ctx.set_locale(self.locale.clone());
        ctx
    }
}
