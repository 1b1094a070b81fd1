//! Process-wide collaborators shared by every evaluation
//!
//! Each service synchronizes itself; an [`ActionContext`](crate::context::ActionContext)
//! only holds an `Arc<Services>`.

pub mod cache;
pub mod graph;

pub use cache::ValueCache;
pub use graph::{GraphError, GraphStore, Grants, InMemoryGraph, READ_ONLY_KEYS};

use crate::security::{AuditEvent, AuditLogger, NullAuditLogger, Principal, SecurityError};
use quill_config::Config;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Read-only configuration map exposed through `config()`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl FromIterator<(String, String)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Runtime log level control used by `set_log_level()`
pub trait LogControl: Send + Sync {
    /// Replace the active filter (`"debug"`, `"quill_runtime=trace"`, ...)
    fn set_level(&self, directive: &str) -> Result<(), String>;

    /// Currently active filter directive
    fn current_level(&self) -> String;
}

/// Log control that only remembers the requested level
///
/// Used when no subscriber was installed through
/// [`init_logging`](crate::logging::init_logging).
#[derive(Debug)]
pub struct MemoryLogControl {
    level: Mutex<String>,
}

impl MemoryLogControl {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: Mutex::new(level.into()),
        }
    }
}

impl Default for MemoryLogControl {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LogControl for MemoryLogControl {
    fn set_level(&self, directive: &str) -> Result<(), String> {
        if directive.trim().is_empty() {
            return Err("empty log level".to_string());
        }
        *self.level.lock().unwrap_or_else(|e| e.into_inner()) = directive.to_string();
        Ok(())
    }

    fn current_level(&self) -> String {
        self.level.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Environment variable lookup
pub trait Environment: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed variable table
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: BTreeMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl Environment for MapEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Credential check used by `login()`
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, user: &str, password: &str) -> Result<Principal, SecurityError>;
}

/// Hex-encoded SHA-256 of a password
pub fn password_hash(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

/// Static user table with SHA-256 password hashes
#[derive(Default)]
pub struct StaticAuthenticator {
    users: BTreeMap<String, (Principal, String)>,
    audit_logger: Option<Arc<dyn AuditLogger>>,
}

impl fmt::Debug for StaticAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticAuthenticator")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StaticAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit_logger = Some(logger);
        self
    }

    /// Register a user with a plain-text password
    pub fn with_user(mut self, principal: Principal, password: &str) -> Self {
        self.users
            .insert(principal.name.clone(), (principal, password_hash(password)));
        self
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, user: &str, password: &str) -> Result<Principal, SecurityError> {
        match self.users.get(user) {
            Some((principal, hash)) if *hash == password_hash(password) => Ok(principal.clone()),
            _ => {
                if let Some(logger) = &self.audit_logger {
                    logger.log(AuditEvent::LoginFailed {
                        user: user.to_string(),
                    });
                }
                Err(SecurityError::AuthenticationFailed {
                    user: user.to_string(),
                })
            }
        }
    }
}

/// Bundle of process-wide services
pub struct Services {
    pub graph: Arc<dyn GraphStore>,
    pub cache: ValueCache,
    pub settings: Settings,
    pub log_control: Arc<dyn LogControl>,
    pub environment: Arc<dyn Environment>,
    pub authenticator: Arc<dyn Authenticator>,
    pub audit_logger: Arc<dyn AuditLogger>,
    /// Environment patterns granted to every evaluation
    pub environment_grants: Vec<String>,
    secret: Option<String>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            graph: Arc::new(InMemoryGraph::new()),
            cache: ValueCache::default(),
            settings: Settings::default(),
            log_control: Arc::new(MemoryLogControl::default()),
            environment: Arc::new(ProcessEnvironment),
            authenticator: Arc::new(StaticAuthenticator::new()),
            audit_logger: Arc::new(NullAuditLogger::new()),
            environment_grants: Vec::new(),
            secret: None,
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .field("environment_grants", &self.environment_grants)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Services configured from a loaded [`Config`]
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache: ValueCache::new(Duration::from_secs(config.cache_timeout())),
            settings: Settings::new(config.settings()),
            log_control: Arc::new(MemoryLogControl::new(config.log_level())),
            environment_grants: config.env_patterns(),
            secret: config.secret().map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_graph(mut self, graph: Arc<dyn GraphStore>) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_log_control(mut self, log_control: Arc<dyn LogControl>) -> Self {
        self.log_control = log_control;
        self
    }

    pub fn with_environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn with_audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit_logger = logger;
        self
    }

    pub fn with_environment_grants<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environment_grants = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }
}
