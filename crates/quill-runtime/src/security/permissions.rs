//! Principal, permission patterns and the security context

use crate::security::audit::{AuditEvent, AuditLogger, NullAuditLogger};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Security errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SecurityError {
    #[error("Permission denied: environment variable {var}")]
    EnvironmentDenied { var: String },

    #[error("Authentication failed for {user}")]
    AuthenticationFailed { user: String },

    #[error("Invalid permission pattern: {0}")]
    InvalidPattern(String),

    #[error("Secret is not configured")]
    MissingSecret,
}

/// The identity an evaluation acts as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub superuser: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            superuser: false,
        }
    }

    /// Built-in principal used by privileged calls
    pub fn superuser() -> Self {
        Self {
            id: "00000000000000000000000000000000".to_string(),
            name: "superuser".to_string(),
            superuser: true,
        }
    }
}

/// Set of name patterns
///
/// A pattern is an exact name, `*` (everything) or a prefix ending in `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    patterns: BTreeSet<String>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a pattern
    pub fn grant(&mut self, pattern: impl Into<String>) {
        self.patterns.insert(pattern.into());
    }

    /// Check if a name is matched by any granted pattern
    pub fn is_granted(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern_matches(pattern, name))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Merge patterns from another set
    pub fn merge(&mut self, other: &PermissionSet) {
        self.patterns.extend(other.patterns.iter().cloned());
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

/// Security scope of one evaluation
#[derive(Clone)]
pub struct SecurityContext {
    principal: Option<Principal>,
    cascading_delete: bool,
    notifications: bool,
    environment: PermissionSet,
    audit_logger: Arc<dyn AuditLogger>,
}

impl Default for SecurityContext {
    fn default() -> Self {
        Self {
            principal: None,
            cascading_delete: true,
            notifications: true,
            environment: PermissionSet::new(),
            audit_logger: Arc::new(NullAuditLogger::new()),
        }
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("principal", &self.principal)
            .field("cascading_delete", &self.cascading_delete)
            .field("notifications", &self.notifications)
            .field("environment", &self.environment)
            .finish()
    }
}

impl SecurityContext {
    /// Anonymous scope with no environment access
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new security context with audit logging enabled
    pub fn with_audit_logger(logger: Arc<dyn AuditLogger>) -> Self {
        Self {
            audit_logger: logger,
            ..Self::default()
        }
    }

    /// Scope acting as the given principal
    pub fn for_principal(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            ..Self::default()
        }
    }

    /// Build from configured environment patterns
    pub fn from_env_patterns<I, S>(patterns: I, logger: Arc<dyn AuditLogger>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ctx = Self::with_audit_logger(logger);
        for pattern in patterns {
            ctx.grant_environment(pattern);
        }
        ctx
    }

    /// Copy of this scope acting as superuser
    ///
    /// Flags and grants carry over; the escalation is audited.
    pub fn elevated(&self) -> Self {
        let from = self
            .principal
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "anonymous".to_string());
        self.audit_logger
            .log(AuditEvent::PrivilegeEscalation { context: from });

        let mut elevated = self.clone();
        elevated.principal = Some(Principal::superuser());
        elevated.environment.grant("*");
        elevated
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn set_principal(&mut self, principal: Principal) {
        self.audit_logger.log(AuditEvent::Login {
            user: principal.name.clone(),
        });
        self.principal = Some(principal);
    }

    pub fn is_superuser(&self) -> bool {
        self.principal.as_ref().is_some_and(|p| p.superuser)
    }

    pub fn cascading_delete(&self) -> bool {
        self.cascading_delete
    }

    pub fn set_cascading_delete(&mut self, enabled: bool) {
        self.cascading_delete = enabled;
        self.audit_logger.log(AuditEvent::FlagChanged {
            flag: "cascading_delete".to_string(),
            enabled,
        });
    }

    pub fn notifications(&self) -> bool {
        self.notifications
    }

    pub fn set_notifications(&mut self, enabled: bool) {
        self.notifications = enabled;
        self.audit_logger.log(AuditEvent::FlagChanged {
            flag: "notifications".to_string(),
            enabled,
        });
    }

    /// Take over the flags of `other`, keeping this scope's identity and grants
    pub(crate) fn adopt_flags(&mut self, other: &SecurityContext) {
        self.cascading_delete = other.cascading_delete;
        self.notifications = other.notifications;
    }

    /// Grant environment variable access (`NAME`, `PREFIX_*` or `*`)
    pub fn grant_environment(&mut self, pattern: impl Into<String>) {
        self.environment.grant(pattern);
    }

    /// Check environment variable access permission
    pub fn check_environment(&self, var: &str) -> Result<(), SecurityError> {
        if self.environment.is_granted(var) {
            self.audit_logger.log(AuditEvent::PermissionCheck {
                operation: "environment".to_string(),
                target: var.to_string(),
                granted: true,
            });
            Ok(())
        } else {
            self.audit_logger.log(AuditEvent::EnvironmentDenied {
                var: var.to_string(),
            });
            Err(SecurityError::EnvironmentDenied {
                var: var.to_string(),
            })
        }
    }

    pub fn audit_logger(&self) -> &Arc<dyn AuditLogger> {
        &self.audit_logger
    }
}
