//! Security audit logging
//!
//! Structured record of security events (permission checks, denials,
//! logins, privilege escalation, flag changes).

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Security audit event types
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    /// Permission check requested
    PermissionCheck {
        operation: String,
        target: String,
        granted: bool,
    },
    /// Environment variable access denied
    EnvironmentDenied { var: String },
    /// Privileged call started
    PrivilegeEscalation { context: String },
    /// A principal was installed in the scope
    Login { user: String },
    /// Credential check failed
    LoginFailed { user: String },
    /// Cascading delete or notifications switched
    FlagChanged { flag: String, enabled: bool },
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::PermissionCheck {
                operation,
                target,
                granted,
            } => {
                let status = if *granted { "GRANTED" } else { "DENIED" };
                write!(f, "Permission {}: {} access to {}", status, operation, target)
            }
            AuditEvent::EnvironmentDenied { var } => {
                write!(f, "Permission denied: environment variable {}", var)
            }
            AuditEvent::PrivilegeEscalation { context } => {
                write!(f, "Privilege escalation from {}", context)
            }
            AuditEvent::Login { user } => write!(f, "Login: {}", user),
            AuditEvent::LoginFailed { user } => write!(f, "Login failed: {}", user),
            AuditEvent::FlagChanged { flag, enabled } => {
                let state = if *enabled { "enabled" } else { "disabled" };
                write!(f, "Flag {} {}", flag, state)
            }
        }
    }
}

/// Audit log entry with timestamp
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

impl AuditEntry {
    /// Create a new audit entry with current timestamp
    pub fn new(event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }

    /// Format as log line
    pub fn to_log_line(&self) -> String {
        format!("[{}] {}", self.timestamp.to_rfc3339(), self.event)
    }
}

/// Audit logger trait for customizable logging backends
pub trait AuditLogger: Send + Sync {
    /// Log an audit event
    fn log(&self, event: AuditEvent);

    /// Get all logged entries (for testing)
    fn entries(&self) -> Vec<AuditEntry>;

    /// Clear all logged entries (for testing)
    fn clear(&self);
}

/// In-memory audit logger
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLogger {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLogger for MemoryAuditLogger {
    fn log(&self, event: AuditEvent) {
        let entry = AuditEntry::new(event);
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Null audit logger (no-op)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditLogger;

impl NullAuditLogger {
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for NullAuditLogger {
    fn log(&self, _event: AuditEvent) {}

    fn entries(&self) -> Vec<AuditEntry> {
        Vec::new()
    }

    fn clear(&self) {}
}

/// Forwards audit events to `tracing` under the `quill::audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl AuditLogger for TracingAuditLogger {
    fn log(&self, event: AuditEvent) {
        match &event {
            AuditEvent::EnvironmentDenied { .. } | AuditEvent::LoginFailed { .. } => {
                tracing::warn!(target: "quill::audit", "{}", event)
            }
            AuditEvent::PermissionCheck { .. } => {
                tracing::trace!(target: "quill::audit", "{}", event)
            }
            _ => tracing::info!(target: "quill::audit", "{}", event),
        }
    }

    fn entries(&self) -> Vec<AuditEntry> {
        Vec::new()
    }

    fn clear(&self) {}
}
