//! Security scope of an evaluation
//!
//! Every [`ActionContext`](crate::context::ActionContext) carries a
//! [`SecurityContext`]: the acting principal, the per-transaction flags that
//! scripts may switch off (cascading delete, change notifications) and the
//! environment variables scripts are allowed to read.
//!
//! # Example
//!
//! ```
//! use quill_runtime::security::SecurityContext;
//!
//! let mut scope = SecurityContext::new();
//! scope.grant_environment("APP_*");
//!
//! assert!(scope.check_environment("APP_MODE").is_ok());
//! assert!(scope.check_environment("HOME").is_err());
//! ```

pub mod audit;
pub mod permissions;

pub use audit::{
    AuditEntry, AuditEvent, AuditLogger, MemoryAuditLogger, NullAuditLogger, TracingAuditLogger,
};
pub use permissions::{PermissionSet, Principal, SecurityContext, SecurityError};
