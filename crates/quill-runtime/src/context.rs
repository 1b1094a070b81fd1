//! Per-evaluation execution context
//!
//! An [`ActionContext`] is created at the start of one evaluation and dropped
//! at its end. Every function receives it mutably, so effects such as
//! `store`, `inc_counter` or `set_locale` are visible to the calls that
//! follow. It is never shared between threads while in use; only the
//! [`Services`] it points to are process-wide.

use crate::dialect::Dialect;
use crate::error::{ArgumentError, RuntimeError};
use crate::function::FunctionRegistry;
use crate::locale::Locale;
use crate::security::SecurityContext;
use crate::services::Services;
use crate::value::{Value, ValueMap};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Number of counter levels (0..=9)
pub const COUNTER_LEVELS: usize = 10;

static NEXT_TRANSACTION: AtomicU64 = AtomicU64::new(1);

/// Structured failure entry in the error buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorToken {
    pub status: u16,
    pub token: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorToken {
    pub fn new(status: u16, token: impl Into<String>) -> Self {
        Self {
            status,
            token: token.into(),
            type_name: None,
            property: None,
            detail: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Map representation returned by `get_errors()`
    pub fn to_value(&self) -> Value {
        let mut map = ValueMap::new();
        map.insert("status".to_string(), Value::Integer(i64::from(self.status)));
        map.insert("token".to_string(), Value::string(self.token.clone()));
        if let Some(type_name) = &self.type_name {
            map.insert("type".to_string(), Value::string(type_name.clone()));
        }
        if let Some(property) = &self.property {
            map.insert("property".to_string(), Value::string(property.clone()));
        }
        if let Some(detail) = &self.detail {
            map.insert("detail".to_string(), Value::string(detail.clone()));
        }
        Value::map(map)
    }
}

/// Prefetch request recorded on the transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchHint {
    pub type_name: String,
    pub keys: Vec<String>,
}

/// Handle to the surrounding transaction
///
/// Functions can only request rollback or add hints; opening and committing
/// belong to the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: u64,
    rollback_only: bool,
    prefetch: Vec<PrefetchHint>,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: NEXT_TRANSACTION.fetch_add(1, Ordering::Relaxed),
            rollback_only: false,
            prefetch: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mark_rollback_only(&mut self) {
        if !self.rollback_only {
            tracing::debug!(transaction = self.id, "transaction marked rollback-only");
        }
        self.rollback_only = true;
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }

    pub fn add_prefetch_hint(&mut self, hint: PrefetchHint) {
        self.prefetch.push(hint);
    }

    pub fn prefetch_hints(&self) -> &[PrefetchHint] {
        &self.prefetch
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation flag with a blocking, interruptible wait
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and wake every waiter; the token stays cancelled
    pub fn cancel(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock().unwrap_or_else(|e| e.into_inner()) = true;
        condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block for up to `timeout`
    ///
    /// Returns `true` if the wait ended because of cancellation.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut cancelled = flag.lock().unwrap_or_else(|e| e.into_inner());
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = match condvar.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

/// Mutable state of one evaluation
#[derive(Debug)]
pub struct ActionContext {
    security: SecurityContext,
    transaction: Transaction,
    locale: Locale,
    counters: [i64; COUNTER_LEVELS],
    errors: Vec<ErrorToken>,
    store: HashMap<String, Value>,
    dialect: Dialect,
    cancellation: CancellationToken,
    registry: Arc<FunctionRegistry>,
    services: Arc<Services>,
}

impl ActionContext {
    pub fn new(registry: Arc<FunctionRegistry>, services: Arc<Services>) -> Self {
        let security = SecurityContext::from_env_patterns(
            services.environment_grants.iter().cloned(),
            Arc::clone(&services.audit_logger),
        );
        Self {
            security,
            transaction: Transaction::new(),
            locale: Locale::default(),
            counters: [0; COUNTER_LEVELS],
            errors: Vec::new(),
            store: HashMap::new(),
            dialect: Dialect::default(),
            cancellation: CancellationToken::new(),
            registry,
            services,
        }
    }

    // Security scope

    pub fn security(&self) -> &SecurityContext {
        &self.security
    }

    pub fn security_mut(&mut self) -> &mut SecurityContext {
        &mut self.security
    }

    pub fn set_security(&mut self, security: SecurityContext) {
        self.security = security;
    }

    /// Run `f` with `scope` installed, then restore the previous principal
    /// and grants
    ///
    /// Cascading-delete and notification flags changed inside `f` persist.
    pub fn with_security<R>(
        &mut self,
        scope: SecurityContext,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let previous = std::mem::replace(&mut self.security, scope);
        let result = f(self);
        let inner = std::mem::replace(&mut self.security, previous);
        self.security.adopt_flags(&inner);
        result
    }

    // Transaction

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn transaction_mut(&mut self) -> &mut Transaction {
        &mut self.transaction
    }

    // Locale

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    // Counters

    fn counter_slot(level: i64) -> Result<usize, ArgumentError> {
        usize::try_from(level)
            .ok()
            .filter(|&l| l < COUNTER_LEVELS)
            .ok_or_else(|| ArgumentError::Type {
                index: 0,
                expected: format!("counter level 0..={}", COUNTER_LEVELS - 1),
                actual: level.to_string(),
            })
    }

    pub fn counter(&self, level: i64) -> Result<i64, ArgumentError> {
        Ok(self.counters[Self::counter_slot(level)?])
    }

    /// Increment a counter, optionally zeroing every higher level
    pub fn increment_counter(&mut self, level: i64, reset_higher: bool) -> Result<i64, ArgumentError> {
        let slot = Self::counter_slot(level)?;
        self.counters[slot] += 1;
        if reset_higher {
            for higher in &mut self.counters[slot + 1..] {
                *higher = 0;
            }
        }
        Ok(self.counters[slot])
    }

    pub fn reset_counter(&mut self, level: i64) -> Result<(), ArgumentError> {
        let slot = Self::counter_slot(level)?;
        self.counters[slot] = 0;
        Ok(())
    }

    // Error buffer

    pub fn push_error(&mut self, token: ErrorToken) {
        self.errors.push(token);
    }

    pub fn errors(&self) -> &[ErrorToken] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Remove tokens matching `token` (and `property`, when given)
    ///
    /// Returns the number of removed entries.
    pub fn remove_errors(&mut self, token: &str, property: Option<&str>) -> usize {
        let before = self.errors.len();
        self.errors.retain(|e| {
            let matches =
                e.token == token && property.map_or(true, |p| e.property.as_deref() == Some(p));
            !matches
        });
        before - self.errors.len()
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    // Temporary store

    /// Store a value; `Value::Null` removes the key
    pub fn store(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if value.is_null() {
            self.store.remove(&key);
        } else {
            self.store.insert(key, value);
        }
    }

    pub fn retrieve(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    pub fn stored_keys(&self) -> impl Iterator<Item = &str> {
        self.store.keys().map(String::as_str)
    }

    // Dialect, cancellation, collaborators

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancellation = token;
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Call a function by name in this context
    pub fn call_function(
        &mut self,
        name: &str,
        caller: &Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let registry = Arc::clone(&self.registry);
        registry.call(self, name, caller, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Licensing;
    use crate::security::Principal;
    use std::thread;

    fn context() -> ActionContext {
        ActionContext::new(
            Arc::new(FunctionRegistry::new(Licensing::all())),
            Arc::new(Services::default()),
        )
    }

    #[test]
    fn test_counters() {
        let mut ctx = context();
        ctx.increment_counter(1, false).unwrap();
        ctx.increment_counter(1, false).unwrap();
        ctx.increment_counter(3, false).unwrap();
        assert_eq!(ctx.counter(1).unwrap(), 2);

        ctx.increment_counter(1, true).unwrap();
        assert_eq!(ctx.counter(1).unwrap(), 3);
        assert_eq!(ctx.counter(3).unwrap(), 0);

        ctx.reset_counter(1).unwrap();
        assert_eq!(ctx.counter(1).unwrap(), 0);
    }

    #[test]
    fn test_counter_out_of_range() {
        let mut ctx = context();
        assert!(ctx.counter(10).is_err());
        assert!(ctx.increment_counter(-1, false).is_err());
        assert!(ctx.reset_counter(99).is_err());
        assert!(ctx.counter(9).is_ok());
    }

    #[test]
    fn test_store_null_removes() {
        let mut ctx = context();
        ctx.store("k", Value::Integer(1));
        assert_eq!(ctx.retrieve("k"), Some(&Value::Integer(1)));
        ctx.store("k", Value::Null);
        assert_eq!(ctx.retrieve("k"), None);
    }

    #[test]
    fn test_error_buffer() {
        let mut ctx = context();
        ctx.push_error(ErrorToken::new(422, "must_not_be_empty").with_property("name"));
        ctx.push_error(ErrorToken::new(422, "must_not_be_empty").with_property("email"));
        ctx.push_error(ErrorToken::new(400, "invalid"));

        assert_eq!(ctx.remove_errors("must_not_be_empty", Some("email")), 1);
        assert_eq!(ctx.errors().len(), 2);
        assert_eq!(ctx.remove_errors("must_not_be_empty", None), 1);
        assert_eq!(ctx.errors()[0].token, "invalid");

        ctx.clear_errors();
        assert!(!ctx.has_errors());
    }

    #[test]
    fn test_error_token_json() {
        let token = ErrorToken::new(422, "already_taken").with_type("User");
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": 422, "token": "already_taken", "type": "User"})
        );
    }

    #[test]
    fn test_with_security_restores_scope() {
        let mut ctx = context();
        ctx.security_mut()
            .set_principal(Principal::new("u1", "alice"));

        let elevated = ctx.security().elevated();
        let inside = ctx.with_security(elevated, |ctx| ctx.security().is_superuser());

        assert!(inside);
        assert!(!ctx.security().is_superuser());
        assert_eq!(ctx.security().principal().unwrap().name, "alice");
    }

    #[test]
    fn test_with_security_keeps_flag_changes() {
        let mut ctx = context();
        let elevated = ctx.security().elevated();
        ctx.with_security(elevated, |ctx| {
            ctx.security_mut().set_notifications(false);
            ctx.security_mut().grant_environment("SECRET_*");
        });

        assert!(!ctx.security().notifications());
        assert!(ctx.security().cascading_delete());
        assert!(ctx.security().principal().is_none());
        assert!(ctx.security().check_environment("SECRET_KEY").is_err());
    }

    #[test]
    fn test_transaction_flags() {
        let mut ctx = context();
        assert!(!ctx.transaction().is_rollback_only());
        ctx.transaction_mut().mark_rollback_only();
        ctx.transaction_mut().add_prefetch_hint(PrefetchHint {
            type_name: "User".to_string(),
            keys: vec!["name".to_string()],
        });
        assert!(ctx.transaction().is_rollback_only());
        assert_eq!(ctx.transaction().prefetch_hints().len(), 1);
        assert_ne!(Transaction::new().id(), Transaction::new().id());
    }

    #[test]
    fn test_cancellation_interrupts_wait() {
        let token = CancellationToken::new();
        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let started = Instant::now();
        assert!(token.wait_timeout(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(30));
        assert!(token.is_cancelled());
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_times_out() {
        let token = CancellationToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(5)));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_unknown_function() {
        let mut ctx = context();
        assert_eq!(
            ctx.call_function("nope", &Value::Null, &[]),
            Err(RuntimeError::UnknownFunction("nope".to_string()))
        );
    }
}
