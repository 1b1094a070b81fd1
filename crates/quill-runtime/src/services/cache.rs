//! Process-wide keyed cache with per-entry expiry

use crate::value::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Shared cache used by `cache()` and the `*_cache_value` functions
#[derive(Debug)]
pub struct ValueCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_timeout: Duration,
}

impl Default for ValueCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl ValueCache {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Live value for `key`; an expired entry is dropped
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Store `value` for `ttl`
    pub fn put(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.lock();
        Self::purge(&mut entries, now);
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    /// Return the live value for `key`, or store and return `value`
    pub fn get_or_insert(&self, key: &str, value: Value, ttl: Duration) -> Value {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => entry.value.clone(),
            _ => {
                Self::purge(&mut entries, now);
                entries.insert(
                    key.to_string(),
                    CacheEntry {
                        value: value.clone(),
                        expires_at: now + ttl,
                    },
                );
                value
            }
        }
    }

    /// Remove the entry; returns whether one existed
    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop the entry so the next `cache()` call recomputes it
    ///
    /// Returns whether a live entry was invalidated.
    pub fn invalidate(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .remove(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Drop expired entries
    pub fn purge_expired(&self) -> usize {
        Self::purge(&mut self.lock(), Instant::now())
    }

    fn purge(entries: &mut HashMap<String, CacheEntry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}
