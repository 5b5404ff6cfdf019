//! Durable cache tier interface
//!
//! The cache writes serialized entries through [`DurableStore`]. Any store
//! error or timeout is downgraded to a miss (reads) or a no-op (writes) by the
//! caller, so implementations can fail freely.

use crate::cache::clock::{Clock, SystemClock};
use crate::error::StoreError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Namespaced key-value store with per-entry TTL
#[async_trait::async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value`; `ttl_ms == 0` keeps it until deleted
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl_ms: u64,
    ) -> Result<(), StoreError>;

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError>;

    /// Remove every key in `namespace`, returning how many were removed
    async fn delete_namespace(&self, namespace: &str) -> Result<usize, StoreError>;

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<i64>,
}

impl StoredValue {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process [`DurableStore`], useful as a shared tier between caches and in tests
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), StoredValue>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        let id = (namespace.to_string(), key.to_string());

        match entries.get(&id) {
            Some(stored) if stored.is_expired(now) => {
                entries.remove(&id);
                Ok(None)
            }
            Some(stored) => Ok(Some(stored.value.clone())),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl_ms: u64,
    ) -> Result<(), StoreError> {
        let expires_at = expiry(self.clock.now_ms(), ttl_ms);
        self.entries.lock().insert(
            (namespace.to_string(), key.to_string()),
            StoredValue { value, expires_at },
        );
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .lock()
            .remove(&(namespace.to_string(), key.to_string()))
            .is_some())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(ns, _), _| ns != namespace);
        Ok(before - entries.len())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, stored| !stored.is_expired(now));
        Ok(before - entries.len())
    }
}

/// Absolute expiry for a TTL; zero means never
pub(crate) fn expiry(now: i64, ttl_ms: u64) -> Option<i64> {
    if ttl_ms == 0 {
        None
    } else {
        Some(now.saturating_add(i64::try_from(ttl_ms).unwrap_or(i64::MAX)))
    }
}
