//! TTL key-value store for dedup state

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::TransportError;

/// Result of an atomic last-notified refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Enough time had elapsed (or no record existed); the timestamp
    /// was written. Carries the previous value, if any.
    Refreshed { previous: Option<i64> },
    /// The existing record is still within the window; nothing written.
    Suppressed { last: i64 },
}

/// Key-value store holding integer timestamps with TTL expiry.
///
/// Keys are namespaced strings derived from a result fingerprint. The
/// store is external shared state: multiple pipeline processes may
/// operate on the same keys, so the read-modify-write in
/// [`refresh_if_elapsed`](DedupStore::refresh_if_elapsed) must be a
/// single atomic operation against the backing store.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Read a timestamp, `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<i64>, TransportError>;

    /// Write a timestamp with an expiry.
    async fn put(&self, key: &str, value: i64, ttl: Duration) -> Result<(), TransportError>;

    /// Remove a key. Removing an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<(), TransportError>;

    /// Insert `value` only when the key is absent, refreshing the
    /// expiry either way. Returns the value stored under the key
    /// after the call.
    async fn get_or_put(
        &self,
        key: &str,
        value: i64,
        ttl: Duration,
    ) -> Result<i64, TransportError>;

    /// Atomically write `now` under `key` when no record exists or at
    /// least `min_elapsed` seconds have passed since the recorded
    /// timestamp; otherwise leave the record untouched.
    async fn refresh_if_elapsed(
        &self,
        key: &str,
        now: i64,
        min_elapsed: i64,
        ttl: Duration,
    ) -> Result<RefreshOutcome, TransportError>;
}

struct Entry {
    value: i64,
    expires_at: Instant,
}

/// In-memory dedup store for single-process deployments and tests.
///
/// A single mutex serializes all operations, which makes every trait
/// method atomic with respect to the others.
#[derive(Default)]
pub struct MemoryDedupStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(entries: &mut HashMap<String, Entry>, key: &str) -> Option<i64> {
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, TransportError> {
        self.entries
            .lock()
            .map_err(|e| TransportError::Store(format!("lock poisoned: {}", e)))
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, TransportError> {
        let mut entries = self.lock()?;
        Ok(Self::live_value(&mut entries, key))
    }

    async fn put(&self, key: &str, value: i64, ttl: Duration) -> Result<(), TransportError> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TransportError> {
        let mut entries = self.lock()?;
        entries.remove(key);
        Ok(())
    }

    async fn get_or_put(
        &self,
        key: &str,
        value: i64,
        ttl: Duration,
    ) -> Result<i64, TransportError> {
        let mut entries = self.lock()?;
        let stored = Self::live_value(&mut entries, key).unwrap_or(value);
        entries.insert(
            key.to_string(),
            Entry {
                value: stored,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(stored)
    }

    async fn refresh_if_elapsed(
        &self,
        key: &str,
        now: i64,
        min_elapsed: i64,
        ttl: Duration,
    ) -> Result<RefreshOutcome, TransportError> {
        let mut entries = self.lock()?;
        let previous = Self::live_value(&mut entries, key);
        if let Some(last) = previous {
            if now - last < min_elapsed {
                return Ok(RefreshOutcome::Suppressed { last });
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: now,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(RefreshOutcome::Refreshed { previous })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_get_put_delete() {
        let store = MemoryDedupStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.put("k", 42, TTL).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(42));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expiry() {
        let store = MemoryDedupStore::new();
        store.put("k", 1, Duration::ZERO).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_or_put_keeps_first_value() {
        let store = MemoryDedupStore::new();
        assert_eq!(store.get_or_put("k", 10, TTL).await.unwrap(), 10);
        // second call refreshes the TTL but keeps the original value
        assert_eq!(store.get_or_put("k", 99, TTL).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_refresh_if_elapsed() {
        let store = MemoryDedupStore::new();

        // no record: always refreshes
        assert_eq!(
            store.refresh_if_elapsed("k", 100, 30, TTL).await.unwrap(),
            RefreshOutcome::Refreshed { previous: None }
        );

        // within the window: suppressed, record untouched
        assert_eq!(
            store.refresh_if_elapsed("k", 105, 30, TTL).await.unwrap(),
            RefreshOutcome::Suppressed { last: 100 }
        );
        assert_eq!(store.get("k").await.unwrap(), Some(100));

        // window elapsed: refreshed with the previous value reported
        assert_eq!(
            store.refresh_if_elapsed("k", 140, 30, TTL).await.unwrap(),
            RefreshOutcome::Refreshed {
                previous: Some(100)
            }
        );
        assert_eq!(store.get("k").await.unwrap(), Some(140));
    }
}
