//! In-memory key-value store using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tracing::debug;

use sensbox_core::result::AppResult;
use sensbox_core::traits::KeyValueStore;

/// A stored value together with the lifetime it was written with.
#[derive(Debug, Clone)]
struct Row {
    value: String,
    ttl: Duration,
}

/// Every write restarts the row's lifetime with the TTL passed to `set`.
#[derive(Debug)]
struct RowExpiry;

impl Expiry<String, Row> for RowExpiry {
    fn expire_after_create(&self, _key: &String, row: &Row, _created_at: Instant) -> Option<Duration> {
        Some(row.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        row: &Row,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(row.ttl)
    }
}

/// Single-process key-value store.
///
/// Unbounded: rows leave only when deleted or when their TTL runs out.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    cache: Cache<String, Row>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        let cache = Cache::builder().expire_after(RowExpiry).build();
        Self { cache }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await.map(|row| row.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let row = Row {
            value: value.to_string(),
            ttl,
        };
        self.cache.insert(key.to_string(), row).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|entry| entry.0.starts_with(prefix))
            .map(|entry| entry.0.to_string())
            .collect();

        debug!(prefix, count = keys.len(), "Scanned keys");
        Ok(keys)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
