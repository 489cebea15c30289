//! Key-value store trait behind the connection registry.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for registry backends (in-process table or clustered Redis).
///
/// Values are opaque strings; the registry layers JSON on top. Every error
/// returned here is a soft failure of kind `StoreUnavailable`.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Delete a key.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// List every key starting with `prefix`. Full scan of the key space.
    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
