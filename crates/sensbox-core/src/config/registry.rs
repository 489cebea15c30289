//! Connection registry backend configuration.

use serde::{Deserialize, Serialize};

/// Top-level registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Backend type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Lifetime of a registry row in seconds. Bounds rows leaked by a crash;
    /// every write to a row restarts it.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
    /// Redis backend configuration.
    #[serde(default)]
    pub redis: RedisStoreConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            session_ttl_seconds: default_session_ttl(),
            redis: RedisStoreConfig::default(),
        }
    }
}

/// Redis backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Redis connection URL (DSN).
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for every registry key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_session_ttl() -> u64 {
    86_400
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "sensbox:".to_string()
}
