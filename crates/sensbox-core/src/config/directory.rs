//! Directory Service endpoint configuration.

use serde::{Deserialize, Serialize};

/// Directory (and Processing) Service RPC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL of the Cloud Code server, e.g. `https://core.example.com/parse`.
    #[serde(default = "default_url")]
    pub url: String,
    /// Application id sent with every call.
    #[serde(default)]
    pub app_id: String,
    /// Privileged key sent with every call.
    #[serde(default)]
    pub master_key: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            app_id: String::new(),
            master_key: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:1337/parse".to_string()
}

fn default_timeout() -> u64 {
    10
}
