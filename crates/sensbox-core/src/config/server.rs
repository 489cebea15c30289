//! Process-level server settings.

use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Identifier of this broker process inside a cluster.
    #[serde(default = "default_node_id")]
    pub node_id: String,
    /// Bind address for the admin HTTP surface.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the admin HTTP surface (`/health`, `/metrics`).
    #[serde(default = "default_admin_port")]
    pub admin_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            host: default_host(),
            admin_port: default_admin_port(),
        }
    }
}

fn default_node_id() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "sensbox".to_string())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_admin_port() -> u16 {
    9090
}
