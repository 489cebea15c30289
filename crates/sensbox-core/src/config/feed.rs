//! Configuration change feed settings.

use serde::{Deserialize, Serialize};

/// Live-query change feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Whether the fan-out listener subscribes at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Websocket URL of the live-query server. Derived from the directory URL when empty.
    #[serde(default)]
    pub url: String,
    /// Class holding configuration-intent records.
    #[serde(default = "default_class_name")]
    pub class_name: String,
    /// Topic value the records are filtered on.
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: String::new(),
            class_name: default_class_name(),
            topic: default_topic(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_class_name() -> String {
    "DeviceMessage".to_string()
}

fn default_topic() -> String {
    crate::events::TOPIC_CONFIGURATION.to_string()
}
