//! Lifecycle and configuration messages published by the overlay.
//!
//! These are the only payload shapes the overlay itself produces. Devices
//! and downstream subscribers consume them as JSON on the fixed topics
//! below.

pub mod lifecycle;

pub use lifecycle::{ConfigurationMessage, LifecycleEvent};

/// Topic announcing a device that became reachable.
pub const TOPIC_CONNECTED: &str = "agent/connected";

/// Topic announcing a device that is no longer reachable.
pub const TOPIC_DISCONNECTED: &str = "agent/disconnected";

/// Topic devices publish telemetry on.
pub const TOPIC_MESSAGE: &str = "agent/message";

/// Topic configuration updates are unicast on.
pub const TOPIC_CONFIGURATION: &str = "agent/configuration";
