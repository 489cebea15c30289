//! # sensbox-overlay
//!
//! Identity-aware overlay on top of a pub/sub messaging engine:
//!
//! - Connect-time credential checks against the Directory Service
//! - Per-connection presence state machine (`New -> Identified -> Closed`)
//!   emitting `agent/connected` / `agent/disconnected`
//! - Routing of `agent/message` payloads to the Processing Service
//! - Unicast fan-out of configuration records to live device connections
//! - An in-process engine implementation for embedding transports and tests

pub mod auth;
pub mod engine;
pub mod fanout;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod router;
pub mod server;

pub use auth::{AuthBridge, AuthDecision};
pub use engine::LocalEngine;
pub use fanout::ConfigurationFanout;
pub use metrics::OverlayMetrics;
pub use presence::PresenceReconciler;
pub use router::MessageRouter;
pub use server::Overlay;
