//! # sensbox-directory
//!
//! Clients for the Directory Service side of the overlay:
//!
//! - [`CloudDirectory`]: Cloud Code RPC client implementing both the
//!   directory (authorization, connect/disconnect) and processing
//!   (telemetry hand-off) surfaces
//! - [`LiveQueryFeed`]: websocket subscription delivering newly created
//!   configuration records

pub mod client;
pub mod live_query;
pub mod service;

pub use client::CloudClient;
pub use live_query::LiveQueryFeed;
pub use service::CloudDirectory;
