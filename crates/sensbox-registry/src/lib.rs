//! # sensbox-registry
//!
//! The connection registry: a key-value mapping from connection id to the
//! cached device session, shared by every hook in the process and, with the
//! Redis backend, by every broker process in the cluster.
//!
//! - **memory**: in-process table using [moka](https://crates.io/crates/moka)
//! - **redis**: clustered store using the [redis](https://crates.io/crates/redis) crate
//!
//! The backend is selected at runtime from configuration; the overlay only
//! ever sees [`ConnectionRegistry`].

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod registry;

pub use provider::StoreManager;
pub use registry::{ConnectionRegistry, RegistryEntry};
