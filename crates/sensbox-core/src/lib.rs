//! # sensbox-core
//!
//! Core crate for the Sensbox presence overlay. Contains the seams to the
//! external collaborators (key-value store, messaging engine, directory
//! service, change feed), configuration schemas, device/session types,
//! lifecycle events, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Sensbox crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
