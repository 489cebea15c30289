//! Shared domain types.

pub mod configuration;
pub mod device;
pub mod id;

pub use configuration::ConfigurationEvent;
pub use device::{DeviceIdentity, DeviceRef, DeviceSession, PayloadReceipt};
pub use id::ConnectionId;
