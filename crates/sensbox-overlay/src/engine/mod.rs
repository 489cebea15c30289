//! In-process messaging engine: the publish side a transport adapter
//! plugs device connections into.

pub mod handle;
pub mod local;

pub use handle::{ConnectionHandle, OutboundPacket};
pub use local::LocalEngine;
