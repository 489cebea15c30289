//! Configuration fan-out: unicast of configuration records to the live
//! connections of their target device.

pub mod dispatcher;
pub mod listener;

pub use dispatcher::ConfigurationFanout;
