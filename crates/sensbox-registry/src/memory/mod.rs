//! In-process registry backend.

pub mod store;

pub use store::MemoryStore;
