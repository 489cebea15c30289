//! Seams to the external collaborators, implemented by other crates.

pub mod directory;
pub mod engine;
pub mod feed;
pub mod store;

pub use directory::{Credential, DirectoryService, ProcessingService};
pub use engine::MessagingEngine;
pub use feed::{ChangeFeed, ConfigurationStream};
pub use store::KeyValueStore;
