//! Device presence reconciliation.

pub mod reconciler;
pub mod slots;
pub mod state;

pub use reconciler::{IdentifyOutcome, PresenceReconciler};
pub use slots::SlotTable;
pub use state::ConnectionState;
