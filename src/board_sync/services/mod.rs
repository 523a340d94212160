//! Board adapter, reconciliation, and the resync timer handler.

mod adapter;
mod reconcile;
mod resync;

pub use adapter::{BoardAdapter, BoardSyncServiceError, BoardSyncServiceResult};
pub use reconcile::{ReconcileReport, ReconciliationEngine};
pub use resync::BoardResyncHandler;
