//! Board synchronization domain types.

mod backoff;
mod error;
mod layout;
mod mapping;
mod sync_state;
mod webhook;

pub use backoff::BackoffPolicy;
pub use error::BoardSyncDomainError;
pub use layout::{BoardLayout, ListId};
pub use mapping::CardMapping;
pub use sync_state::{ProjectSyncState, SyncStatus, board_state_hash};
pub use webhook::{IgnoreReason, PushOutcome, WebhookEvent, WebhookOutcome};
