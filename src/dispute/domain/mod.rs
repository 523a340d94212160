//! Dispute domain types.

mod category;
mod deadlines;
mod dispute;
mod error;
mod history;
mod stage;

pub use category::{DisputeCategory, DisputeSeverity, ResolutionOption};
pub use deadlines::StageDeadlines;
pub use dispute::{Dispute, DisputeId, EscalationStep, NewDispute};
pub use error::{DisputeDomainError, ParseDisputeStageError};
pub use history::{HistoryAction, HistoryEntry};
pub use stage::DisputeStage;
