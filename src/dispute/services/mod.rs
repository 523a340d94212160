//! Dispute lifecycle orchestration and deadline handling.

mod escalation;
mod lifecycle;

pub use escalation::DisputeEscalationHandler;
pub use lifecycle::{
    DeadlineOutcome, DisputeService, DisputeServiceError, DisputeServiceResult, PotentialDispute,
    deadline_key,
};
