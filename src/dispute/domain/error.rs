//! Dispute domain errors.

use super::{DisputeId, DisputeStage};
use thiserror::Error;

/// Errors returned by dispute domain rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DisputeDomainError {
    /// The requested change would move the dispute backwards or out of a
    /// terminal stage.
    #[error("invalid dispute transition for {dispute_id}: {from} -> {to}")]
    InvalidTransition {
        /// Dispute whose transition was rejected.
        dispute_id: DisputeId,
        /// Current stage.
        from: DisputeStage,
        /// Requested stage.
        to: DisputeStage,
    },

    /// Manual escalation was requested from the last escalation stage.
    #[error("dispute {dispute_id} has no stage after {stage}")]
    NoFurtherStage {
        /// Dispute that could not be escalated.
        dispute_id: DisputeId,
        /// Current stage.
        stage: DisputeStage,
    },

    /// The counterparty name is empty after trimming.
    #[error("counterparty must not be empty")]
    EmptyCounterparty,

    /// The resolution outcome is empty after trimming.
    #[error("resolution outcome must not be empty")]
    EmptyOutcome,

    /// A response message is empty after trimming.
    #[error("response message must not be empty")]
    EmptyResponse,
}

/// Error returned while parsing dispute stages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown dispute stage: {0}")]
pub struct ParseDisputeStageError(pub String);
