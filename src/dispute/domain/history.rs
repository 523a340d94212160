//! Append-only dispute history.

use super::DisputeStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened in a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HistoryAction {
    /// The dispute was filed.
    Filed {
        /// Description given at filing.
        description: String,
    },
    /// A party responded.
    Response {
        /// Who responded.
        author: String,
        /// Response text.
        message: String,
    },
    /// A party escalated the dispute by hand.
    Escalated {
        /// Stage before escalation.
        from: DisputeStage,
        /// Stage after escalation.
        to: DisputeStage,
    },
    /// A stage deadline passed and the dispute moved on.
    AutoEscalated {
        /// Stage before escalation.
        from: DisputeStage,
        /// Stage after escalation.
        to: DisputeStage,
        /// Explanation shown to the parties.
        reason: String,
    },
    /// The last stage deadline passed with no stage left to move to.
    Stalled {
        /// Stage the dispute is stuck in.
        stage: DisputeStage,
    },
    /// The dispute was closed.
    Resolved {
        /// Stage the dispute was closed from.
        from: DisputeStage,
        /// Agreed outcome.
        outcome: String,
    },
}

/// One timestamped history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the action happened.
    pub at: DateTime<Utc>,
    /// What happened.
    #[serde(flatten)]
    pub action: HistoryAction,
}
