//! Inbound webhook payloads and synchronization outcomes.

use super::{CardMapping, ListId};
use crate::task_graph::domain::{CardId, Revision, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Card movement reported by the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Card that moved.
    pub card_id: CardId,
    /// List the card is now on.
    pub list_id: ListId,
    /// Board revision of the card after the move.
    pub revision: u64,
    /// When the board recorded the move.
    pub timestamp: DateTime<Utc>,
}

/// Why a webhook changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No task is mapped to the card.
    UnmappedCard,
    /// The list does not correspond to a status.
    UnknownList,
    /// The task already holds this or a newer revision.
    StaleRevision,
    /// The mapping was archived with its project.
    ArchivedMapping,
}

/// Result of handling a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The task now mirrors the card.
    Applied {
        /// Updated task.
        task_id: TaskId,
        /// Status after the change.
        status: TaskStatus,
        /// Revision after the change.
        revision: Revision,
    },
    /// The event was ignored.
    Ignored(IgnoreReason),
}

/// Result of pushing a task to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The card reflects the task.
    Synced(CardMapping),
    /// The card moved on the board while the push was in flight; the task
    /// now mirrors the board instead.
    Superseded {
        /// Task that adopted the board state.
        task_id: TaskId,
        /// Status taken from the board.
        status: TaskStatus,
        /// Board revision the task now holds.
        revision: Revision,
    },
    /// The push did not land; the task stays sync-pending.
    Pending {
        /// Task awaiting a push.
        task_id: TaskId,
        /// Why the push is still owed.
        reason: String,
    },
}

impl PushOutcome {
    /// Returns whether the push reached the board.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }

    /// Returns whether the task still owes the board a push.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}
