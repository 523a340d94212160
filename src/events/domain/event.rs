//! Domain event envelope.

use crate::budget::domain::{Money, Threshold};
use crate::dispute::domain::{DisputeCategory, DisputeId, DisputeSeverity, DisputeStage};
use crate::task_graph::domain::{
    ChangeSource, PhaseId, PhaseKind, PhaseStatus, ProjectId, Revision, TaskId, TaskStatus,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A task status change was accepted.
    TaskChanged {
        /// Changed task.
        task_id: TaskId,
        /// Phase owning the task.
        phase_id: PhaseId,
        /// Task title at the time of the change.
        title: String,
        /// Status before the change.
        previous: TaskStatus,
        /// Status after the change.
        current: TaskStatus,
        /// Revision stamped on the change.
        revision: Revision,
        /// Origin of the change.
        source: ChangeSource,
    },
    /// A phase's derived status changed.
    PhaseStatusChanged {
        /// Changed phase.
        phase_id: PhaseId,
        /// Canonical phase kind.
        kind: PhaseKind,
        /// Status before the change.
        previous: PhaseStatus,
        /// Status after the change.
        current: PhaseStatus,
    },
    /// A dispute was filed.
    DisputeFiled {
        /// New dispute.
        dispute_id: DisputeId,
        /// Dispute category.
        category: DisputeCategory,
        /// Derived severity.
        severity: DisputeSeverity,
        /// Counterparty named in the dispute.
        counterparty: String,
    },
    /// A dispute moved to the next stage.
    DisputeEscalated {
        /// Escalated dispute.
        dispute_id: DisputeId,
        /// Stage left.
        from: DisputeStage,
        /// Stage entered.
        to: DisputeStage,
        /// Whether a deadline timer triggered the escalation.
        automatic: bool,
    },
    /// A dispute's final stage deadline elapsed with no stage left.
    DisputeStalled {
        /// Stalled dispute.
        dispute_id: DisputeId,
        /// Stage whose deadline elapsed.
        stage: DisputeStage,
    },
    /// A dispute was resolved.
    DisputeResolved {
        /// Resolved dispute.
        dispute_id: DisputeId,
        /// Stage the dispute was resolved from.
        from: DisputeStage,
        /// Recorded outcome.
        outcome: String,
    },
    /// Budget exposure crossed a threshold for the first time.
    BudgetThresholdCrossed {
        /// Crossed threshold.
        threshold: Threshold,
        /// Exposure after the update.
        exposure: Money,
        /// Approved budget.
        approved: Money,
        /// Exposure ratio in basis points.
        ratio_bps: u64,
    },
    /// An update moved the budget outside `spent <= committed <= approved`.
    BudgetInvariantViolated {
        /// Approved budget.
        approved: Money,
        /// Committed amount.
        committed: Money,
        /// Spent amount.
        spent: Money,
    },
}

impl EventPayload {
    /// Returns the stable event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::TaskChanged { .. } => "task_changed",
            Self::PhaseStatusChanged { .. } => "phase_status_changed",
            Self::DisputeFiled { .. } => "dispute_filed",
            Self::DisputeEscalated { .. } => "dispute_escalated",
            Self::DisputeStalled { .. } => "dispute_stalled",
            Self::DisputeResolved { .. } => "dispute_resolved",
            Self::BudgetThresholdCrossed { .. } => "budget_threshold_crossed",
            Self::BudgetInvariantViolated { .. } => "budget_invariant_violated",
        }
    }
}

/// Envelope carried through the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event identifier.
    pub id: EventId,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Project the event belongs to.
    pub project_id: ProjectId,
    /// Event-specific data.
    pub payload: EventPayload,
}

impl DomainEvent {
    /// Creates an event stamped with the current clock time.
    #[must_use]
    pub fn new(project_id: ProjectId, payload: EventPayload, clock: &impl Clock) -> Self {
        Self {
            id: EventId::new(),
            occurred_at: clock.utc(),
            project_id,
            payload,
        }
    }

    /// Returns the stable event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
