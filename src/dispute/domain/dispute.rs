//! Dispute aggregate.

use super::{
    DisputeCategory, DisputeDomainError, DisputeSeverity, DisputeStage, HistoryAction,
    HistoryEntry, ResolutionOption, StageDeadlines,
};
use crate::task_graph::domain::{ProjectId, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisputeId(Uuid);

impl DisputeId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for DisputeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DisputeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameter object for filing a dispute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDispute {
    /// Project the dispute concerns.
    pub project_id: ProjectId,
    /// Task the dispute concerns, if any.
    pub task_id: Option<TaskId>,
    /// Other party to the dispute.
    pub counterparty: String,
    /// Subject matter.
    pub category: DisputeCategory,
    /// Free-text description from the filing party.
    pub description: String,
}

/// Result of an escalation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationStep {
    /// The dispute moved to the next stage.
    Advanced {
        /// Stage before escalation.
        from: DisputeStage,
        /// Stage after escalation.
        to: DisputeStage,
    },
    /// The deadline passed in the last escalation stage; the stage is
    /// unchanged.
    Stalled {
        /// Stage the dispute remains in.
        stage: DisputeStage,
    },
}

/// Dispute aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    id: DisputeId,
    project_id: ProjectId,
    task_id: Option<TaskId>,
    counterparty: String,
    category: DisputeCategory,
    description: String,
    stage: DisputeStage,
    stage_entered_at: DateTime<Utc>,
    stage_deadline: Option<DateTime<Utc>>,
    outcome: Option<String>,
    blocked_task: bool,
    history: Vec<HistoryEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Dispute {
    /// Files a dispute in `identified` with its first deadline armed.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeDomainError::EmptyCounterparty`] when the counterparty
    /// is blank.
    pub fn file(
        request: NewDispute,
        deadlines: &StageDeadlines,
        clock: &impl Clock,
    ) -> Result<Self, DisputeDomainError> {
        let counterparty = request.counterparty.trim();
        if counterparty.is_empty() {
            return Err(DisputeDomainError::EmptyCounterparty);
        }
        let now = clock.utc();
        let stage = DisputeStage::Identified;
        let description = request.description.trim().to_owned();
        Ok(Self {
            id: DisputeId::new(),
            project_id: request.project_id,
            task_id: request.task_id,
            counterparty: counterparty.to_owned(),
            category: request.category,
            description: description.clone(),
            stage,
            stage_entered_at: now,
            stage_deadline: deadlines.for_stage(stage).map(|allowed| now + allowed),
            outcome: None,
            blocked_task: false,
            history: vec![HistoryEntry {
                at: now,
                action: HistoryAction::Filed { description },
            }],
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the dispute identifier.
    #[must_use]
    pub const fn id(&self) -> DisputeId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the disputed task, if any.
    #[must_use]
    pub const fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    /// Returns the other party.
    #[must_use]
    pub fn counterparty(&self) -> &str {
        &self.counterparty
    }

    /// Returns the category.
    #[must_use]
    pub const fn category(&self) -> DisputeCategory {
        self.category
    }

    /// Returns the severity derived from the category.
    #[must_use]
    pub const fn severity(&self) -> DisputeSeverity {
        self.category.severity()
    }

    /// Returns the filing description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the current stage.
    #[must_use]
    pub const fn stage(&self) -> DisputeStage {
        self.stage
    }

    /// Returns when the current stage was entered.
    #[must_use]
    pub const fn stage_entered_at(&self) -> DateTime<Utc> {
        self.stage_entered_at
    }

    /// Returns the current stage deadline, or `None` once resolved.
    #[must_use]
    pub const fn stage_deadline(&self) -> Option<DateTime<Utc>> {
        self.stage_deadline
    }

    /// Returns the agreed outcome once resolved.
    #[must_use]
    pub fn outcome(&self) -> Option<&str> {
        self.outcome.as_deref()
    }

    /// Returns whether filing this dispute blocked its task.
    #[must_use]
    pub const fn blocked_task(&self) -> bool {
        self.blocked_task
    }

    /// Returns the history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the options offered once the dispute reaches mediation.
    #[must_use]
    pub fn resolution_options(&self) -> Vec<ResolutionOption> {
        match self.stage {
            DisputeStage::AiMediation | DisputeStage::ExternalMediation => {
                self.category.resolution_options()
            }
            _ => Vec::new(),
        }
    }

    /// Returns whether the current stage deadline has passed at `now`.
    #[must_use]
    pub fn is_deadline_due(&self, now: DateTime<Utc>) -> bool {
        self.stage_deadline.is_some_and(|deadline| deadline <= now)
    }

    /// Records that filing blocked the disputed task.
    pub const fn mark_task_blocked(&mut self) {
        self.blocked_task = true;
    }

    /// Records a party response.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeDomainError::InvalidTransition`] once resolved and
    /// [`DisputeDomainError::EmptyResponse`] for a blank message.
    pub fn respond(
        &mut self,
        author: &str,
        message: &str,
        clock: &impl Clock,
    ) -> Result<(), DisputeDomainError> {
        self.ensure_open(DisputeStage::Resolved)?;
        let text = message.trim();
        if text.is_empty() {
            return Err(DisputeDomainError::EmptyResponse);
        }
        self.push_history(
            HistoryAction::Response {
                author: author.trim().to_owned(),
                message: text.to_owned(),
            },
            clock,
        );
        Ok(())
    }

    /// Moves the dispute to the next stage.
    ///
    /// Manual escalation from `external_mediation` fails; an automatic one
    /// reports a stall and disarms the deadline instead.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeDomainError::InvalidTransition`] once resolved and
    /// [`DisputeDomainError::NoFurtherStage`] for a manual escalation from
    /// the last escalation stage.
    pub fn escalate(
        &mut self,
        automatic: bool,
        deadlines: &StageDeadlines,
        clock: &impl Clock,
    ) -> Result<EscalationStep, DisputeDomainError> {
        let from = self.stage;
        let Some(to) = from.next() else {
            self.ensure_open(from)?;
            if !automatic {
                return Err(DisputeDomainError::NoFurtherStage {
                    dispute_id: self.id,
                    stage: from,
                });
            }
            self.stage_deadline = None;
            self.push_history(HistoryAction::Stalled { stage: from }, clock);
            return Ok(EscalationStep::Stalled { stage: from });
        };

        let action = if automatic {
            HistoryAction::AutoEscalated {
                from,
                to,
                reason: escalation_reason(from).to_owned(),
            }
        } else {
            HistoryAction::Escalated { from, to }
        };
        self.enter_stage(to, deadlines, clock);
        self.push_history(action, clock);
        Ok(EscalationStep::Advanced { from, to })
    }

    /// Closes the dispute with `outcome` and returns the stage it left.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeDomainError::InvalidTransition`] when already
    /// resolved and [`DisputeDomainError::EmptyOutcome`] for a blank outcome.
    pub fn resolve(
        &mut self,
        outcome: &str,
        clock: &impl Clock,
    ) -> Result<DisputeStage, DisputeDomainError> {
        self.ensure_open(DisputeStage::Resolved)?;
        let agreed = outcome.trim();
        if agreed.is_empty() {
            return Err(DisputeDomainError::EmptyOutcome);
        }
        let from = self.stage;
        self.enter_stage(DisputeStage::Resolved, &StageDeadlines::default(), clock);
        self.outcome = Some(agreed.to_owned());
        self.push_history(
            HistoryAction::Resolved {
                from,
                outcome: agreed.to_owned(),
            },
            clock,
        );
        Ok(from)
    }

    fn ensure_open(&self, requested: DisputeStage) -> Result<(), DisputeDomainError> {
        if self.stage.is_terminal() {
            return Err(DisputeDomainError::InvalidTransition {
                dispute_id: self.id,
                from: self.stage,
                to: requested,
            });
        }
        Ok(())
    }

    fn enter_stage(&mut self, next: DisputeStage, deadlines: &StageDeadlines, clock: &impl Clock) {
        debug_assert!(
            next.ordinal() > self.stage.ordinal(),
            "dispute stage must only move forward"
        );
        let now = clock.utc();
        self.stage = next;
        self.stage_entered_at = now;
        self.stage_deadline = deadlines.for_stage(next).map(|allowed| now + allowed);
    }

    fn push_history(&mut self, action: HistoryAction, clock: &impl Clock) {
        let at = clock.utc();
        self.history.push(HistoryEntry { at, action });
        self.updated_at = at;
    }
}

const fn escalation_reason(from: DisputeStage) -> &'static str {
    match from {
        DisputeStage::Identified => {
            "Identification period expired. Moving to direct resolution."
        }
        DisputeStage::DirectResolution => {
            "Direct resolution period expired. Escalating to AI mediation."
        }
        DisputeStage::AiMediation => "AI mediation period expired. Escalating to external mediation.",
        DisputeStage::ExternalMediation | DisputeStage::Resolved => "Stage deadline expired.",
    }
}
