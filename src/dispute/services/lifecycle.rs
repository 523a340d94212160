//! Filing, responding, escalating, and resolving disputes.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dispute::{
    domain::{
        Dispute, DisputeDomainError, DisputeId, DisputeSeverity, DisputeStage, EscalationStep,
        NewDispute, StageDeadlines,
    },
    ports::{DisputeRepository, DisputeRepositoryError},
};
use crate::events::{domain::EventPayload, services::EventBus};
use crate::keyed_lock::KeyedLock;
use crate::scheduler::{
    domain::{TimerKey, TimerKind},
    ports::{TimerRepository, TimerRepositoryError},
    services::TimerQueue,
};
use crate::task_graph::{
    domain::{ProjectId, TaskId, TaskStatus},
    ports::TaskGraphRepository,
    services::{TaskGraphService, TaskGraphServiceError},
};

/// Service-level errors for dispute operations.
#[derive(Debug, Error)]
pub enum DisputeServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] DisputeDomainError),
    /// Dispute repository operation failed.
    #[error(transparent)]
    Repository(#[from] DisputeRepositoryError),
    /// Task graph operation failed.
    #[error(transparent)]
    TaskGraph(#[from] TaskGraphServiceError),
    /// Timer store operation failed.
    #[error(transparent)]
    Timer(#[from] TimerRepositoryError),
    /// The dispute does not exist.
    #[error("dispute not found: {0}")]
    NotFound(DisputeId),
    /// The disputed task belongs to a different project.
    #[error("task {task_id} does not belong to project {project_id}")]
    TaskNotInProject {
        /// Disputed task.
        task_id: TaskId,
        /// Project named in the filing.
        project_id: ProjectId,
    },
}

/// Result type for dispute service operations.
pub type DisputeServiceResult<T> = Result<T, DisputeServiceError>;

/// Result of handling a stage deadline timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineOutcome {
    /// The dispute moved to the next stage.
    Escalated {
        /// Stage before escalation.
        from: DisputeStage,
        /// Stage after escalation.
        to: DisputeStage,
    },
    /// The last stage deadline passed; a stall was reported.
    Stalled {
        /// Stage the dispute remains in.
        stage: DisputeStage,
    },
    /// The timer no longer matches the dispute and was discarded.
    Stale,
    /// The deadline has not passed yet.
    NotDue(DateTime<Utc>),
}

/// A blocked task that may warrant a dispute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotentialDispute {
    /// Blocked task.
    pub task_id: TaskId,
    /// Task title.
    pub title: String,
    /// Suggested severity.
    pub severity: DisputeSeverity,
    /// Human-readable reason.
    pub message: String,
}

/// Dispute lifecycle service.
///
/// Every transition of one dispute runs under that dispute's lock, so a
/// deadline timer racing a manual escalation or resolution observes the
/// outcome of the other and discards itself.
pub struct DisputeService<D, G, T, C>
where
    D: DisputeRepository,
    G: TaskGraphRepository,
    T: TimerRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<D>,
    graph: Arc<TaskGraphService<G, C>>,
    timers: TimerQueue<T, C>,
    clock: Arc<C>,
    events: EventBus,
    deadlines: StageDeadlines,
    locks: KeyedLock<DisputeId>,
}

impl<D, G, T, C> DisputeService<D, G, T, C>
where
    D: DisputeRepository,
    G: TaskGraphRepository,
    T: TimerRepository,
    C: Clock + Send + Sync,
{
    /// Creates a dispute service.
    #[must_use]
    pub fn new(
        repository: Arc<D>,
        graph: Arc<TaskGraphService<G, C>>,
        timers: TimerQueue<T, C>,
        clock: Arc<C>,
        events: EventBus,
        deadlines: StageDeadlines,
    ) -> Self {
        Self {
            repository,
            graph,
            timers,
            clock,
            events,
            deadlines,
            locks: KeyedLock::new(),
        }
    }

    /// Returns the configured stage deadlines.
    #[must_use]
    pub const fn deadlines(&self) -> &StageDeadlines {
        &self.deadlines
    }

    /// Files a dispute and arms its first deadline.
    ///
    /// A disputed task that is in progress becomes blocked.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeServiceError`] when the project or task does not
    /// exist, the task belongs to another project, the filing is invalid, or
    /// a store fails.
    pub async fn file(&self, request: NewDispute) -> DisputeServiceResult<Dispute> {
        let project_id = request.project_id;
        self.graph.project(project_id).await?;
        let disputed = match request.task_id {
            Some(task_id) => {
                let task = self.graph.task(task_id).await?;
                if task.project_id() != project_id {
                    return Err(DisputeServiceError::TaskNotInProject {
                        task_id,
                        project_id,
                    });
                }
                Some(task)
            }
            None => None,
        };

        let mut dispute = Dispute::file(request, &self.deadlines, &*self.clock)?;
        let _guard = self.locks.lock(&dispute.id()).await;
        if let Some(task) = disputed.filter(|task| task.status() == TaskStatus::InProgress) {
            let outcome = self
                .graph
                .apply_system_status(task.id(), TaskStatus::Blocked)
                .await?;
            if outcome.status_changed() {
                dispute.mark_task_blocked();
            }
        }
        self.repository.store(&dispute).await?;
        self.arm_deadline(&dispute).await?;

        info!(
            dispute_id = %dispute.id(),
            %project_id,
            category = %dispute.category(),
            severity = %dispute.severity(),
            "dispute filed"
        );
        self.events.emit(
            project_id,
            EventPayload::DisputeFiled {
                dispute_id: dispute.id(),
                category: dispute.category(),
                severity: dispute.severity(),
                counterparty: dispute.counterparty().to_owned(),
            },
            &*self.clock,
        );
        Ok(dispute)
    }

    /// Records a party response.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeServiceError`] when the dispute does not exist, is
    /// resolved, or cannot be stored.
    pub async fn respond(
        &self,
        dispute_id: DisputeId,
        author: &str,
        message: &str,
    ) -> DisputeServiceResult<Dispute> {
        let _guard = self.locks.lock(&dispute_id).await;
        let mut dispute = self.load(dispute_id).await?;
        dispute.respond(author, message, &*self.clock)?;
        self.repository.update(&dispute).await?;
        debug!(%dispute_id, "dispute response recorded");
        Ok(dispute)
    }

    /// Escalates a dispute to its next stage by hand.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeServiceError::Domain`] from `external_mediation` or
    /// once resolved, and other variants when a store fails.
    pub async fn escalate(&self, dispute_id: DisputeId) -> DisputeServiceResult<Dispute> {
        let _guard = self.locks.lock(&dispute_id).await;
        let mut dispute = self.load(dispute_id).await?;
        let step = dispute.escalate(false, &self.deadlines, &*self.clock)?;
        self.record_step(&dispute, step, false).await?;
        Ok(dispute)
    }

    /// Resolves a dispute from any open stage.
    ///
    /// Cancels the pending deadline and unblocks a task this dispute blocked
    /// when no other open dispute still holds it.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeServiceError::Domain`] when already resolved and other
    /// variants when a store fails.
    pub async fn resolve(
        &self,
        dispute_id: DisputeId,
        outcome: &str,
    ) -> DisputeServiceResult<Dispute> {
        let _guard = self.locks.lock(&dispute_id).await;
        let mut dispute = self.load(dispute_id).await?;
        let from = dispute.resolve(outcome, &*self.clock)?;
        self.repository.update(&dispute).await?;
        self.timers.cancel(&deadline_key(dispute_id)).await?;
        self.release_task(&dispute).await?;

        info!(%dispute_id, %from, "dispute resolved");
        self.events.emit(
            dispute.project_id(),
            EventPayload::DisputeResolved {
                dispute_id,
                from,
                outcome: dispute.outcome().unwrap_or_default().to_owned(),
            },
            &*self.clock,
        );
        Ok(dispute)
    }

    /// Handles a deadline timer armed while the dispute was in
    /// `armed_stage`.
    ///
    /// A timer for a dispute that has since moved stage, or has been
    /// resolved, is stale and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeServiceError`] when a store fails; the timer should
    /// then be retried.
    pub async fn handle_deadline(
        &self,
        dispute_id: DisputeId,
        armed_stage: DisputeStage,
    ) -> DisputeServiceResult<DeadlineOutcome> {
        let _guard = self.locks.lock(&dispute_id).await;
        let Some(mut dispute) = self.repository.find(dispute_id).await? else {
            warn!(%dispute_id, "deadline fired for unknown dispute");
            return Ok(DeadlineOutcome::Stale);
        };
        if dispute.stage() != armed_stage {
            debug!(
                %dispute_id,
                %armed_stage,
                current = %dispute.stage(),
                "discarding deadline armed for an earlier stage"
            );
            return Ok(DeadlineOutcome::Stale);
        }
        let Some(deadline) = dispute.stage_deadline() else {
            return Ok(DeadlineOutcome::Stale);
        };
        if !dispute.is_deadline_due(self.clock.utc()) {
            return Ok(DeadlineOutcome::NotDue(deadline));
        }

        let step = dispute.escalate(true, &self.deadlines, &*self.clock)?;
        self.record_step(&dispute, step, true).await?;
        Ok(match step {
            EscalationStep::Advanced { from, to } => DeadlineOutcome::Escalated { from, to },
            EscalationStep::Stalled { stage } => DeadlineOutcome::Stalled { stage },
        })
    }

    /// Returns a dispute by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeServiceError::NotFound`] when it does not exist.
    pub async fn dispute(&self, dispute_id: DisputeId) -> DisputeServiceResult<Dispute> {
        self.load(dispute_id).await
    }

    /// Returns the disputes of a project, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeServiceError::Repository`] on repository failure.
    pub async fn disputes_for_project(
        &self,
        project_id: ProjectId,
    ) -> DisputeServiceResult<Vec<Dispute>> {
        Ok(self.repository.list_for_project(project_id).await?)
    }

    /// Lists blocked tasks with no open dispute as dispute candidates.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeServiceError`] on repository failure.
    pub async fn detect_potential(
        &self,
        project_id: ProjectId,
    ) -> DisputeServiceResult<Vec<PotentialDispute>> {
        let mut candidates = Vec::new();
        for task in self.graph.blocked_tasks(project_id).await? {
            if !self.repository.open_for_task(task.id()).await?.is_empty() {
                continue;
            }
            candidates.push(PotentialDispute {
                task_id: task.id(),
                message: format!("Task '{}' has been blocked", task.title()),
                title: task.title().to_owned(),
                severity: DisputeSeverity::Medium,
            });
        }
        Ok(candidates)
    }

    async fn load(&self, dispute_id: DisputeId) -> DisputeServiceResult<Dispute> {
        self.repository
            .find(dispute_id)
            .await?
            .ok_or(DisputeServiceError::NotFound(dispute_id))
    }

    async fn arm_deadline(&self, dispute: &Dispute) -> DisputeServiceResult<()> {
        let Some(due_at) = dispute.stage_deadline() else {
            return Ok(());
        };
        self.timers
            .schedule(
                TimerKind::DisputeEscalation,
                dispute.id().into_inner(),
                due_at,
                json!({ "stage": dispute.stage() }),
            )
            .await?;
        Ok(())
    }

    async fn record_step(
        &self,
        dispute: &Dispute,
        step: EscalationStep,
        automatic: bool,
    ) -> DisputeServiceResult<()> {
        self.repository.update(dispute).await?;
        let dispute_id = dispute.id();
        let payload = match step {
            EscalationStep::Advanced { from, to } => {
                self.arm_deadline(dispute).await?;
                info!(%dispute_id, %from, %to, automatic, "dispute escalated");
                EventPayload::DisputeEscalated {
                    dispute_id,
                    from,
                    to,
                    automatic,
                }
            }
            EscalationStep::Stalled { stage } => {
                warn!(%dispute_id, %stage, "dispute stalled with no further escalation stage");
                EventPayload::DisputeStalled { dispute_id, stage }
            }
        };
        self.events.emit(dispute.project_id(), payload, &*self.clock);
        Ok(())
    }

    async fn release_task(&self, dispute: &Dispute) -> DisputeServiceResult<()> {
        let Some(task_id) = dispute.task_id().filter(|_| dispute.blocked_task()) else {
            return Ok(());
        };
        if !self.repository.open_for_task(task_id).await?.is_empty() {
            debug!(%task_id, "task still held by another open dispute");
            return Ok(());
        }
        let task = self.graph.task(task_id).await?;
        if task.status() != TaskStatus::Blocked {
            return Ok(());
        }
        self.graph
            .apply_system_status(task_id, TaskStatus::InProgress)
            .await?;
        Ok(())
    }
}

/// Returns the scheduler key of a dispute's deadline timer.
#[must_use]
pub fn deadline_key(dispute_id: DisputeId) -> TimerKey {
    TimerKey::new(TimerKind::DisputeEscalation, dispute_id.into_inner())
}
