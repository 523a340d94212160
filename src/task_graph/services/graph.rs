//! Service layer owning every task and phase mutation.

use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{domain::EventPayload, services::EventBus};
use crate::keyed_lock::KeyedLock;
use crate::task_graph::{
    domain::{
        ApplyOutcome, CardId, Phase, PhaseId, PhaseKind, PhaseStatus, Project, ProjectId,
        ProjectStage, Revision, StatusChange, SyncConfirmation, Task, TaskGraphDomainError, TaskId,
        TaskStatus, UserId,
    },
    ports::{TaskGraphRepository, TaskGraphRepositoryError},
};

/// Request payload for creating a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProjectRequest {
    owner: UserId,
    title: String,
}

impl CreateProjectRequest {
    /// Creates a request for `owner` titled `title`.
    #[must_use]
    pub fn new(owner: UserId, title: impl Into<String>) -> Self {
        Self {
            owner,
            title: title.into(),
        }
    }
}

/// A project with its phases and tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectGraph {
    /// The project.
    pub project: Project,
    /// Phases in build order.
    pub phases: Vec<Phase>,
    /// Tasks ordered by phase then position.
    pub tasks: Vec<Task>,
}

/// Service-level errors for task graph operations.
#[derive(Debug, Error)]
pub enum TaskGraphServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskGraphDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskGraphRepositoryError),
    /// The task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// The project does not exist.
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),
    /// The phase does not exist.
    #[error("phase not found: {0}")]
    PhaseNotFound(PhaseId),
}

/// Result type for task graph service operations.
pub type TaskGraphServiceResult<T> = Result<T, TaskGraphServiceError>;

/// Task graph orchestration service.
///
/// Task writes are optimistic: each attempt reads the task, applies the
/// change in memory, and stores it with a compare-and-swap on the row
/// version, retrying from a fresh read when another writer got there first.
/// The retry re-runs the revision check, so a racing writer that offered the
/// same revision is rejected rather than applied twice.
pub struct TaskGraphService<R, C>
where
    R: TaskGraphRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    events: EventBus,
    phase_locks: KeyedLock<PhaseId>,
}

impl<R, C> TaskGraphService<R, C>
where
    R: TaskGraphRepository,
    C: Clock + Send + Sync,
{
    /// Creates a task graph service.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>, events: EventBus) -> Self {
        Self {
            repository,
            clock,
            events,
            phase_locks: KeyedLock::new(),
        }
    }

    /// Creates a draft project seeded with the canonical phases and their
    /// standard tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError`] when the title is blank or the
    /// repository rejects persistence.
    pub async fn create_project(
        &self,
        request: CreateProjectRequest,
    ) -> TaskGraphServiceResult<ProjectGraph> {
        let project = Project::new(request.owner, request.title, &*self.clock)?;
        let mut phases = Vec::with_capacity(PhaseKind::ALL.len());
        let mut tasks = Vec::new();
        for (phase_index, kind) in PhaseKind::ALL.into_iter().enumerate() {
            let phase = Phase::new(
                project.id(),
                kind,
                u8::try_from(phase_index).unwrap_or(u8::MAX),
            );
            for (task_index, title) in kind.standard_tasks().iter().enumerate() {
                tasks.push(Task::new(
                    project.id(),
                    phase.id(),
                    *title,
                    u16::try_from(task_index).unwrap_or(u16::MAX),
                    &*self.clock,
                )?);
            }
            phases.push(phase);
        }

        self.repository
            .store_project(&project, &phases, &tasks)
            .await?;
        info!(
            project_id = %project.id(),
            phases = phases.len(),
            tasks = tasks.len(),
            "project created"
        );
        Ok(ProjectGraph {
            project,
            phases,
            tasks,
        })
    }

    /// Moves a project to a later lifecycle stage.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::ProjectNotFound`] for an unknown
    /// project and [`TaskGraphServiceError::Domain`] when `target` is not
    /// ahead of the current stage.
    pub async fn advance_stage(
        &self,
        project_id: ProjectId,
        target: ProjectStage,
    ) -> TaskGraphServiceResult<Project> {
        let mut project = self.project(project_id).await?;
        let previous = project.stage();
        project.advance_to(target, &*self.clock)?;
        self.repository.update_project(&project).await?;
        info!(%project_id, from = %previous, to = %target, "project stage advanced");
        Ok(project)
    }

    /// Returns a project.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::ProjectNotFound`] for an unknown
    /// project.
    pub async fn project(&self, project_id: ProjectId) -> TaskGraphServiceResult<Project> {
        self.repository
            .find_project(project_id)
            .await?
            .ok_or(TaskGraphServiceError::ProjectNotFound(project_id))
    }

    /// Returns every project.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::Repository`] on repository failure.
    pub async fn projects(&self) -> TaskGraphServiceResult<Vec<Project>> {
        Ok(self.repository.list_projects().await?)
    }

    /// Returns a project with its phases and tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::ProjectNotFound`] for an unknown
    /// project.
    pub async fn project_graph(&self, project_id: ProjectId) -> TaskGraphServiceResult<ProjectGraph> {
        let project = self.project(project_id).await?;
        let phases = self.repository.phases_for_project(project_id).await?;
        let tasks = self.repository.tasks_for_project(project_id).await?;
        Ok(ProjectGraph {
            project,
            phases,
            tasks,
        })
    }

    /// Returns a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::TaskNotFound`] for an unknown task.
    pub async fn task(&self, task_id: TaskId) -> TaskGraphServiceResult<Task> {
        self.repository
            .find_task(task_id)
            .await?
            .ok_or(TaskGraphServiceError::TaskNotFound(task_id))
    }

    /// Returns a phase.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::PhaseNotFound`] for an unknown phase.
    pub async fn phase(&self, phase_id: PhaseId) -> TaskGraphServiceResult<Phase> {
        self.repository
            .find_phase(phase_id)
            .await?
            .ok_or(TaskGraphServiceError::PhaseNotFound(phase_id))
    }

    /// Returns the blocked tasks of a project.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::Repository`] on repository failure.
    pub async fn blocked_tasks(&self, project_id: ProjectId) -> TaskGraphServiceResult<Vec<Task>> {
        let tasks = self.repository.tasks_for_project(project_id).await?;
        Ok(tasks
            .into_iter()
            .filter(|task| task.status() == TaskStatus::Blocked)
            .collect())
    }

    /// Returns the tasks of a project that have never reached the board or
    /// carry an unpushed change.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::Repository`] on repository failure.
    pub async fn tasks_needing_push(
        &self,
        project_id: ProjectId,
    ) -> TaskGraphServiceResult<Vec<Task>> {
        let tasks = self.repository.tasks_for_project(project_id).await?;
        Ok(tasks
            .into_iter()
            .filter(|task| task.sync_pending() || task.card_id().is_none())
            .collect())
    }

    /// Applies `change` to a task if board `revision` is newer than the
    /// stored one.
    ///
    /// A stale revision is reported as [`ApplyOutcome::Rejected`], not as an
    /// error. An accepted change that alters the status emits `TaskChanged`
    /// and re-derives the phase status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::TaskNotFound`] for an unknown task
    /// and [`TaskGraphServiceError::Domain`] when a user or system change
    /// violates the lifecycle.
    pub async fn apply(
        &self,
        task_id: TaskId,
        change: StatusChange,
        revision: Revision,
    ) -> TaskGraphServiceResult<ApplyOutcome> {
        loop {
            let mut task = self.task(task_id).await?;
            let outcome = task.apply_change(change, revision, &*self.clock)?;
            if let Some(committed) = self.commit(&task, outcome, change).await? {
                return Ok(committed);
            }
        }
    }

    /// Applies an internal change written against local version `based_on`.
    ///
    /// The task's board revision is untouched; a writer whose view was
    /// replaced by another change is rejected as stale.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn apply_local(
        &self,
        task_id: TaskId,
        change: StatusChange,
        based_on: u64,
    ) -> TaskGraphServiceResult<ApplyOutcome> {
        loop {
            let mut task = self.task(task_id).await?;
            let outcome = task.apply_local_change(change, based_on, &*self.clock)?;
            if let Some(committed) = self.commit(&task, outcome, change).await? {
                return Ok(committed);
            }
        }
    }

    /// Applies a user-initiated status change to the task as currently
    /// stored.
    ///
    /// Two users racing from the same local version both base their change
    /// on it; the second is rejected as stale.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn apply_user_status(
        &self,
        task_id: TaskId,
        target: TaskStatus,
    ) -> TaskGraphServiceResult<ApplyOutcome> {
        let task = self.task(task_id).await?;
        self.apply_local(task_id, StatusChange::user(target), task.local_version())
            .await
    }

    /// Applies a change raised by internal automation to the task as
    /// currently stored.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn apply_system_status(
        &self,
        task_id: TaskId,
        target: TaskStatus,
    ) -> TaskGraphServiceResult<ApplyOutcome> {
        let task = self.task(task_id).await?;
        self.apply_local(task_id, StatusChange::system(target), task.local_version())
            .await
    }

    /// Persists an applied change and publishes its effects.
    ///
    /// Returns `None` when a concurrent write won the compare-and-swap and
    /// the caller should retry against the fresh task.
    async fn commit(
        &self,
        task: &Task,
        outcome: ApplyOutcome,
        change: StatusChange,
    ) -> TaskGraphServiceResult<Option<ApplyOutcome>> {
        let task_id = task.id();
        if let ApplyOutcome::Rejected(rejection) = outcome {
            debug!(%task_id, ?rejection, source = ?change.source, "status change rejected");
            return Ok(Some(outcome));
        }
        if !self.repository.compare_and_swap_task(task).await? {
            debug!(%task_id, "concurrent task write, retrying");
            return Ok(None);
        }

        if outcome.status_changed() {
            info!(
                %task_id,
                status = %task.status(),
                revision = %task.revision(),
                local_version = task.local_version(),
                source = ?change.source,
                "task status changed"
            );
            self.emit_task_changed(task, outcome, change);
            self.recompute_phase(task.project_id(), task.phase_id())
                .await?;
        }
        Ok(Some(outcome))
    }

    /// Records the board card backing a task.
    ///
    /// A task already backed by a different card keeps its card; the
    /// conflict is logged.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::TaskNotFound`] for an unknown task.
    pub async fn attach_card(&self, task_id: TaskId, card_id: CardId) -> TaskGraphServiceResult<Task> {
        loop {
            let mut task = self.task(task_id).await?;
            if task.card_id() == Some(&card_id) {
                return Ok(task);
            }
            if !task.attach_card(card_id.clone()) {
                warn!(%task_id, %card_id, existing = ?task.card_id(), "task already backed by another card");
                return Ok(task);
            }
            if self.repository.compare_and_swap_task(&task).await? {
                return Ok(task);
            }
        }
    }

    /// Marks a push of local version `pushed_version` stamped with
    /// `board_revision`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::TaskNotFound`] for an unknown task.
    pub async fn confirm_sync(
        &self,
        task_id: TaskId,
        pushed_version: u64,
        board_revision: Revision,
    ) -> TaskGraphServiceResult<SyncConfirmation> {
        loop {
            let mut task = self.task(task_id).await?;
            let confirmation = task.confirm_sync(pushed_version, board_revision, &*self.clock);
            if confirmation != SyncConfirmation::Confirmed {
                debug!(
                    %task_id,
                    pushed_version,
                    current = task.local_version(),
                    ?confirmation,
                    "task moved during push"
                );
                return Ok(confirmation);
            }
            if self.repository.compare_and_swap_task(&task).await? {
                return Ok(confirmation);
            }
        }
    }

    /// Flags a task for a board push.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphServiceError::TaskNotFound`] for an unknown task.
    pub async fn mark_sync_pending(&self, task_id: TaskId) -> TaskGraphServiceResult<()> {
        loop {
            let mut task = self.task(task_id).await?;
            if task.sync_pending() {
                return Ok(());
            }
            task.mark_sync_pending(&*self.clock);
            if self.repository.compare_and_swap_task(&task).await? {
                return Ok(());
            }
        }
    }

    fn emit_task_changed(&self, task: &Task, outcome: ApplyOutcome, change: StatusChange) {
        let ApplyOutcome::Applied {
            previous,
            current,
            revision,
        } = outcome
        else {
            return;
        };
        self.events.emit(
            task.project_id(),
            EventPayload::TaskChanged {
                task_id: task.id(),
                phase_id: task.phase_id(),
                title: task.title().to_owned(),
                previous,
                current,
                revision,
                source: change.source,
            },
            &*self.clock,
        );
    }

    async fn recompute_phase(
        &self,
        project_id: ProjectId,
        phase_id: PhaseId,
    ) -> TaskGraphServiceResult<()> {
        let _guard = self.phase_locks.lock(&phase_id).await;
        let mut phase = self.phase(phase_id).await?;
        let tasks = self.repository.tasks_for_phase(phase_id).await?;
        let derived = PhaseStatus::aggregate(tasks.iter().map(Task::status));
        if derived == phase.status() {
            return Ok(());
        }
        let previous = phase.set_status(derived);
        self.repository.update_phase(&phase).await?;
        info!(%phase_id, kind = %phase.kind(), from = %previous, to = %derived, "phase status changed");
        self.events.emit(
            project_id,
            EventPayload::PhaseStatusChanged {
                phase_id,
                kind: phase.kind(),
                previous,
                current: derived,
            },
            &*self.clock,
        );
        Ok(())
    }
}
