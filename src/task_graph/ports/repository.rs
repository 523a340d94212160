//! Repository port for projects, phases, and tasks.

use crate::task_graph::domain::{Phase, PhaseId, Project, ProjectId, Task, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task graph repository operations.
pub type TaskGraphRepositoryResult<T> = Result<T, TaskGraphRepositoryError>;

/// Task graph persistence contract.
#[async_trait]
pub trait TaskGraphRepository: Send + Sync {
    /// Stores a new project together with its phases and tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphRepositoryError::DuplicateProject`] when the
    /// project identifier already exists.
    async fn store_project(
        &self,
        project: &Project,
        phases: &[Phase],
        tasks: &[Task],
    ) -> TaskGraphRepositoryResult<()>;

    /// Persists changes to an existing project.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphRepositoryError::ProjectNotFound`] when the project
    /// does not exist.
    async fn update_project(&self, project: &Project) -> TaskGraphRepositoryResult<()>;

    /// Finds a project by identifier.
    async fn find_project(&self, id: ProjectId) -> TaskGraphRepositoryResult<Option<Project>>;

    /// Returns every stored project.
    async fn list_projects(&self) -> TaskGraphRepositoryResult<Vec<Project>>;

    /// Returns the phases of a project in build order.
    async fn phases_for_project(&self, id: ProjectId) -> TaskGraphRepositoryResult<Vec<Phase>>;

    /// Finds a phase by identifier.
    async fn find_phase(&self, id: PhaseId) -> TaskGraphRepositoryResult<Option<Phase>>;

    /// Persists a phase's derived status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphRepositoryError::PhaseNotFound`] when the phase
    /// does not exist.
    async fn update_phase(&self, phase: &Phase) -> TaskGraphRepositoryResult<()>;

    /// Finds a task by identifier.
    async fn find_task(&self, id: TaskId) -> TaskGraphRepositoryResult<Option<Task>>;

    /// Returns the tasks of a phase ordered by position.
    async fn tasks_for_phase(&self, id: PhaseId) -> TaskGraphRepositoryResult<Vec<Task>>;

    /// Returns the tasks of a project ordered by phase then position.
    async fn tasks_for_project(&self, id: ProjectId) -> TaskGraphRepositoryResult<Vec<Task>>;

    /// Replaces a task if its stored row version still equals the task's.
    ///
    /// On success the stored copy carries the next row version. Returns
    /// `false` when another writer updated the task first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphRepositoryError::TaskNotFound`] when the task does
    /// not exist.
    async fn compare_and_swap_task(&self, task: &Task) -> TaskGraphRepositoryResult<bool>;
}

/// Errors returned by task graph repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskGraphRepositoryError {
    /// A project with the same identifier already exists.
    #[error("duplicate project identifier: {0}")]
    DuplicateProject(ProjectId),

    /// The project was not found.
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// The phase was not found.
    #[error("phase not found: {0}")]
    PhaseNotFound(PhaseId),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskGraphRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
