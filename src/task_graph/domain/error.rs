//! Error types for task graph validation and parsing.

use super::{ProjectId, ProjectStage, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned by task graph domain rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskGraphDomainError {
    /// The requested status change violates the task lifecycle.
    #[error("invalid task status transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        /// Task whose transition was rejected.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The requested project stage is not ahead of the current stage.
    #[error("invalid project stage transition for project {project_id}: {from} -> {to}")]
    InvalidStageTransition {
        /// Project whose transition was rejected.
        project_id: ProjectId,
        /// Current stage.
        from: ProjectStage,
        /// Requested stage.
        to: ProjectStage,
    },

    /// A project or task title is empty after trimming.
    #[error("title must not be empty")]
    EmptyTitle,

    /// A board card identifier is empty after trimming.
    #[error("card identifier must not be empty")]
    EmptyCardId,
}

/// Error returned while parsing task statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing project stages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown project stage: {0}")]
pub struct ParseProjectStageError(pub String);
