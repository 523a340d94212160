//! Repository port for disputes.

use crate::dispute::domain::{Dispute, DisputeId};
use crate::task_graph::domain::{ProjectId, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for dispute repository operations.
pub type DisputeRepositoryResult<T> = Result<T, DisputeRepositoryError>;

/// Dispute persistence contract.
#[async_trait]
pub trait DisputeRepository: Send + Sync {
    /// Stores a newly filed dispute.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeRepositoryError::DuplicateDispute`] when the
    /// identifier already exists.
    async fn store(&self, dispute: &Dispute) -> DisputeRepositoryResult<()>;

    /// Replaces an existing dispute.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeRepositoryError::NotFound`] when the dispute does not
    /// exist.
    async fn update(&self, dispute: &Dispute) -> DisputeRepositoryResult<()>;

    /// Finds a dispute by identifier.
    async fn find(&self, id: DisputeId) -> DisputeRepositoryResult<Option<Dispute>>;

    /// Returns the disputes of a project, oldest first.
    async fn list_for_project(&self, project_id: ProjectId)
    -> DisputeRepositoryResult<Vec<Dispute>>;

    /// Returns unresolved disputes referencing `task_id`.
    async fn open_for_task(&self, task_id: TaskId) -> DisputeRepositoryResult<Vec<Dispute>>;
}

/// Errors returned by dispute repository implementations.
#[derive(Debug, Clone, Error)]
pub enum DisputeRepositoryError {
    /// A dispute with the same identifier already exists.
    #[error("duplicate dispute identifier: {0}")]
    DuplicateDispute(DisputeId),

    /// The dispute does not exist.
    #[error("dispute not found: {0}")]
    NotFound(DisputeId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DisputeRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
