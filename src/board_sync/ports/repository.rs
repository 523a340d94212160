//! Repository port for card mappings and sync records.

use crate::board_sync::domain::{CardMapping, ProjectSyncState};
use crate::task_graph::domain::{CardId, ProjectId, Revision, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for card mapping repository operations.
pub type CardMappingRepositoryResult<T> = Result<T, CardMappingRepositoryError>;

/// Card mapping persistence contract.
#[async_trait]
pub trait CardMappingRepository: Send + Sync {
    /// Stores a new mapping unless the task is already mapped.
    ///
    /// Returns `false`, storing nothing, when a mapping for the task exists.
    ///
    /// # Errors
    ///
    /// Returns [`CardMappingRepositoryError::CardAlreadyMapped`] when the
    /// card backs a different task.
    async fn insert(&self, mapping: &CardMapping) -> CardMappingRepositoryResult<bool>;

    /// Finds the mapping for a task.
    async fn find_by_task(&self, task_id: TaskId)
    -> CardMappingRepositoryResult<Option<CardMapping>>;

    /// Finds the mapping for a card.
    async fn find_by_card(&self, card_id: &CardId)
    -> CardMappingRepositoryResult<Option<CardMapping>>;

    /// Returns the mappings of a project.
    async fn list_for_project(
        &self,
        project_id: ProjectId,
    ) -> CardMappingRepositoryResult<Vec<CardMapping>>;

    /// Raises the recorded revision of a card to `revision` if higher and
    /// stamps the sync time.
    ///
    /// # Errors
    ///
    /// Returns [`CardMappingRepositoryError::NotFound`] when the card is not
    /// mapped.
    async fn record_sync(
        &self,
        card_id: &CardId,
        revision: Revision,
        at: DateTime<Utc>,
    ) -> CardMappingRepositoryResult<CardMapping>;

    /// Archives every mapping of a project and returns how many changed.
    async fn archive_project(&self, project_id: ProjectId) -> CardMappingRepositoryResult<usize>;

    /// Records the outcome of a reconciliation pass.
    async fn save_sync_state(&self, state: &ProjectSyncState) -> CardMappingRepositoryResult<()>;

    /// Returns the latest reconciliation record for a project.
    async fn sync_state(
        &self,
        project_id: ProjectId,
    ) -> CardMappingRepositoryResult<Option<ProjectSyncState>>;
}

/// Errors returned by card mapping repository implementations.
#[derive(Debug, Clone, Error)]
pub enum CardMappingRepositoryError {
    /// The card already backs another task.
    #[error("card {0} is already mapped to another task")]
    CardAlreadyMapped(CardId),

    /// The card is not mapped.
    #[error("no mapping for card {0}")]
    NotFound(CardId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl CardMappingRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
