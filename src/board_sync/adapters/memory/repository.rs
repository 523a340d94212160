//! In-memory card mapping repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::board_sync::{
    domain::{CardMapping, ProjectSyncState},
    ports::{CardMappingRepository, CardMappingRepositoryError, CardMappingRepositoryResult},
};
use crate::task_graph::domain::{CardId, ProjectId, Revision, TaskId};

/// Thread-safe in-memory card mapping repository.
///
/// Mappings are keyed by task so a second insert for the same task is
/// refused under the write lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCardMappingRepository {
    state: Arc<RwLock<InMemoryMappingState>>,
}

#[derive(Debug, Default)]
struct InMemoryMappingState {
    by_task: HashMap<TaskId, CardMapping>,
    task_by_card: HashMap<CardId, TaskId>,
    sync_states: HashMap<ProjectId, ProjectSyncState>,
}

impl InMemoryCardMappingRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored mappings.
    ///
    /// # Errors
    ///
    /// Returns [`CardMappingRepositoryError::Persistence`] when the lock is
    /// poisoned.
    pub fn mapping_count(&self) -> CardMappingRepositoryResult<usize> {
        Ok(self.read()?.by_task.len())
    }

    fn read(&self) -> CardMappingRepositoryResult<RwLockReadGuard<'_, InMemoryMappingState>> {
        self.state.read().map_err(|err| {
            CardMappingRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> CardMappingRepositoryResult<RwLockWriteGuard<'_, InMemoryMappingState>> {
        self.state.write().map_err(|err| {
            CardMappingRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl CardMappingRepository for InMemoryCardMappingRepository {
    async fn insert(&self, mapping: &CardMapping) -> CardMappingRepositoryResult<bool> {
        let mut state = self.write()?;
        if state.by_task.contains_key(&mapping.task_id()) {
            return Ok(false);
        }
        if state.task_by_card.contains_key(mapping.card_id()) {
            return Err(CardMappingRepositoryError::CardAlreadyMapped(
                mapping.card_id().clone(),
            ));
        }
        state
            .task_by_card
            .insert(mapping.card_id().clone(), mapping.task_id());
        state.by_task.insert(mapping.task_id(), mapping.clone());
        Ok(true)
    }

    async fn find_by_task(
        &self,
        task_id: TaskId,
    ) -> CardMappingRepositoryResult<Option<CardMapping>> {
        Ok(self.read()?.by_task.get(&task_id).cloned())
    }

    async fn find_by_card(
        &self,
        card_id: &CardId,
    ) -> CardMappingRepositoryResult<Option<CardMapping>> {
        let state = self.read()?;
        Ok(state
            .task_by_card
            .get(card_id)
            .and_then(|task_id| state.by_task.get(task_id))
            .cloned())
    }

    async fn list_for_project(
        &self,
        project_id: ProjectId,
    ) -> CardMappingRepositoryResult<Vec<CardMapping>> {
        let state = self.read()?;
        let mut mappings: Vec<CardMapping> = state
            .by_task
            .values()
            .filter(|mapping| mapping.project_id() == project_id)
            .cloned()
            .collect();
        mappings.sort_by(|left, right| left.card_id().cmp(right.card_id()));
        Ok(mappings)
    }

    async fn record_sync(
        &self,
        card_id: &CardId,
        revision: Revision,
        at: DateTime<Utc>,
    ) -> CardMappingRepositoryResult<CardMapping> {
        let mut state = self.write()?;
        let Some(task_id) = state.task_by_card.get(card_id).copied() else {
            return Err(CardMappingRepositoryError::NotFound(card_id.clone()));
        };
        let Some(mapping) = state.by_task.get_mut(&task_id) else {
            return Err(CardMappingRepositoryError::NotFound(card_id.clone()));
        };
        mapping.observe(revision, at);
        Ok(mapping.clone())
    }

    async fn archive_project(&self, project_id: ProjectId) -> CardMappingRepositoryResult<usize> {
        let mut state = self.write()?;
        let mut archived = 0;
        for mapping in state
            .by_task
            .values_mut()
            .filter(|mapping| mapping.project_id() == project_id && !mapping.is_archived())
        {
            mapping.archive();
            archived += 1;
        }
        Ok(archived)
    }

    async fn save_sync_state(&self, sync_state: &ProjectSyncState) -> CardMappingRepositoryResult<()> {
        self.write()?
            .sync_states
            .insert(sync_state.project_id, sync_state.clone());
        Ok(())
    }

    async fn sync_state(
        &self,
        project_id: ProjectId,
    ) -> CardMappingRepositoryResult<Option<ProjectSyncState>> {
        Ok(self.read()?.sync_states.get(&project_id).cloned())
    }
}
