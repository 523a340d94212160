//! In-memory dispute repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::dispute::{
    domain::{Dispute, DisputeId},
    ports::{DisputeRepository, DisputeRepositoryError, DisputeRepositoryResult},
};
use crate::task_graph::domain::{ProjectId, TaskId};

/// Thread-safe in-memory dispute repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDisputeRepository {
    state: Arc<RwLock<HashMap<DisputeId, Dispute>>>,
}

impl InMemoryDisputeRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DisputeRepositoryResult<RwLockReadGuard<'_, HashMap<DisputeId, Dispute>>> {
        self.state.read().map_err(|err| {
            DisputeRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> DisputeRepositoryResult<RwLockWriteGuard<'_, HashMap<DisputeId, Dispute>>> {
        self.state.write().map_err(|err| {
            DisputeRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn collect_sorted<F>(&self, keep: F) -> DisputeRepositoryResult<Vec<Dispute>>
    where
        F: Fn(&Dispute) -> bool,
    {
        let state = self.read()?;
        let mut disputes: Vec<Dispute> = state
            .values()
            .filter(|dispute| keep(dispute))
            .cloned()
            .collect();
        disputes.sort_by_key(|dispute| (dispute.created_at(), dispute.id()));
        Ok(disputes)
    }
}

#[async_trait]
impl DisputeRepository for InMemoryDisputeRepository {
    async fn store(&self, dispute: &Dispute) -> DisputeRepositoryResult<()> {
        let mut state = self.write()?;
        if state.contains_key(&dispute.id()) {
            return Err(DisputeRepositoryError::DuplicateDispute(dispute.id()));
        }
        state.insert(dispute.id(), dispute.clone());
        Ok(())
    }

    async fn update(&self, dispute: &Dispute) -> DisputeRepositoryResult<()> {
        let mut state = self.write()?;
        let Some(stored) = state.get_mut(&dispute.id()) else {
            return Err(DisputeRepositoryError::NotFound(dispute.id()));
        };
        *stored = dispute.clone();
        Ok(())
    }

    async fn find(&self, id: DisputeId) -> DisputeRepositoryResult<Option<Dispute>> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn list_for_project(
        &self,
        project_id: ProjectId,
    ) -> DisputeRepositoryResult<Vec<Dispute>> {
        self.collect_sorted(|dispute| dispute.project_id() == project_id)
    }

    async fn open_for_task(&self, task_id: TaskId) -> DisputeRepositoryResult<Vec<Dispute>> {
        self.collect_sorted(|dispute| {
            dispute.task_id() == Some(task_id) && !dispute.stage().is_terminal()
        })
    }
}
