//! In-memory budget repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::budget::{
    domain::{BudgetAlert, ProjectBudget, Threshold},
    ports::{BudgetRepository, BudgetRepositoryError, BudgetRepositoryResult},
};
use crate::task_graph::domain::ProjectId;

/// Thread-safe in-memory budget repository.
///
/// Alerts are keyed by `(project, threshold)` so a duplicate insert is
/// refused by construction.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBudgetRepository {
    state: Arc<RwLock<InMemoryBudgetState>>,
}

#[derive(Debug, Default)]
struct InMemoryBudgetState {
    budgets: HashMap<ProjectId, ProjectBudget>,
    alerts: HashMap<(ProjectId, Threshold), BudgetAlert>,
}

impl InMemoryBudgetRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> BudgetRepositoryResult<RwLockReadGuard<'_, InMemoryBudgetState>> {
        self.state.read().map_err(|err| {
            BudgetRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> BudgetRepositoryResult<RwLockWriteGuard<'_, InMemoryBudgetState>> {
        self.state.write().map_err(|err| {
            BudgetRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl BudgetRepository for InMemoryBudgetRepository {
    async fn find(&self, project_id: ProjectId) -> BudgetRepositoryResult<Option<ProjectBudget>> {
        Ok(self.read()?.budgets.get(&project_id).cloned())
    }

    async fn save(&self, budget: &ProjectBudget) -> BudgetRepositoryResult<()> {
        self.write()?
            .budgets
            .insert(budget.project_id(), budget.clone());
        Ok(())
    }

    async fn insert_alert(&self, alert: &BudgetAlert) -> BudgetRepositoryResult<bool> {
        let mut state = self.write()?;
        let key = (alert.project_id, alert.threshold);
        if state.alerts.contains_key(&key) {
            return Ok(false);
        }
        state.alerts.insert(key, alert.clone());
        Ok(true)
    }

    async fn alerts_for(&self, project_id: ProjectId) -> BudgetRepositoryResult<Vec<BudgetAlert>> {
        let state = self.read()?;
        let mut alerts: Vec<BudgetAlert> = state
            .alerts
            .values()
            .filter(|alert| alert.project_id == project_id)
            .cloned()
            .collect();
        alerts.sort_by_key(|alert| (alert.fired_at, alert.threshold));
        Ok(alerts)
    }
}
