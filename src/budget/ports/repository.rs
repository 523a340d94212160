//! Repository port for budgets and fired alerts.

use crate::budget::domain::{BudgetAlert, ProjectBudget};
use crate::task_graph::domain::ProjectId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for budget repository operations.
pub type BudgetRepositoryResult<T> = Result<T, BudgetRepositoryError>;

/// Budget persistence contract.
#[async_trait]
pub trait BudgetRepository: Send + Sync {
    /// Finds the ledger for a project.
    async fn find(&self, project_id: ProjectId) -> BudgetRepositoryResult<Option<ProjectBudget>>;

    /// Inserts or replaces the ledger for a project.
    async fn save(&self, budget: &ProjectBudget) -> BudgetRepositoryResult<()>;

    /// Inserts an alert unless one already exists for its project and
    /// threshold.
    ///
    /// Returns `false` when the alert had already fired.
    async fn insert_alert(&self, alert: &BudgetAlert) -> BudgetRepositoryResult<bool>;

    /// Returns every alert fired for a project, oldest first.
    async fn alerts_for(&self, project_id: ProjectId) -> BudgetRepositoryResult<Vec<BudgetAlert>>;
}

/// Errors returned by budget repository implementations.
#[derive(Debug, Clone, Error)]
pub enum BudgetRepositoryError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl BudgetRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
