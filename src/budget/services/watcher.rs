//! Spend recording and threshold-crossing detection.

use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::budget::{
    domain::{
        BudgetAlert, BudgetDomainError, BudgetSummary, Money, ProjectBudget, SpendCategory,
        Threshold,
    },
    ports::{BudgetRepository, BudgetRepositoryError},
};
use crate::events::{domain::EventPayload, services::EventBus};
use crate::keyed_lock::KeyedLock;
use crate::task_graph::domain::ProjectId;

/// Service-level errors for budget operations.
#[derive(Debug, Error)]
pub enum BudgetServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] BudgetDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] BudgetRepositoryError),
}

/// Result type for budget service operations.
pub type BudgetServiceResult<T> = Result<T, BudgetServiceError>;

/// Ledger after an update, with the alerts that update fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetState {
    /// Ledger after the update.
    pub budget: ProjectBudget,
    /// Alerts newly fired by the update, lowest threshold first.
    pub fired: Vec<BudgetAlert>,
}

/// Tracks spend against approved budgets and fires threshold alerts.
///
/// Every update is a read-modify-write under a per-project lock, so two
/// concurrent updates cannot both observe the pre-crossing ratio.
pub struct BudgetWatcher<R, C>
where
    R: BudgetRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    events: EventBus,
    thresholds: Vec<Threshold>,
    locks: KeyedLock<ProjectId>,
}

impl<R, C> BudgetWatcher<R, C>
where
    R: BudgetRepository,
    C: Clock + Send + Sync,
{
    /// Creates a watcher evaluating `thresholds`.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        clock: Arc<C>,
        events: EventBus,
        thresholds: impl IntoIterator<Item = Threshold>,
    ) -> Self {
        let mut ordered: Vec<Threshold> = thresholds.into_iter().collect();
        ordered.sort_unstable();
        ordered.dedup();
        Self {
            repository,
            clock,
            events,
            thresholds: ordered,
            locks: KeyedLock::new(),
        }
    }

    /// Returns the evaluated thresholds in ascending order.
    #[must_use]
    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    /// Sets the approved budget for a project.
    ///
    /// Lowering the approved amount can push exposure over a threshold, so
    /// crossings are evaluated as for spend.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetServiceError`] for a negative amount or a repository
    /// failure.
    pub async fn set_approved(
        &self,
        project_id: ProjectId,
        amount: Money,
    ) -> BudgetServiceResult<BudgetState> {
        self.update(project_id, |budget| budget.set_approved(amount))
            .await
    }

    /// Records `amount` against `category` and fires newly crossed
    /// thresholds.
    ///
    /// A threshold fires when exposure was below it before the update and is
    /// at or above it after, so one large update can fire several alerts. A
    /// zero amount changes nothing and fires nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetServiceError`] for a negative amount, an overflowing
    /// total, or a repository failure.
    pub async fn record_spend(
        &self,
        project_id: ProjectId,
        amount: Money,
        category: SpendCategory,
    ) -> BudgetServiceResult<BudgetState> {
        self.update(project_id, |budget| budget.record(category, amount))
            .await
    }

    /// Fires any reached threshold that has no alert yet.
    ///
    /// Safe to repeat; recovers alerts lost between a saved update and its
    /// alert insertion.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetServiceError::Repository`] on repository failure.
    pub async fn review(&self, project_id: ProjectId) -> BudgetServiceResult<Vec<BudgetAlert>> {
        let _guard = self.locks.lock(&project_id).await;
        let Some(budget) = self.repository.find(project_id).await? else {
            return Ok(Vec::new());
        };
        let fired = self.fire_crossings(None, &budget).await?;
        debug!(%project_id, fired = fired.len(), "budget review finished");
        Ok(fired)
    }

    /// Returns the budget summary for a project.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetServiceError::Repository`] on repository failure.
    pub async fn summary(&self, project_id: ProjectId) -> BudgetServiceResult<BudgetSummary> {
        let budget = self
            .repository
            .find(project_id)
            .await?
            .unwrap_or_else(|| ProjectBudget::new(project_id));
        Ok(budget.summary())
    }

    /// Returns every alert fired for a project.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetServiceError::Repository`] on repository failure.
    pub async fn alerts(&self, project_id: ProjectId) -> BudgetServiceResult<Vec<BudgetAlert>> {
        Ok(self.repository.alerts_for(project_id).await?)
    }

    async fn update<F>(&self, project_id: ProjectId, mutate: F) -> BudgetServiceResult<BudgetState>
    where
        F: FnOnce(&mut ProjectBudget) -> Result<(), BudgetDomainError> + Send,
    {
        let _guard = self.locks.lock(&project_id).await;
        let before = self
            .repository
            .find(project_id)
            .await?
            .unwrap_or_else(|| ProjectBudget::new(project_id));
        let mut after = before.clone();
        mutate(&mut after)?;
        if after == before {
            debug!(%project_id, "budget update changed nothing");
            return Ok(BudgetState {
                budget: after,
                fired: Vec::new(),
            });
        }

        self.repository.save(&after).await?;
        let fired = self.fire_crossings(Some(&before), &after).await?;
        if before.invariant_holds() && !after.invariant_holds() {
            warn!(
                %project_id,
                approved = ?after.approved(),
                committed = %after.committed(),
                spent = %after.spent(),
                "budget invariant violated"
            );
            self.events.emit(
                project_id,
                EventPayload::BudgetInvariantViolated {
                    approved: after.approved().unwrap_or(Money::ZERO),
                    committed: after.committed(),
                    spent: after.spent(),
                },
                &*self.clock,
            );
        }
        Ok(BudgetState {
            budget: after,
            fired,
        })
    }

    async fn fire_crossings(
        &self,
        before: Option<&ProjectBudget>,
        after: &ProjectBudget,
    ) -> BudgetServiceResult<Vec<BudgetAlert>> {
        let Some(approved) = after.approved() else {
            return Ok(Vec::new());
        };
        let mut fired = Vec::new();
        for threshold in &self.thresholds {
            let was_reached = before.is_some_and(|budget| budget.reaches(*threshold));
            if was_reached || !after.reaches(*threshold) {
                continue;
            }
            let alert = BudgetAlert {
                project_id: after.project_id(),
                threshold: *threshold,
                exposure: after.exposure(),
                approved,
                fired_at: self.clock.utc(),
            };
            if !self.repository.insert_alert(&alert).await? {
                debug!(
                    project_id = %alert.project_id,
                    %threshold,
                    "budget alert already fired, suppressing"
                );
                continue;
            }
            info!(
                project_id = %alert.project_id,
                %threshold,
                exposure = %alert.exposure,
                approved = %approved,
                "budget threshold crossed"
            );
            self.events.emit(
                alert.project_id,
                EventPayload::BudgetThresholdCrossed {
                    threshold: *threshold,
                    exposure: alert.exposure,
                    approved,
                    ratio_bps: after.burn_rate_bps().unwrap_or_default(),
                },
                &*self.clock,
            );
            fired.push(alert);
        }
        Ok(fired)
    }
}
