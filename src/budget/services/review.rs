//! Periodic budget review timer handler.

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use std::sync::Arc;
use tracing::debug;

use super::BudgetWatcher;
use crate::budget::ports::BudgetRepository;
use crate::scheduler::{
    domain::{ScheduledTimer, TimerDisposition},
    ports::{TimerHandler, TimerHandlerError},
};
use crate::task_graph::{domain::ProjectId, ports::TaskGraphRepository};

/// Re-evaluates thresholds for a project on each `budget_review` timer and
/// re-arms the timer while the project is active.
pub struct BudgetReviewHandler<R, G, C>
where
    R: BudgetRepository,
    G: TaskGraphRepository,
    C: Clock + Send + Sync,
{
    watcher: Arc<BudgetWatcher<R, C>>,
    graph: Arc<G>,
    clock: Arc<C>,
    interval: Duration,
}

impl<R, G, C> BudgetReviewHandler<R, G, C>
where
    R: BudgetRepository,
    G: TaskGraphRepository,
    C: Clock + Send + Sync,
{
    /// Creates a handler re-arming every `interval`.
    #[must_use]
    pub const fn new(
        watcher: Arc<BudgetWatcher<R, C>>,
        graph: Arc<G>,
        clock: Arc<C>,
        interval: Duration,
    ) -> Self {
        Self {
            watcher,
            graph,
            clock,
            interval,
        }
    }
}

#[async_trait]
impl<R, G, C> TimerHandler for BudgetReviewHandler<R, G, C>
where
    R: BudgetRepository + 'static,
    G: TaskGraphRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn fire(&self, timer: &ScheduledTimer) -> Result<TimerDisposition, TimerHandlerError> {
        let project_id = ProjectId::from_uuid(timer.owner());
        let project = self
            .graph
            .find_project(project_id)
            .await
            .map_err(|error| TimerHandlerError::Failed(error.to_string()))?;
        let Some(project) = project.filter(|project| project.stage().is_active()) else {
            debug!(%project_id, "project inactive, ending budget reviews");
            return Ok(TimerDisposition::Done);
        };

        self.watcher
            .review(project.id())
            .await
            .map_err(|error| TimerHandlerError::Failed(error.to_string()))?;
        Ok(TimerDisposition::RescheduleAt(self.clock.utc() + self.interval))
    }
}
