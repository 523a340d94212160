//! Timer handler driving per-project reconciliation.

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{BoardSyncServiceError, ReconciliationEngine};
use crate::board_sync::ports::{BoardClient, CardMappingRepository};
use crate::scheduler::{
    domain::{ScheduledTimer, TimerDisposition},
    ports::{TimerHandler, TimerHandlerError},
};
use crate::task_graph::{
    domain::ProjectId, ports::TaskGraphRepository, services::TaskGraphServiceError,
};

/// Reconciles a project on each `board_resync` timer and re-arms the timer
/// while the project is active.
pub struct BoardResyncHandler<M, B, G, C>
where
    M: CardMappingRepository,
    B: BoardClient,
    G: TaskGraphRepository,
    C: Clock + Send + Sync,
{
    engine: Arc<ReconciliationEngine<M, B, G, C>>,
    clock: Arc<C>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl<M, B, G, C> BoardResyncHandler<M, B, G, C>
where
    M: CardMappingRepository,
    B: BoardClient,
    G: TaskGraphRepository,
    C: Clock + Send + Sync,
{
    /// Creates a handler re-arming every `interval`. Passes stop between
    /// tasks once `shutdown` is cancelled.
    #[must_use]
    pub const fn new(
        engine: Arc<ReconciliationEngine<M, B, G, C>>,
        clock: Arc<C>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            clock,
            interval,
            shutdown,
        }
    }
}

#[async_trait]
impl<M, B, G, C> TimerHandler for BoardResyncHandler<M, B, G, C>
where
    M: CardMappingRepository + 'static,
    B: BoardClient + 'static,
    G: TaskGraphRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn fire(&self, timer: &ScheduledTimer) -> Result<TimerDisposition, TimerHandlerError> {
        let project_id = ProjectId::from_uuid(timer.owner());
        match self.engine.reconcile_project(project_id, &self.shutdown).await {
            Ok(_) => {}
            Err(BoardSyncServiceError::TaskGraph(TaskGraphServiceError::ProjectNotFound(_))) => {
                debug!(%project_id, "project gone, ending board resync");
                return Ok(TimerDisposition::Done);
            }
            Err(error) => return Err(TimerHandlerError::Failed(error.to_string())),
        }
        let project = self
            .engine
            .graph()
            .project(project_id)
            .await
            .map_err(|error| TimerHandlerError::Failed(error.to_string()))?;
        if !project.stage().is_active() {
            debug!(%project_id, stage = %project.stage(), "project inactive, ending board resync");
            return Ok(TimerDisposition::Done);
        }
        Ok(TimerDisposition::RescheduleAt(self.clock.utc() + self.interval))
    }
}
