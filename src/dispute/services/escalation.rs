//! Deadline timer handler for dispute escalation.

use async_trait::async_trait;
use mockable::Clock;
use serde::Deserialize;
use std::sync::Arc;

use super::{DeadlineOutcome, DisputeService};
use crate::dispute::{
    domain::{DisputeId, DisputeStage},
    ports::DisputeRepository,
};
use crate::scheduler::{
    domain::{ScheduledTimer, TimerDisposition},
    ports::{TimerHandler, TimerHandlerError, TimerRepository},
};
use crate::task_graph::ports::TaskGraphRepository;

#[derive(Debug, Deserialize)]
struct DeadlinePayload {
    stage: DisputeStage,
}

/// Escalates disputes whose stage deadline has passed.
pub struct DisputeEscalationHandler<D, G, T, C>
where
    D: DisputeRepository,
    G: TaskGraphRepository,
    T: TimerRepository,
    C: Clock + Send + Sync,
{
    service: Arc<DisputeService<D, G, T, C>>,
}

impl<D, G, T, C> DisputeEscalationHandler<D, G, T, C>
where
    D: DisputeRepository,
    G: TaskGraphRepository,
    T: TimerRepository,
    C: Clock + Send + Sync,
{
    /// Creates a handler delegating to `service`.
    #[must_use]
    pub const fn new(service: Arc<DisputeService<D, G, T, C>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<D, G, T, C> TimerHandler for DisputeEscalationHandler<D, G, T, C>
where
    D: DisputeRepository + 'static,
    G: TaskGraphRepository + 'static,
    T: TimerRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn fire(&self, timer: &ScheduledTimer) -> Result<TimerDisposition, TimerHandlerError> {
        let payload: DeadlinePayload = serde_json::from_value(timer.payload().clone())
            .map_err(|error| TimerHandlerError::MalformedPayload(error.to_string()))?;
        let outcome = self
            .service
            .handle_deadline(DisputeId::from_uuid(timer.owner()), payload.stage)
            .await
            .map_err(|error| TimerHandlerError::Failed(error.to_string()))?;
        Ok(match outcome {
            DeadlineOutcome::NotDue(deadline) => TimerDisposition::RescheduleAt(deadline),
            DeadlineOutcome::Escalated { .. }
            | DeadlineOutcome::Stalled { .. }
            | DeadlineOutcome::Stale => TimerDisposition::Done,
        })
    }
}
