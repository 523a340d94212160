//! Firing loop delivering due timers to their handlers.

use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::scheduler::{
    domain::{FiringReport, ScheduledTimer, TimerDisposition, TimerKey, TimerKind},
    ports::{TimerHandler, TimerRepository, TimerRepositoryResult},
};

type InFlight = Arc<Mutex<HashSet<TimerKey>>>;

/// Marks a key as firing until dropped.
struct InFlightGuard {
    in_flight: InFlight,
    key: TimerKey,
}

impl InFlightGuard {
    fn claim(in_flight: &InFlight, key: &TimerKey) -> Option<Self> {
        let mut keys = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(Self {
            in_flight: Arc::clone(in_flight),
            key: key.clone(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Takes due timers from the store and invokes the handler for each kind.
pub struct TimerScheduler<R, C>
where
    R: TimerRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    handlers: HashMap<TimerKind, Arc<dyn TimerHandler>>,
    in_flight: InFlight,
    config: SchedulerConfig,
}

impl<R, C> TimerScheduler<R, C>
where
    R: TimerRepository,
    C: Clock + Send + Sync,
{
    /// Creates a scheduler with no handlers.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>, config: SchedulerConfig) -> Self {
        Self {
            repository,
            clock,
            handlers: HashMap::new(),
            in_flight: Arc::default(),
            config,
        }
    }

    /// Registers the handler for `kind`, replacing any previous one.
    #[must_use]
    pub fn with_handler(mut self, kind: TimerKind, handler: Arc<dyn TimerHandler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    /// Returns the number of keys currently firing.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Fires every timer due now, up to the configured batch size.
    ///
    /// Stops between timers once `shutdown` is cancelled; a handler already
    /// running is allowed to finish. A store failure on one timer is logged
    /// and counted as failed; the rest of the batch still fires.
    ///
    /// # Errors
    ///
    /// Returns [`crate::scheduler::ports::TimerRepositoryError`] when the due
    /// timers cannot be listed.
    pub async fn fire_due(&self, shutdown: &CancellationToken) -> TimerRepositoryResult<FiringReport> {
        let now = self.clock.utc();
        let due = self.repository.due(now, self.config.batch_size).await?;
        let mut report = FiringReport::default();
        for listed in due {
            if shutdown.is_cancelled() {
                info!("shutdown requested, stopping timer pass");
                break;
            }
            if let Err(error) = self.fire_one(&listed, now, &mut report).await {
                warn!(
                    key = %listed.key(),
                    %error,
                    "timer store failed, timer left for the next pass"
                );
                report.failed += 1;
            }
        }
        Ok(report)
    }

    async fn fire_one(
        &self,
        listed: &ScheduledTimer,
        now: DateTime<Utc>,
        report: &mut FiringReport,
    ) -> TimerRepositoryResult<()> {
        let Some(_guard) = InFlightGuard::claim(&self.in_flight, listed.key()) else {
            info!(key = %listed.key(), "timer already firing, skipping overlapping delivery");
            report.skipped_in_flight += 1;
            return Ok(());
        };

        // The listing may be stale by the time the guard is held.
        let current = self.repository.find(listed.key()).await?;
        let Some(timer) = current.filter(|timer| timer.is_due(now)) else {
            debug!(key = %listed.key(), "timer cancelled or moved before firing");
            report.superseded += 1;
            return Ok(());
        };

        let Some(handler) = self.handlers.get(&timer.kind()) else {
            warn!(key = %timer.key(), kind = %timer.kind(), "no handler registered for timer kind");
            report.failed += 1;
            return Ok(());
        };

        match handler.fire(&timer).await {
            Ok(TimerDisposition::Done) => {
                self.repository
                    .remove_if_matches(timer.key(), timer.idempotency_key())
                    .await?;
                report.fired += 1;
            }
            Ok(TimerDisposition::RescheduleAt(due_at)) => {
                let still_current = self
                    .repository
                    .remove_if_matches(timer.key(), timer.idempotency_key())
                    .await?;
                if still_current {
                    let next = timer.rescheduled(due_at, &*self.clock);
                    self.repository.upsert(&next).await?;
                }
                report.fired += 1;
                report.rescheduled += 1;
            }
            Err(error) => {
                warn!(key = %timer.key(), %error, "timer handler failed, keeping timer for retry");
                report.failed += 1;
            }
        }
        Ok(())
    }

    /// Runs firing passes every poll interval until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            handlers = self.handlers.len(),
            "timer scheduler started"
        );
        loop {
            match self.fire_due(&shutdown).await {
                Ok(report) if report != FiringReport::default() => {
                    debug!(?report, "timer pass finished");
                }
                Ok(_) => {}
                Err(error) => warn!(%error, "timer pass failed"),
            }
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
        info!("timer scheduler stopped");
    }
}
