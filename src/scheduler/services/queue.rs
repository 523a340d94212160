//! Scheduling and cancellation of timers.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::scheduler::{
    domain::{ScheduledTimer, TimerHandle, TimerKey, TimerKind},
    ports::{TimerRepository, TimerRepositoryResult},
};

/// Records timers for the firing loop to pick up.
pub struct TimerQueue<R, C>
where
    R: TimerRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> Clone for TimerQueue<R, C>
where
    R: TimerRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, C> TimerQueue<R, C>
where
    R: TimerRepository,
    C: Clock + Send + Sync,
{
    /// Creates a timer queue.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Schedules `kind` for `owner` at `due_at`, replacing any timer already
    /// scheduled under the same key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::scheduler::ports::TimerRepositoryError`] when the
    /// timer cannot be stored.
    pub async fn schedule(
        &self,
        kind: TimerKind,
        owner: Uuid,
        due_at: DateTime<Utc>,
        payload: Value,
    ) -> TimerRepositoryResult<TimerHandle> {
        let timer = ScheduledTimer::new(kind, owner, due_at, payload, &*self.clock);
        self.repository.upsert(&timer).await?;
        debug!(key = %timer.key(), %due_at, "timer scheduled");
        Ok(timer.handle())
    }

    /// Cancels the timer with `key`. Returns whether one was pending.
    ///
    /// Cancellation is best-effort: a timer already taken by a firing pass
    /// may still fire once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::scheduler::ports::TimerRepositoryError`] when the
    /// store cannot be updated.
    pub async fn cancel(&self, key: &TimerKey) -> TimerRepositoryResult<bool> {
        let removed = self.repository.remove(key).await?;
        debug!(%key, removed, "timer cancelled");
        Ok(removed)
    }

    /// Returns the pending timer with `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::scheduler::ports::TimerRepositoryError`] when the
    /// store cannot be read.
    pub async fn pending(&self, key: &TimerKey) -> TimerRepositoryResult<Option<ScheduledTimer>> {
        self.repository.find(key).await
    }
}
