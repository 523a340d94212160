//! In-memory timer repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::scheduler::{
    domain::{ScheduledTimer, TimerKey},
    ports::{TimerRepository, TimerRepositoryError, TimerRepositoryResult},
};

/// Thread-safe in-memory timer repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTimerRepository {
    timers: Arc<RwLock<HashMap<TimerKey, ScheduledTimer>>>,
}

impl InMemoryTimerRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TimerRepositoryResult<RwLockReadGuard<'_, HashMap<TimerKey, ScheduledTimer>>> {
        self.timers.read().map_err(|err| {
            TimerRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(
        &self,
    ) -> TimerRepositoryResult<RwLockWriteGuard<'_, HashMap<TimerKey, ScheduledTimer>>> {
        self.timers.write().map_err(|err| {
            TimerRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

fn sorted(mut timers: Vec<ScheduledTimer>) -> Vec<ScheduledTimer> {
    timers.sort_by(|left, right| {
        left.due_at()
            .cmp(&right.due_at())
            .then_with(|| left.key().cmp(right.key()))
    });
    timers
}

#[async_trait]
impl TimerRepository for InMemoryTimerRepository {
    async fn upsert(&self, timer: &ScheduledTimer) -> TimerRepositoryResult<()> {
        self.write()?.insert(timer.key().clone(), timer.clone());
        Ok(())
    }

    async fn remove(&self, key: &TimerKey) -> TimerRepositoryResult<bool> {
        Ok(self.write()?.remove(key).is_some())
    }

    async fn remove_if_matches(
        &self,
        key: &TimerKey,
        idempotency_key: &str,
    ) -> TimerRepositoryResult<bool> {
        let mut timers = self.write()?;
        let matches = timers
            .get(key)
            .is_some_and(|timer| timer.idempotency_key() == idempotency_key);
        if matches {
            timers.remove(key);
        }
        Ok(matches)
    }

    async fn find(&self, key: &TimerKey) -> TimerRepositoryResult<Option<ScheduledTimer>> {
        Ok(self.read()?.get(key).cloned())
    }

    async fn due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> TimerRepositoryResult<Vec<ScheduledTimer>> {
        let due = self
            .read()?
            .values()
            .filter(|timer| timer.is_due(now))
            .cloned()
            .collect();
        Ok(sorted(due).into_iter().take(limit).collect())
    }

    async fn list_all(&self) -> TimerRepositoryResult<Vec<ScheduledTimer>> {
        let all = self.read()?.values().cloned().collect();
        Ok(sorted(all))
    }
}
