//! Repository port for scheduled timers.

use crate::scheduler::domain::{ScheduledTimer, TimerKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for timer repository operations.
pub type TimerRepositoryResult<T> = Result<T, TimerRepositoryError>;

/// Timer persistence contract.
#[async_trait]
pub trait TimerRepository: Send + Sync {
    /// Inserts a timer, replacing any timer with the same key.
    async fn upsert(&self, timer: &ScheduledTimer) -> TimerRepositoryResult<()>;

    /// Removes the timer with `key`. Returns whether one existed.
    async fn remove(&self, key: &TimerKey) -> TimerRepositoryResult<bool>;

    /// Removes the timer with `key` only if it is still the scheduling
    /// identified by `idempotency_key`. Returns whether it was removed.
    async fn remove_if_matches(
        &self,
        key: &TimerKey,
        idempotency_key: &str,
    ) -> TimerRepositoryResult<bool>;

    /// Finds the timer with `key`.
    async fn find(&self, key: &TimerKey) -> TimerRepositoryResult<Option<ScheduledTimer>>;

    /// Returns up to `limit` timers due at `now`, earliest first.
    async fn due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> TimerRepositoryResult<Vec<ScheduledTimer>>;

    /// Returns every stored timer, earliest first.
    async fn list_all(&self) -> TimerRepositoryResult<Vec<ScheduledTimer>>;
}

/// Errors returned by timer repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TimerRepositoryError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TimerRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
