//! Scheduled timer records.

use chrono::{DateTime, SecondsFormat, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Purpose of a timer; selects the handler that fires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Dispute stage deadline.
    DisputeEscalation,
    /// Periodic board reconciliation for a project.
    BoardResync,
    /// Periodic budget threshold review for a project.
    BudgetReview,
}

impl TimerKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DisputeEscalation => "dispute_escalation",
            Self::BoardResync => "board_resync",
            Self::BudgetReview => "budget_review",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned while parsing timer kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown timer kind: {0}")]
pub struct ParseTimerKindError(pub String);

impl TryFrom<&str> for TimerKind {
    type Error = ParseTimerKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "dispute_escalation" => Ok(Self::DisputeEscalation),
            "board_resync" => Ok(Self::BoardResync),
            "budget_review" => Ok(Self::BudgetReview),
            other => Err(ParseTimerKindError(other.to_owned())),
        }
    }
}

/// Unique key of a timer: one live timer per kind and owning entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerKey(String);

impl TimerKey {
    /// Builds the key for `kind` owned by `owner`.
    #[must_use]
    pub fn new(kind: TimerKind, owner: Uuid) -> Self {
        Self(format!("{kind}:{owner}"))
    }

    /// Returns the key as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTimer {
    key: TimerKey,
    kind: TimerKind,
    owner: Uuid,
    due_at: DateTime<Utc>,
    payload: Value,
    idempotency_key: String,
    created_at: DateTime<Utc>,
}

impl ScheduledTimer {
    /// Creates a timer for `owner` due at `due_at`.
    ///
    /// The idempotency key is a SHA-256 digest of the key, due time, and
    /// payload, so re-scheduling identical work yields an identical key.
    #[must_use]
    pub fn new(
        kind: TimerKind,
        owner: Uuid,
        due_at: DateTime<Utc>,
        payload: Value,
        clock: &impl Clock,
    ) -> Self {
        let key = TimerKey::new(kind, owner);
        let idempotency_key = idempotency_key(&key, due_at, &payload);
        Self {
            key,
            kind,
            owner,
            due_at,
            payload,
            idempotency_key,
            created_at: clock.utc(),
        }
    }

    /// Returns the timer key.
    #[must_use]
    pub const fn key(&self) -> &TimerKey {
        &self.key
    }

    /// Returns the timer kind.
    #[must_use]
    pub const fn kind(&self) -> TimerKind {
        self.kind
    }

    /// Returns the owning entity identifier.
    #[must_use]
    pub const fn owner(&self) -> Uuid {
        self.owner
    }

    /// Returns when the timer becomes due.
    #[must_use]
    pub const fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    /// Returns the state captured when the timer was scheduled.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the idempotency key identifying this exact scheduling.
    #[must_use]
    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    /// Returns when the timer was scheduled.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether the timer is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// Returns a copy of this timer moved to `due_at`.
    #[must_use]
    pub fn rescheduled(&self, due_at: DateTime<Utc>, clock: &impl Clock) -> Self {
        Self::new(self.kind, self.owner, due_at, self.payload.clone(), clock)
    }

    /// Returns a handle describing this timer.
    #[must_use]
    pub fn handle(&self) -> TimerHandle {
        TimerHandle {
            key: self.key.clone(),
            due_at: self.due_at,
            idempotency_key: self.idempotency_key.clone(),
        }
    }
}

fn idempotency_key(key: &TimerKey, due_at: DateTime<Utc>, payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(due_at.to_rfc3339_opts(SecondsFormat::Micros, true).as_bytes());
    hasher.update(b"|");
    hasher.update(payload.to_string().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Returned by scheduling; identifies the stored timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerHandle {
    /// Timer key.
    pub key: TimerKey,
    /// When the timer becomes due.
    pub due_at: DateTime<Utc>,
    /// Idempotency key of this scheduling.
    pub idempotency_key: String,
}

/// What the scheduler does with a timer after its handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDisposition {
    /// Delete the timer.
    Done,
    /// Keep the timer, moved to the given instant.
    RescheduleAt(DateTime<Utc>),
}

/// Counts from one firing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FiringReport {
    /// Handlers that completed.
    pub fired: usize,
    /// Timers moved to a later instant.
    pub rescheduled: usize,
    /// Timers skipped because the same key was already firing.
    pub skipped_in_flight: usize,
    /// Timers cancelled or replaced between listing and firing.
    pub superseded: usize,
    /// Handler failures or missing handlers; the timer stays for retry.
    pub failed: usize,
}
