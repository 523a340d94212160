//! Task and phase status types.

use super::ParseTaskStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Work has not started.
    NotStarted,
    /// Work is under way.
    InProgress,
    /// Work is halted by an external obstacle.
    Blocked,
    /// Work is complete.
    Done,
}

impl TaskStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 4] = [Self::NotStarted, Self::InProgress, Self::Blocked, Self::Done];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Done => "done",
        }
    }

    /// Returns whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns whether a user-initiated change to `target` is allowed.
    ///
    /// Users move one step at a time: `not_started -> in_progress -> done`,
    /// with `in_progress <-> blocked` as the only detour.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::NotStarted | Self::Blocked, Self::InProgress)
                | (Self::InProgress, Self::Blocked | Self::Done)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "done" => Ok(Self::Done),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Aggregate status of a phase, derived from its tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// No task has started.
    #[default]
    NotStarted,
    /// At least one task has started and not all are done.
    InProgress,
    /// At least one task is blocked.
    Blocked,
    /// Every task is done.
    Done,
}

impl PhaseStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Done => "done",
        }
    }

    /// Derives a phase status from its task statuses.
    ///
    /// A phase with no tasks has not started. `Done` requires every task to
    /// be done; otherwise a blocked task dominates, then any started or
    /// finished task makes the phase in progress.
    #[must_use]
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        let mut total = 0_usize;
        let mut done = 0_usize;
        let mut blocked = false;
        let mut started = false;
        for status in statuses {
            total += 1;
            match status {
                TaskStatus::Done => {
                    done += 1;
                    started = true;
                }
                TaskStatus::InProgress => started = true,
                TaskStatus::Blocked => blocked = true,
                TaskStatus::NotStarted => {}
            }
        }

        if total > 0 && done == total {
            Self::Done
        } else if blocked {
            Self::Blocked
        } else if started {
            Self::InProgress
        } else {
            Self::NotStarted
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
