//! Mapping between board lists and task statuses.

use super::BoardSyncDomainError;
use crate::task_graph::domain::TaskStatus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a list on the external board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListId(String);

impl ListId {
    /// Creates a validated list identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncDomainError::EmptyListId`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, BoardSyncDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BoardSyncDomainError::EmptyListId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    fn canonical(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// Returns the list identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ListId {
    type Error = BoardSyncDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ListId> for String {
    fn from(value: ListId) -> Self {
        value.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which list each status is pushed to, and which extra lists map back to a
/// status when a card lands on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardLayout {
    /// List for tasks that have not started.
    #[serde(default = "default_not_started")]
    pub not_started: ListId,
    /// List for tasks in progress.
    #[serde(default = "default_in_progress")]
    pub in_progress: ListId,
    /// List for blocked tasks.
    #[serde(default = "default_blocked")]
    pub blocked: ListId,
    /// List for finished tasks.
    #[serde(default = "default_done")]
    pub done: ListId,
    /// Additional lists read back as a status but never pushed to.
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<ListId, TaskStatus>,
}

impl BoardLayout {
    /// Returns the list a task in `status` is pushed to.
    #[must_use]
    pub const fn list_for(&self, status: TaskStatus) -> &ListId {
        match status {
            TaskStatus::NotStarted => &self.not_started,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Blocked => &self.blocked,
            TaskStatus::Done => &self.done,
        }
    }

    /// Returns the status a card on `list` represents, or `None` for a list
    /// this layout does not know.
    #[must_use]
    pub fn status_for(&self, list: &ListId) -> Option<TaskStatus> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| self.list_for(*status) == list)
            .or_else(|| self.aliases.get(list).copied())
    }

    /// Checks that target lists are distinct and that no alias contradicts
    /// a target list.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncDomainError`] describing the first conflict.
    pub fn validate(&self) -> Result<(), BoardSyncDomainError> {
        let mut targets = BTreeSet::new();
        for status in TaskStatus::ALL {
            let list = self.list_for(status);
            if !targets.insert(list) {
                return Err(BoardSyncDomainError::DuplicateTargetList(list.clone()));
            }
        }
        for (list, status) in &self.aliases {
            if targets.contains(list) && self.list_for(*status) != list {
                return Err(BoardSyncDomainError::ConflictingAlias(list.clone()));
            }
        }
        Ok(())
    }
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self {
            not_started: default_not_started(),
            in_progress: default_in_progress(),
            blocked: default_blocked(),
            done: default_done(),
            aliases: default_aliases(),
        }
    }
}

fn default_not_started() -> ListId {
    ListId::canonical("backlog")
}

fn default_in_progress() -> ListId {
    ListId::canonical("in_progress")
}

fn default_blocked() -> ListId {
    ListId::canonical("blocked")
}

fn default_done() -> ListId {
    ListId::canonical("done")
}

fn default_aliases() -> BTreeMap<ListId, TaskStatus> {
    BTreeMap::from([
        (ListId::canonical("this_week"), TaskStatus::NotStarted),
        (ListId::canonical("in_review"), TaskStatus::InProgress),
        (ListId::canonical("change_orders"), TaskStatus::InProgress),
        (ListId::canonical("dispute_hold"), TaskStatus::Blocked),
    ])
}
