//! Task to card mapping.

use crate::task_graph::domain::{CardId, ProjectId, Revision, TaskId};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Link between an internal task and its board card.
///
/// Created once when the task is first pushed; archived with its project
/// rather than deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMapping {
    task_id: TaskId,
    project_id: ProjectId,
    card_id: CardId,
    external_revision: Revision,
    last_synced_at: DateTime<Utc>,
    archived: bool,
    created_at: DateTime<Utc>,
}

impl CardMapping {
    /// Creates a mapping for a freshly created card.
    #[must_use]
    pub fn new(task_id: TaskId, project_id: ProjectId, card_id: CardId, clock: &impl Clock) -> Self {
        let now = clock.utc();
        Self {
            task_id,
            project_id,
            card_id,
            external_revision: Revision::ZERO,
            last_synced_at: now,
            archived: false,
            created_at: now,
        }
    }

    /// Returns the mapped task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the board card.
    #[must_use]
    pub const fn card_id(&self) -> &CardId {
        &self.card_id
    }

    /// Returns the highest board revision observed for the card.
    #[must_use]
    pub const fn external_revision(&self) -> Revision {
        self.external_revision
    }

    /// Returns when the card state was last confirmed.
    #[must_use]
    pub const fn last_synced_at(&self) -> DateTime<Utc> {
        self.last_synced_at
    }

    /// Returns whether the mapping was archived with its project.
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether the card state is older than `staleness` at `now`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, staleness: Duration) -> bool {
        now - self.last_synced_at >= staleness
    }

    /// Records a confirmed board revision. The stored revision never
    /// decreases.
    pub fn observe(&mut self, revision: Revision, at: DateTime<Utc>) {
        if revision.is_newer_than(self.external_revision) {
            self.external_revision = revision;
        }
        if at > self.last_synced_at {
            self.last_synced_at = at;
        }
    }

    /// Archives the mapping.
    pub const fn archive(&mut self) {
        self.archived = true;
    }
}
