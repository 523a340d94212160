//! Task aggregate and revision-checked status changes.

use super::{CardId, PhaseId, ProjectId, Revision, TaskGraphDomainError, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Where a status change originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// A user acting through the API.
    User,
    /// Internal automation such as dispute blocking.
    System,
    /// The external board, via webhook or reconciliation.
    Board,
}

impl ChangeSource {
    /// Returns whether the change mirrors board state.
    #[must_use]
    pub const fn is_board(self) -> bool {
        matches!(self, Self::Board)
    }
}

/// Requested status change together with its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    /// Requested status.
    pub target: TaskStatus,
    /// Origin of the request.
    pub source: ChangeSource,
}

impl StatusChange {
    /// Creates a user-initiated change.
    #[must_use]
    pub const fn user(target: TaskStatus) -> Self {
        Self {
            target,
            source: ChangeSource::User,
        }
    }

    /// Creates a change raised by internal automation.
    #[must_use]
    pub const fn system(target: TaskStatus) -> Self {
        Self {
            target,
            source: ChangeSource::System,
        }
    }

    /// Creates a change mirrored from the board.
    #[must_use]
    pub const fn board(target: TaskStatus) -> Self {
        Self {
            target,
            source: ChangeSource::Board,
        }
    }
}

/// Reason a change was discarded without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The offered board revision is not newer than the stored one.
    StaleRevision {
        /// Revision currently stored on the task.
        stored: Revision,
        /// Revision carried by the change.
        offered: Revision,
    },
    /// An internal change was based on a local version another writer has
    /// already replaced.
    StaleVersion {
        /// Local version currently stored on the task.
        stored: u64,
        /// Local version the change was based on.
        based_on: u64,
    },
}

/// Result of confirming a board push against the stored task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncConfirmation {
    /// The task is unchanged since the push; it is now in sync.
    Confirmed,
    /// A board change reached the task during the push and already cleared
    /// the pending flag.
    AlreadyInSync,
    /// An internal change landed during the push; the task stays pending.
    Outdated,
}

impl SyncConfirmation {
    /// Returns whether the task no longer owes the board a push.
    #[must_use]
    pub const fn is_in_sync(self) -> bool {
        !matches!(self, Self::Outdated)
    }
}

/// Result of applying a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The change was accepted and the revision advanced.
    Applied {
        /// Status before the change.
        previous: TaskStatus,
        /// Status after the change.
        current: TaskStatus,
        /// Revision now stored on the task.
        revision: Revision,
    },
    /// The change lost a race or arrived out of order.
    Rejected(Rejection),
}

impl ApplyOutcome {
    /// Returns whether the change was accepted.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Returns whether the change altered the task status.
    #[must_use]
    pub fn status_changed(&self) -> bool {
        match self {
            Self::Applied {
                previous, current, ..
            } => previous != current,
            Self::Rejected(_) => false,
        }
    }
}

/// Task aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    project_id: ProjectId,
    phase_id: PhaseId,
    title: String,
    position: u16,
    status: TaskStatus,
    card_id: Option<CardId>,
    revision: Revision,
    local_version: u64,
    sync_pending: bool,
    row_version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted owning project.
    pub project_id: ProjectId,
    /// Persisted owning phase.
    pub phase_id: PhaseId,
    /// Persisted title.
    pub title: String,
    /// Persisted position within the phase.
    pub position: u16,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted board card, if synchronized.
    pub card_id: Option<CardId>,
    /// Persisted last accepted board revision.
    pub revision: Revision,
    /// Persisted count of accepted status changes.
    pub local_version: u64,
    /// Whether an internal change awaits a board push.
    pub sync_pending: bool,
    /// Persisted storage row version.
    pub row_version: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task that has not started and has never been synchronized.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphDomainError::EmptyTitle`] when the title is blank.
    pub fn new(
        project_id: ProjectId,
        phase_id: PhaseId,
        title: impl Into<String>,
        position: u16,
        clock: &impl Clock,
    ) -> Result<Self, TaskGraphDomainError> {
        let raw = title.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskGraphDomainError::EmptyTitle);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            project_id,
            phase_id,
            title: trimmed.to_owned(),
            position,
            status: TaskStatus::NotStarted,
            card_id: None,
            revision: Revision::ZERO,
            local_version: 0,
            sync_pending: true,
            row_version: 0,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            phase_id: data.phase_id,
            title: data.title,
            position: data.position,
            status: data.status,
            card_id: data.card_id,
            revision: data.revision,
            local_version: data.local_version,
            sync_pending: data.sync_pending,
            row_version: data.row_version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the owning phase.
    #[must_use]
    pub const fn phase_id(&self) -> PhaseId {
        self.phase_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the position within the phase.
    #[must_use]
    pub const fn position(&self) -> u16 {
        self.position
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the board card, if the task has been pushed.
    #[must_use]
    pub const fn card_id(&self) -> Option<&CardId> {
        self.card_id.as_ref()
    }

    /// Returns the last board revision the task accepted.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Returns the number of status changes the task has accepted.
    ///
    /// Internal writers base their changes on this counter; it never meets
    /// board revisions.
    #[must_use]
    pub const fn local_version(&self) -> u64 {
        self.local_version
    }

    /// Returns whether an internal change still needs pushing to the board.
    #[must_use]
    pub const fn sync_pending(&self) -> bool {
        self.sync_pending
    }

    /// Returns the storage row version used for compare-and-swap updates.
    #[must_use]
    pub const fn row_version(&self) -> u64 {
        self.row_version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns this task stamped with a new storage row version.
    #[must_use]
    pub const fn with_row_version(mut self, row_version: u64) -> Self {
        self.row_version = row_version;
        self
    }

    /// Applies a status change stamped with board `revision`.
    ///
    /// A change whose revision is not strictly newer than the last accepted
    /// board revision is rejected as stale. Board changes are mirrored as-is
    /// and clear the pending-push flag.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphDomainError::InvalidTransition`] when a user or
    /// system change violates the lifecycle graph.
    pub fn apply_change(
        &mut self,
        change: StatusChange,
        revision: Revision,
        clock: &impl Clock,
    ) -> Result<ApplyOutcome, TaskGraphDomainError> {
        if !revision.is_newer_than(self.revision) {
            return Ok(ApplyOutcome::Rejected(Rejection::StaleRevision {
                stored: self.revision,
                offered: revision,
            }));
        }
        let previous = self.transition(change)?;
        self.revision = revision;
        self.touch(clock);
        Ok(self.applied(previous))
    }

    /// Applies an internal change written against local version `based_on`.
    ///
    /// The board revision is left alone, so a board move made while the
    /// change awaits its push still compares against the last board
    /// revision. A writer whose view is outdated is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphDomainError::InvalidTransition`] when a user or
    /// system change violates the lifecycle graph.
    pub fn apply_local_change(
        &mut self,
        change: StatusChange,
        based_on: u64,
        clock: &impl Clock,
    ) -> Result<ApplyOutcome, TaskGraphDomainError> {
        if based_on != self.local_version {
            return Ok(ApplyOutcome::Rejected(Rejection::StaleVersion {
                stored: self.local_version,
                based_on,
            }));
        }
        let previous = self.transition(change)?;
        self.touch(clock);
        Ok(self.applied(previous))
    }

    const fn transition(
        &mut self,
        change: StatusChange,
    ) -> Result<TaskStatus, TaskGraphDomainError> {
        let previous = self.status;
        if change.source.is_board() {
            self.sync_pending = false;
        } else {
            if !previous.can_transition_to(change.target) {
                return Err(TaskGraphDomainError::InvalidTransition {
                    task_id: self.id,
                    from: previous,
                    to: change.target,
                });
            }
            self.sync_pending = true;
        }
        self.status = change.target;
        self.local_version = self.local_version.saturating_add(1);
        Ok(previous)
    }

    const fn applied(&self, previous: TaskStatus) -> ApplyOutcome {
        ApplyOutcome::Applied {
            previous,
            current: self.status,
            revision: self.revision,
        }
    }

    /// Records the board card backing this task.
    ///
    /// Returns `false` when a different card is already attached.
    pub fn attach_card(&mut self, card_id: CardId) -> bool {
        match &self.card_id {
            Some(existing) => *existing == card_id,
            None => {
                self.card_id = Some(card_id);
                true
            }
        }
    }

    /// Marks a push of local version `pushed_version` that the board
    /// stamped with `board_revision`.
    ///
    /// A task still at the pushed version takes the board revision and drops
    /// its pending flag. A task that moved on keeps its state: a board change
    /// already leaves it in sync, an internal change leaves it pending.
    pub fn confirm_sync(
        &mut self,
        pushed_version: u64,
        board_revision: Revision,
        clock: &impl Clock,
    ) -> SyncConfirmation {
        if self.local_version != pushed_version {
            return if self.sync_pending {
                SyncConfirmation::Outdated
            } else {
                SyncConfirmation::AlreadyInSync
            };
        }
        self.revision = self.revision.max(board_revision);
        self.sync_pending = false;
        self.touch(clock);
        SyncConfirmation::Confirmed
    }

    /// Flags the task for a board push.
    pub fn mark_sync_pending(&mut self, clock: &impl Clock) {
        self.sync_pending = true;
        self.touch(clock);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
