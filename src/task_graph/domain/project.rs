//! Project aggregate root and lifecycle stage.

use super::{ParseProjectStageError, ProjectId, TaskGraphDomainError, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Project lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStage {
    /// The project has been created from a description.
    Draft,
    /// Design artifacts are being produced.
    Designing,
    /// Vendors are bidding on the work.
    Bidding,
    /// Construction is under way.
    Building,
    /// Construction has finished.
    Complete,
    /// The project is closed for all activity.
    Archived,
}

impl ProjectStage {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Designing => "designing",
            Self::Bidding => "bidding",
            Self::Building => "building",
            Self::Complete => "complete",
            Self::Archived => "archived",
        }
    }

    /// Returns whether background processes should keep checking the
    /// project.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Complete | Self::Archived)
    }
}

impl fmt::Display for ProjectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProjectStage {
    type Error = ParseProjectStageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "designing" => Ok(Self::Designing),
            "bidding" => Ok(Self::Bidding),
            "building" => Ok(Self::Building),
            "complete" => Ok(Self::Complete),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseProjectStageError(value.to_owned())),
        }
    }
}

/// Project aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    owner: UserId,
    title: String,
    stage: ProjectStage,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedProjectData {
    /// Persisted project identifier.
    pub id: ProjectId,
    /// Persisted owning user.
    pub owner: UserId,
    /// Persisted title.
    pub title: String,
    /// Persisted lifecycle stage.
    pub stage: ProjectStage,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates a draft project.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphDomainError::EmptyTitle`] when the title is blank.
    pub fn new(
        owner: UserId,
        title: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<Self, TaskGraphDomainError> {
        let raw = title.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskGraphDomainError::EmptyTitle);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: ProjectId::new(),
            owner,
            title: trimmed.to_owned(),
            stage: ProjectStage::Draft,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a project from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedProjectData) -> Self {
        Self {
            id: data.id,
            owner: data.owner,
            title: data.title,
            stage: data.stage,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the project identifier.
    #[must_use]
    pub const fn id(&self) -> ProjectId {
        self.id
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    /// Returns the project title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the lifecycle stage.
    #[must_use]
    pub const fn stage(&self) -> ProjectStage {
        self.stage
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

    /// Moves the project forward to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphDomainError::InvalidStageTransition`] unless
    /// `target` is strictly later than the current stage.
    pub fn advance_to(
        &mut self,
        target: ProjectStage,
        clock: &impl Clock,
    ) -> Result<(), TaskGraphDomainError> {
        if target <= self.stage {
            return Err(TaskGraphDomainError::InvalidStageTransition {
                project_id: self.id,
                from: self.stage,
                to: target,
            });
        }
        self.stage = target;
        self.updated_at = clock.utc();
        Ok(())
    }
}
