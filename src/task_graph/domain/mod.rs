//! Domain model for the project task graph.
//!
//! Projects own an ordered list of canonical construction phases; phases own
//! tasks. Task status follows a monotonic lifecycle. Board changes are ordered
//! by board revision; internal changes by a separate local version.

mod error;
mod ids;
mod phase;
mod project;
mod revision;
mod status;
mod task;

pub use error::{ParseProjectStageError, ParseTaskStatusError, TaskGraphDomainError};
pub use ids::{CardId, PhaseId, ProjectId, TaskId, UserId};
pub use phase::{Phase, PhaseKind};
pub use project::{PersistedProjectData, Project, ProjectStage};
pub use revision::Revision;
pub use status::{PhaseStatus, TaskStatus};
pub use task::{
    ApplyOutcome, ChangeSource, PersistedTaskData, Rejection, StatusChange, SyncConfirmation,
    Task,
};
