//! Board synchronization domain errors.

use super::ListId;
use thiserror::Error;

/// Errors returned by board layout validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoardSyncDomainError {
    /// A list identifier is empty after trimming.
    #[error("list identifier must not be empty")]
    EmptyListId,

    /// Two statuses are pushed to the same list.
    #[error("list {0} is the target of more than one status")]
    DuplicateTargetList(ListId),

    /// An alias maps a status target list to a different status.
    #[error("alias for list {0} contradicts its target status")]
    ConflictingAlias(ListId),
}
