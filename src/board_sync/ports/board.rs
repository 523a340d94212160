//! External board client port.

use crate::board_sync::domain::ListId;
use crate::task_graph::domain::CardId;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for board client operations.
pub type BoardClientResult<T> = Result<T, BoardClientError>;

/// Current state of a card on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSnapshot {
    /// Card identifier.
    pub card_id: CardId,
    /// List the card is on.
    pub list_id: ListId,
    /// Board revision of the card.
    pub revision: u64,
}

/// Operations the coordination core needs from the external board.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoardClient: Send + Sync {
    /// Creates a card titled `title` on `list` and returns its identifier.
    async fn create_card(&self, title: &str, list: &ListId) -> BoardClientResult<CardId>;

    /// Moves an existing card to `list`.
    async fn update_card_list(&self, card: &CardId, list: &ListId) -> BoardClientResult<()>;

    /// Fetches the current list and revision of a card.
    async fn get_card(&self, card: &CardId) -> BoardClientResult<CardSnapshot>;
}

/// Errors returned by board client implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoardClientError {
    /// The board could not be reached or returned a server error.
    #[error("board unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within the allowed time.
    #[error("board call timed out after {0:?}")]
    Timeout(Duration),

    /// The card does not exist on the board.
    #[error("card not found on board: {0}")]
    NotFound(CardId),

    /// The board refused the request.
    #[error("board rejected request: {0}")]
    Rejected(String),
}

impl BoardClientError {
    /// Returns whether the failure is transient and worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}
