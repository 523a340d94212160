//! In-memory stand-in for the external board.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::board_sync::{
    domain::ListId,
    ports::{BoardClient, BoardClientError, BoardClientResult, CardSnapshot},
};
use crate::task_graph::domain::CardId;

#[derive(Debug, Clone)]
struct StoredCard {
    title: String,
    list_id: ListId,
    revision: u64,
}

#[derive(Debug, Default)]
struct BoardState {
    cards: HashMap<CardId, StoredCard>,
    next_card: u64,
}

/// Board fake with per-card revisions, failure injection, and call counters.
///
/// Every create or move bumps the card's revision, mirroring how the real
/// board stamps webhook deliveries. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBoard {
    state: Arc<Mutex<BoardState>>,
    failures_remaining: Arc<AtomicU32>,
    create_calls: Arc<AtomicUsize>,
    create_delay: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls fail as unavailable.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Delays every card creation by `delay`.
    pub fn set_create_delay(&self, delay: Duration) {
        *self
            .create_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Returns how many times card creation was requested.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of cards on the board.
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.lock().cards.len()
    }

    /// Returns the current state of a card, if it exists.
    #[must_use]
    pub fn card(&self, card_id: &CardId) -> Option<CardSnapshot> {
        self.lock()
            .cards
            .get(card_id)
            .map(|card| snapshot(card_id, card))
    }

    /// Returns the title of a card, if it exists.
    #[must_use]
    pub fn card_title(&self, card_id: &CardId) -> Option<String> {
        self.lock()
            .cards
            .get(card_id)
            .map(|card| card.title.clone())
    }

    /// Moves a card as a board user would, without going through the
    /// client. Returns the new snapshot.
    #[must_use]
    pub fn move_card_externally(&self, card_id: &CardId, list_id: &ListId) -> Option<CardSnapshot> {
        let mut state = self.lock();
        let card = state.cards.get_mut(card_id)?;
        card.list_id = list_id.clone();
        card.revision += 1;
        Some(snapshot(card_id, card))
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn injected_failure(&self) -> BoardClientResult<()> {
        let consumed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if consumed {
            return Err(BoardClientError::Unavailable(
                "injected board outage".to_owned(),
            ));
        }
        Ok(())
    }
}

fn snapshot(card_id: &CardId, card: &StoredCard) -> CardSnapshot {
    CardSnapshot {
        card_id: card_id.clone(),
        list_id: card.list_id.clone(),
        revision: card.revision,
    }
}

#[async_trait]
impl BoardClient for InMemoryBoard {
    async fn create_card(&self, title: &str, list: &ListId) -> BoardClientResult<CardId> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        let delay = *self
            .create_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pause) = delay {
            tokio::time::sleep(pause).await;
        }
        let mut state = self.lock();
        state.next_card += 1;
        let card_id = CardId::new(format!("card-{}", state.next_card))
            .map_err(|error| BoardClientError::Rejected(error.to_string()))?;
        state.cards.insert(
            card_id.clone(),
            StoredCard {
                title: title.to_owned(),
                list_id: list.clone(),
                revision: 1,
            },
        );
        Ok(card_id)
    }

    async fn update_card_list(&self, card: &CardId, list: &ListId) -> BoardClientResult<()> {
        self.injected_failure()?;
        let mut state = self.lock();
        let Some(stored) = state.cards.get_mut(card) else {
            return Err(BoardClientError::NotFound(card.clone()));
        };
        if stored.list_id != *list {
            stored.list_id = list.clone();
            stored.revision += 1;
        }
        Ok(())
    }

    async fn get_card(&self, card: &CardId) -> BoardClientResult<CardSnapshot> {
        self.injected_failure()?;
        self.lock()
            .cards
            .get(card)
            .map(|stored| snapshot(card, stored))
            .ok_or_else(|| BoardClientError::NotFound(card.clone()))
    }
}
