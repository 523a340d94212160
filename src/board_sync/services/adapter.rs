//! Pushes tasks to the board and applies board webhooks.

use chrono::Duration as ChronoDuration;
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::board_sync::{
    domain::{
        BackoffPolicy, BoardLayout, CardMapping, IgnoreReason, ListId, ProjectSyncState,
        PushOutcome, WebhookEvent, WebhookOutcome,
    },
    ports::{
        BoardClient, BoardClientError, BoardClientResult, CardMappingRepository,
        CardMappingRepositoryError, CardSnapshot,
    },
};
use crate::config::BoardSyncConfig;
use crate::keyed_lock::KeyedLock;
use crate::task_graph::{
    domain::{ApplyOutcome, CardId, ProjectId, Revision, StatusChange, Task, TaskId},
    ports::TaskGraphRepository,
    services::{TaskGraphService, TaskGraphServiceError},
};

/// Service-level errors for board synchronization.
///
/// Board failures never appear here; they degrade to
/// [`PushOutcome::Pending`].
#[derive(Debug, Error)]
pub enum BoardSyncServiceError {
    /// Mapping repository operation failed.
    #[error(transparent)]
    Mapping(#[from] CardMappingRepositoryError),
    /// Task graph operation failed.
    #[error(transparent)]
    TaskGraph(#[from] TaskGraphServiceError),
    /// A webhook body could not be decoded.
    #[error("malformed webhook payload: {0}")]
    MalformedWebhook(#[from] serde_json::Error),
}

/// Result type for board synchronization operations.
pub type BoardSyncServiceResult<T> = Result<T, BoardSyncServiceError>;

/// Translates between task graph mutations and board operations.
///
/// Card creation for a task runs under that task's lock so concurrent
/// pushes create at most one card. Card moves and webhook handling take no
/// lock; ordering rests on the task graph's revision check.
pub struct BoardAdapter<M, B, G, C>
where
    M: CardMappingRepository,
    B: BoardClient,
    G: TaskGraphRepository,
    C: Clock + Send + Sync,
{
    mappings: Arc<M>,
    board: Arc<B>,
    graph: Arc<TaskGraphService<G, C>>,
    clock: Arc<C>,
    layout: BoardLayout,
    backoff: BackoffPolicy,
    call_timeout: Duration,
    staleness: ChronoDuration,
    creation_locks: KeyedLock<TaskId>,
}

impl<M, B, G, C> BoardAdapter<M, B, G, C>
where
    M: CardMappingRepository,
    B: BoardClient,
    G: TaskGraphRepository,
    C: Clock + Send + Sync,
{
    /// Creates an adapter configured from `config`.
    #[must_use]
    pub fn new(
        mappings: Arc<M>,
        board: Arc<B>,
        graph: Arc<TaskGraphService<G, C>>,
        clock: Arc<C>,
        config: &BoardSyncConfig,
    ) -> Self {
        Self {
            mappings,
            board,
            graph,
            clock,
            layout: config.layout.clone(),
            backoff: BackoffPolicy::from(config),
            call_timeout: config.call_timeout(),
            staleness: config.staleness(),
            creation_locks: KeyedLock::new(),
        }
    }

    /// Returns the list layout.
    #[must_use]
    pub const fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    /// Returns the age after which a mapping is re-fetched.
    #[must_use]
    pub const fn staleness(&self) -> ChronoDuration {
        self.staleness
    }

    /// Returns the task graph service.
    #[must_use]
    pub const fn graph(&self) -> &Arc<TaskGraphService<G, C>> {
        &self.graph
    }

    /// Returns the mapping repository.
    #[must_use]
    pub const fn mappings(&self) -> &Arc<M> {
        &self.mappings
    }

    /// Returns the mapping for a task, if it has been pushed.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncServiceError::Mapping`] on repository failure.
    pub async fn mapping_for_task(
        &self,
        task_id: TaskId,
    ) -> BoardSyncServiceResult<Option<CardMapping>> {
        Ok(self.mappings.find_by_task(task_id).await?)
    }

    /// Returns the latest reconciliation record for a project.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncServiceError::Mapping`] on repository failure.
    pub async fn sync_state(
        &self,
        project_id: ProjectId,
    ) -> BoardSyncServiceResult<Option<ProjectSyncState>> {
        Ok(self.mappings.sync_state(project_id).await?)
    }

    /// Creates or moves the card for a task so it reflects the task status.
    ///
    /// Board failures are retried with backoff and then absorbed: the task
    /// stays sync-pending and [`PushOutcome::Pending`] is returned. The push
    /// is confirmed only once the card is read back on the pushed list; a
    /// card that a board user moved in the meantime is fed back through
    /// [`Self::handle_webhook`] and reported as [`PushOutcome::Superseded`].
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncServiceError`] when the task does not exist or a
    /// repository fails.
    pub async fn push_task(&self, task_id: TaskId) -> BoardSyncServiceResult<PushOutcome> {
        let task = self.graph.task(task_id).await?;
        let pushed = task.status();
        let list = self.layout.list_for(pushed);
        let mapping = match self.card_for(&task, list).await? {
            Ok(mapping) => mapping,
            Err(error) => return self.leave_pending(task_id, &error).await,
        };
        let snapshot = match self.fetch_card(mapping.card_id()).await {
            Ok(snapshot) => snapshot,
            Err(error) => return self.leave_pending(task_id, &error).await,
        };

        if self.layout.status_for(&snapshot.list_id) != Some(pushed) {
            info!(
                %task_id,
                %pushed,
                list_id = %snapshot.list_id,
                "card moved on the board during push"
            );
            return self.adopt_board_state(task_id, snapshot).await;
        }

        let revision = Revision::new(snapshot.revision);
        let confirmation = self
            .graph
            .confirm_sync(task_id, task.local_version(), revision)
            .await?;
        if !confirmation.is_in_sync() {
            return Ok(PushOutcome::Pending {
                task_id,
                reason: "task changed while the push was in flight".to_owned(),
            });
        }
        let confirmed = self
            .mappings
            .record_sync(mapping.card_id(), revision, self.clock.utc())
            .await?;
        Ok(PushOutcome::Synced(confirmed))
    }

    /// Applies a card movement reported by the board.
    ///
    /// Unmapped cards, unknown lists, archived mappings, and stale or
    /// duplicate deliveries are ignored and logged.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncServiceError`] when a repository fails or the
    /// mapped task no longer exists.
    pub async fn handle_webhook(
        &self,
        event: &WebhookEvent,
    ) -> BoardSyncServiceResult<WebhookOutcome> {
        let card_id = &event.card_id;
        let Some(mapping) = self.mappings.find_by_card(card_id).await? else {
            info!(%card_id, revision = event.revision, "webhook for unmapped card ignored");
            return Ok(WebhookOutcome::Ignored(IgnoreReason::UnmappedCard));
        };
        if mapping.is_archived() {
            debug!(%card_id, "webhook for archived mapping ignored");
            return Ok(WebhookOutcome::Ignored(IgnoreReason::ArchivedMapping));
        }
        let Some(status) = self.layout.status_for(&event.list_id) else {
            info!(%card_id, list_id = %event.list_id, "webhook for unknown list ignored");
            return Ok(WebhookOutcome::Ignored(IgnoreReason::UnknownList));
        };

        let revision = Revision::new(event.revision);
        let task_id = mapping.task_id();
        match self
            .graph
            .apply(task_id, StatusChange::board(status), revision)
            .await?
        {
            ApplyOutcome::Applied { current, .. } => {
                self.mappings
                    .record_sync(card_id, revision, self.clock.utc())
                    .await?;
                Ok(WebhookOutcome::Applied {
                    task_id,
                    status: current,
                    revision,
                })
            }
            ApplyOutcome::Rejected(rejection) => {
                debug!(%task_id, %card_id, ?rejection, "stale webhook ignored");
                Ok(WebhookOutcome::Ignored(IgnoreReason::StaleRevision))
            }
        }
    }

    /// Decodes a raw webhook body and applies it.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncServiceError::MalformedWebhook`] for an undecodable
    /// body and otherwise as [`Self::handle_webhook`].
    pub async fn handle_payload(&self, body: &str) -> BoardSyncServiceResult<WebhookOutcome> {
        let event: WebhookEvent = serde_json::from_str(body)?;
        self.handle_webhook(&event).await
    }

    /// Fetches the current state of a card with retries.
    ///
    /// # Errors
    ///
    /// Returns the last [`BoardClientError`] once retries are exhausted.
    pub async fn fetch_card(&self, card_id: &CardId) -> BoardClientResult<CardSnapshot> {
        self.call_board("get_card", || self.board.get_card(card_id))
            .await
    }

    async fn leave_pending(
        &self,
        task_id: TaskId,
        error: &BoardClientError,
    ) -> BoardSyncServiceResult<PushOutcome> {
        warn!(%task_id, %error, "board push failed, task left sync-pending");
        self.graph.mark_sync_pending(task_id).await?;
        Ok(PushOutcome::Pending {
            task_id,
            reason: error.to_string(),
        })
    }

    async fn adopt_board_state(
        &self,
        task_id: TaskId,
        snapshot: CardSnapshot,
    ) -> BoardSyncServiceResult<PushOutcome> {
        let event = WebhookEvent {
            card_id: snapshot.card_id,
            list_id: snapshot.list_id,
            revision: snapshot.revision,
            timestamp: self.clock.utc(),
        };
        match self.handle_webhook(&event).await? {
            WebhookOutcome::Applied {
                status, revision, ..
            } => Ok(PushOutcome::Superseded {
                task_id,
                status,
                revision,
            }),
            WebhookOutcome::Ignored(IgnoreReason::StaleRevision) => {
                // A newer board change reached the task first.
                let current = self.graph.task(task_id).await?;
                if current.sync_pending() {
                    return Ok(PushOutcome::Pending {
                        task_id,
                        reason: "task changed while the push was in flight".to_owned(),
                    });
                }
                Ok(PushOutcome::Superseded {
                    task_id,
                    status: current.status(),
                    revision: current.revision(),
                })
            }
            WebhookOutcome::Ignored(reason) => {
                warn!(
                    %task_id,
                    list_id = %event.list_id,
                    ?reason,
                    "card state read back unusable"
                );
                self.graph.mark_sync_pending(task_id).await?;
                Ok(PushOutcome::Pending {
                    task_id,
                    reason: format!("card read back on list {}", event.list_id),
                })
            }
        }
    }

    async fn card_for(
        &self,
        task: &Task,
        list: &ListId,
    ) -> BoardSyncServiceResult<Result<CardMapping, BoardClientError>> {
        let task_id = task.id();
        if let Some(existing) = self.mappings.find_by_task(task_id).await? {
            return Ok(self.move_card(existing, list).await);
        }

        let _guard = self.creation_locks.lock(&task_id).await;
        if let Some(existing) = self.mappings.find_by_task(task_id).await? {
            return Ok(self.move_card(existing, list).await);
        }
        let card_id = match self
            .call_board("create_card", || self.board.create_card(task.title(), list))
            .await
        {
            Ok(card_id) => card_id,
            Err(error) => return Ok(Err(error)),
        };
        let mapping = CardMapping::new(task_id, task.project_id(), card_id.clone(), &*self.clock);
        if !self.mappings.insert(&mapping).await? {
            warn!(%task_id, %card_id, "task mapped elsewhere during creation, card orphaned");
            if let Some(existing) = self.mappings.find_by_task(task_id).await? {
                return Ok(self.move_card(existing, list).await);
            }
        }
        self.graph.attach_card(task_id, card_id.clone()).await?;
        info!(%task_id, %card_id, %list, "board card created");
        Ok(Ok(mapping))
    }

    async fn move_card(
        &self,
        mapping: CardMapping,
        list: &ListId,
    ) -> Result<CardMapping, BoardClientError> {
        self.call_board("update_card_list", || {
            self.board.update_card_list(mapping.card_id(), list)
        })
        .await?;
        Ok(mapping)
    }

    async fn call_board<T, F, Fut>(&self, operation: &'static str, mut call: F) -> BoardClientResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = BoardClientResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            let result = tokio::time::timeout(self.call_timeout, call())
                .await
                .unwrap_or_else(|_| Err(BoardClientError::Timeout(self.call_timeout)));
            match result {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && self.backoff.allows_retry(attempt) => {
                    let delay = self.backoff.delay_after(attempt);
                    debug!(operation, attempt, ?delay, %error, "board call failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    warn!(operation, attempt, %error, "board call failed");
                    return Err(error);
                }
            }
        }
    }
}
