//! Periodic repair of drift between the task graph and the board.

use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{BoardAdapter, BoardSyncServiceResult};
use crate::board_sync::{
    domain::{
        ProjectSyncState, PushOutcome, SyncStatus, WebhookEvent, WebhookOutcome,
        board_state_hash,
    },
    ports::{BoardClient, CardMappingRepository},
};
use crate::task_graph::{
    domain::{ProjectId, ProjectStage, Revision, Task},
    ports::TaskGraphRepository,
    services::TaskGraphService,
};

/// Counts from one project reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Tasks whose internal state was pushed to the board.
    pub pushed: usize,
    /// Tasks updated from newer board state.
    pub pulled: usize,
    /// Tasks left sync-pending after a board failure.
    pub pending: usize,
    /// Tasks that already matched or needed no check.
    pub unchanged: usize,
    /// Whether shutdown stopped the pass early.
    pub interrupted: bool,
}

impl ReconcileReport {
    const fn status(&self) -> SyncStatus {
        if self.interrupted {
            SyncStatus::Interrupted
        } else if self.pending > 0 {
            SyncStatus::Pending
        } else {
            SyncStatus::Synced
        }
    }
}

/// Re-derives task state from the board to repair missed webhooks.
///
/// Runs concurrently with live webhook delivery without locking; newer board
/// state goes through the same revision-checked path as a webhook.
pub struct ReconciliationEngine<M, B, G, C>
where
    M: CardMappingRepository,
    B: BoardClient,
    G: TaskGraphRepository,
    C: Clock + Send + Sync,
{
    adapter: Arc<BoardAdapter<M, B, G, C>>,
    clock: Arc<C>,
}

impl<M, B, G, C> ReconciliationEngine<M, B, G, C>
where
    M: CardMappingRepository,
    B: BoardClient,
    G: TaskGraphRepository,
    C: Clock + Send + Sync,
{
    /// Creates an engine reconciling through `adapter`.
    #[must_use]
    pub const fn new(adapter: Arc<BoardAdapter<M, B, G, C>>, clock: Arc<C>) -> Self {
        Self { adapter, clock }
    }

    /// Returns the task graph service reconciled against.
    #[must_use]
    pub fn graph(&self) -> &Arc<TaskGraphService<G, C>> {
        self.adapter.graph()
    }

    /// Reconciles every project, stopping between projects on shutdown.
    ///
    /// A project that fails to reconcile is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`super::BoardSyncServiceError`] when projects cannot be
    /// listed.
    pub async fn run_pass(
        &self,
        shutdown: &CancellationToken,
    ) -> BoardSyncServiceResult<Vec<ReconcileReport>> {
        let projects = self.adapter.graph().projects().await?;
        let mut reports = Vec::with_capacity(projects.len());
        for project in projects {
            if shutdown.is_cancelled() {
                info!("shutdown requested, stopping reconciliation pass");
                break;
            }
            match self.reconcile_project(project.id(), shutdown).await {
                Ok(report) => reports.push(report),
                Err(error) => warn!(project_id = %project.id(), %error, "reconciliation failed"),
            }
        }
        Ok(reports)
    }

    /// Reconciles one project and records its sync state.
    ///
    /// Unmapped and sync-pending tasks are pushed. Mapped tasks whose
    /// mapping is stale, or that are sync-pending, have their card
    /// re-fetched: newer board state is applied as a webhook, and a card on
    /// a list that disagrees with the task at the same revision is moved
    /// back. An archived project has its mappings archived instead.
    ///
    /// # Errors
    ///
    /// Returns [`super::BoardSyncServiceError`] when the project does not
    /// exist or a repository fails.
    pub async fn reconcile_project(
        &self,
        project_id: ProjectId,
        shutdown: &CancellationToken,
    ) -> BoardSyncServiceResult<ReconcileReport> {
        let graph = self.adapter.graph().project_graph(project_id).await?;
        let mut report = ReconcileReport::default();
        if graph.project.stage() == ProjectStage::Archived {
            let archived = self.adapter.mappings().archive_project(project_id).await?;
            debug!(%project_id, archived, "archived project mappings");
            self.record_state(project_id, SyncStatus::Archived).await?;
            return Ok(report);
        }

        for task in &graph.tasks {
            if shutdown.is_cancelled() {
                report.interrupted = true;
                break;
            }
            self.reconcile_task(task, self.clock.utc(), &mut report).await?;
        }

        self.record_state(project_id, report.status()).await?;
        info!(
            %project_id,
            pushed = report.pushed,
            pulled = report.pulled,
            pending = report.pending,
            unchanged = report.unchanged,
            interrupted = report.interrupted,
            "project reconciled"
        );
        Ok(report)
    }

    async fn reconcile_task(
        &self,
        task: &Task,
        now: DateTime<Utc>,
        report: &mut ReconcileReport,
    ) -> BoardSyncServiceResult<()> {
        let Some(mapping) = self.adapter.mapping_for_task(task.id()).await? else {
            return self.push(task, report).await;
        };
        if !task.sync_pending() && !mapping.is_stale(now, self.adapter.staleness()) {
            report.unchanged += 1;
            return Ok(());
        }

        let snapshot = match self.adapter.fetch_card(mapping.card_id()).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(
                    task_id = %task.id(),
                    card_id = %mapping.card_id(),
                    %error,
                    "card fetch failed during reconciliation"
                );
                report.pending += 1;
                return Ok(());
            }
        };
        let board_revision = Revision::new(snapshot.revision);
        if board_revision.is_newer_than(task.revision()) {
            let event = WebhookEvent {
                card_id: snapshot.card_id,
                list_id: snapshot.list_id,
                revision: snapshot.revision,
                timestamp: now,
            };
            match self.adapter.handle_webhook(&event).await? {
                WebhookOutcome::Applied { .. } => report.pulled += 1,
                WebhookOutcome::Ignored(reason) => {
                    debug!(task_id = %task.id(), ?reason, "reconciled card state ignored");
                    report.unchanged += 1;
                }
            }
            return Ok(());
        }

        let on_board = self.adapter.layout().status_for(&snapshot.list_id);
        if task.sync_pending() || on_board != Some(task.status()) {
            return self.push(task, report).await;
        }
        self.adapter
            .mappings()
            .record_sync(mapping.card_id(), board_revision, now)
            .await?;
        report.unchanged += 1;
        Ok(())
    }

    async fn push(&self, task: &Task, report: &mut ReconcileReport) -> BoardSyncServiceResult<()> {
        match self.adapter.push_task(task.id()).await? {
            PushOutcome::Synced(_) => report.pushed += 1,
            PushOutcome::Superseded { .. } => report.pulled += 1,
            PushOutcome::Pending { .. } => report.pending += 1,
        }
        Ok(())
    }

    async fn record_state(
        &self,
        project_id: ProjectId,
        status: SyncStatus,
    ) -> BoardSyncServiceResult<()> {
        let mappings = self.adapter.mappings().list_for_project(project_id).await?;
        let state = ProjectSyncState {
            project_id,
            synced_at: self.clock.utc(),
            status,
            board_hash: board_state_hash(&mappings),
        };
        self.adapter.mappings().save_sync_state(&state).await?;
        Ok(())
    }
}
