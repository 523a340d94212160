//! Facade wiring the bounded contexts and background loops together.
//!
//! [`Coordinator`] is the composition root of the crate. It builds every
//! service over the in-memory stores, registers the timer handlers with one
//! [`TimerScheduler`], and exposes the operations the rest of the system
//! calls. The board client, plan generator, and clock stay generic so tests
//! and embedding binaries supply their own.

use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::board_sync::{
    adapters::memory::InMemoryCardMappingRepository,
    domain::{PushOutcome, WebhookOutcome},
    ports::BoardClient,
    services::{
        BoardAdapter, BoardResyncHandler, BoardSyncServiceError, ReconcileReport,
        ReconciliationEngine,
    },
};
use crate::budget::{
    adapters::memory::InMemoryBudgetRepository,
    domain::{BudgetSummary, Money, SpendCategory},
    services::{BudgetReviewHandler, BudgetServiceError, BudgetState, BudgetWatcher},
};
use crate::config::{ConfigError, CoordinatorConfig};
use crate::dispute::{
    adapters::memory::InMemoryDisputeRepository,
    domain::{Dispute, DisputeId, NewDispute, StageDeadlines},
    services::{DisputeEscalationHandler, DisputeService, DisputeServiceError, PotentialDispute},
};
use crate::events::services::EventBus;
use crate::plan::{
    domain::{CostTier, PlanProposal},
    ports::{PlanGenerator, PlanGeneratorError},
};
use crate::scheduler::{
    adapters::memory::InMemoryTimerRepository,
    domain::{FiringReport, TimerKind},
    ports::TimerRepositoryError,
    services::{TimerQueue, TimerScheduler},
};
use crate::task_graph::{
    adapters::memory::InMemoryTaskGraphRepository,
    domain::{ApplyOutcome, ProjectId, TaskId, TaskStatus, UserId},
    services::{CreateProjectRequest, ProjectGraph, TaskGraphService, TaskGraphServiceError},
};

/// Task graph service over the in-memory store.
pub type Graph<C> = TaskGraphService<InMemoryTaskGraphRepository, C>;

/// Board adapter over the in-memory stores.
pub type Board<B, C> = BoardAdapter<InMemoryCardMappingRepository, B, InMemoryTaskGraphRepository, C>;

/// Reconciliation engine over the in-memory stores.
pub type Reconciler<B, C> =
    ReconciliationEngine<InMemoryCardMappingRepository, B, InMemoryTaskGraphRepository, C>;

/// Dispute service over the in-memory stores.
pub type Disputes<C> = DisputeService<
    InMemoryDisputeRepository,
    InMemoryTaskGraphRepository,
    InMemoryTimerRepository,
    C,
>;

/// Budget watcher over the in-memory store.
pub type Budget<C> = BudgetWatcher<InMemoryBudgetRepository, C>;

/// Errors surfaced by coordinator operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Task graph operation failed.
    #[error(transparent)]
    TaskGraph(#[from] TaskGraphServiceError),
    /// Board synchronization failed locally.
    #[error(transparent)]
    BoardSync(#[from] BoardSyncServiceError),
    /// Dispute operation failed.
    #[error(transparent)]
    Dispute(#[from] DisputeServiceError),
    /// Budget operation failed.
    #[error(transparent)]
    Budget(#[from] BudgetServiceError),
    /// Plan generation failed.
    #[error(transparent)]
    Plan(#[from] PlanGeneratorError),
    /// Timer store operation failed.
    #[error(transparent)]
    Timer(#[from] TimerRepositoryError),
    /// The generated proposal has no option for the requested tier.
    #[error("plan proposal has no {0} cost option")]
    MissingCostOption(CostTier),
}

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Collaborators supplied to [`Coordinator::new`].
pub struct CoordinatorParts<B, P, C> {
    /// External board client.
    pub board: Arc<B>,
    /// Plan and cost estimation transform.
    pub planner: Arc<P>,
    /// Time source shared by every service.
    pub clock: Arc<C>,
    /// Event bus with the embedding application's sinks attached.
    pub events: EventBus,
    /// Operational settings.
    pub config: CoordinatorConfig,
    /// Token stopping the firing loop and in-flight reconciliation passes.
    pub shutdown: CancellationToken,
}

/// Request to create a project from a free-text description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    /// Project owner.
    pub owner: UserId,
    /// Project title.
    pub title: String,
    /// Free-text description handed to the plan generator.
    pub description: String,
    /// Cost option whose total becomes the approved budget.
    pub tier: CostTier,
}

/// Project created by [`Coordinator::bootstrap_project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBootstrap {
    /// Seeded project graph.
    pub graph: ProjectGraph,
    /// Proposal the budget was taken from.
    pub proposal: PlanProposal,
    /// Ledger after the approved budget was set.
    pub budget: BudgetState,
}

/// Result of a user status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatusUpdate {
    /// Outcome of the revision-checked change.
    pub outcome: ApplyOutcome,
    /// Board push triggered by a status change, if any.
    pub push: Option<PushOutcome>,
}

/// Composition root exposing the coordination operations.
pub struct Coordinator<B, P, C>
where
    B: BoardClient + 'static,
    P: PlanGenerator,
    C: Clock + Send + Sync + 'static,
{
    graph: Arc<Graph<C>>,
    board: Arc<Board<B, C>>,
    reconciler: Arc<Reconciler<B, C>>,
    disputes: Arc<Disputes<C>>,
    budget: Arc<Budget<C>>,
    timers: TimerQueue<InMemoryTimerRepository, C>,
    scheduler: TimerScheduler<InMemoryTimerRepository, C>,
    planner: Arc<P>,
    clock: Arc<C>,
    config: CoordinatorConfig,
    shutdown: CancellationToken,
}

impl<B, P, C> Coordinator<B, P, C>
where
    B: BoardClient + 'static,
    P: PlanGenerator,
    C: Clock + Send + Sync + 'static,
{
    /// Builds every service and registers the timer handlers.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Config`] when the configuration is
    /// invalid.
    pub fn new(parts: CoordinatorParts<B, P, C>) -> CoordinatorResult<Self> {
        let CoordinatorParts {
            board,
            planner,
            clock,
            events,
            config,
            shutdown,
        } = parts;
        config.validate()?;
        let thresholds = config.budget.threshold_set()?;

        let graph_repository = Arc::new(InMemoryTaskGraphRepository::new());
        let timer_repository = Arc::new(InMemoryTimerRepository::new());
        let graph = Arc::new(TaskGraphService::new(
            Arc::clone(&graph_repository),
            Arc::clone(&clock),
            events.clone(),
        ));
        let adapter = Arc::new(BoardAdapter::new(
            Arc::new(InMemoryCardMappingRepository::new()),
            board,
            Arc::clone(&graph),
            Arc::clone(&clock),
            &config.board,
        ));
        let reconciler = Arc::new(ReconciliationEngine::new(
            Arc::clone(&adapter),
            Arc::clone(&clock),
        ));
        let timers = TimerQueue::new(Arc::clone(&timer_repository), Arc::clone(&clock));
        let disputes = Arc::new(DisputeService::new(
            Arc::new(InMemoryDisputeRepository::new()),
            Arc::clone(&graph),
            timers.clone(),
            Arc::clone(&clock),
            events.clone(),
            StageDeadlines::from(&config.disputes),
        ));
        let budget = Arc::new(BudgetWatcher::new(
            Arc::new(InMemoryBudgetRepository::new()),
            Arc::clone(&clock),
            events,
            thresholds,
        ));

        let scheduler = TimerScheduler::new(
            timer_repository,
            Arc::clone(&clock),
            config.scheduler.clone(),
        )
        .with_handler(
            TimerKind::DisputeEscalation,
            Arc::new(DisputeEscalationHandler::new(Arc::clone(&disputes))),
        )
        .with_handler(
            TimerKind::BoardResync,
            Arc::new(BoardResyncHandler::new(
                Arc::clone(&reconciler),
                Arc::clone(&clock),
                config.board.reconcile_interval(),
                shutdown.clone(),
            )),
        )
        .with_handler(
            TimerKind::BudgetReview,
            Arc::new(BudgetReviewHandler::new(
                Arc::clone(&budget),
                graph_repository,
                Arc::clone(&clock),
                config.budget.review_interval(),
            )),
        );

        Ok(Self {
            graph,
            board: adapter,
            reconciler,
            disputes,
            budget,
            timers,
            scheduler,
            planner,
            clock,
            config,
            shutdown,
        })
    }

    /// Returns the task graph service.
    #[must_use]
    pub const fn graph(&self) -> &Arc<Graph<C>> {
        &self.graph
    }

    /// Returns the board adapter.
    #[must_use]
    pub const fn board(&self) -> &Arc<Board<B, C>> {
        &self.board
    }

    /// Returns the dispute service.
    #[must_use]
    pub const fn disputes(&self) -> &Arc<Disputes<C>> {
        &self.disputes
    }

    /// Returns the budget watcher.
    #[must_use]
    pub const fn budget(&self) -> &Arc<Budget<C>> {
        &self.budget
    }

    /// Returns the timer queue.
    #[must_use]
    pub const fn timers(&self) -> &TimerQueue<InMemoryTimerRepository, C> {
        &self.timers
    }

    /// Returns the operational settings.
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Generates a plan, creates the project, approves the chosen option's
    /// total, and arms the project's reconciliation and budget review
    /// timers.
    ///
    /// The first board resync is due immediately so the seeded tasks reach
    /// the board on the next firing pass.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when plan generation fails, the proposal
    /// lacks the requested tier, or a store rejects a write.
    pub async fn bootstrap_project(
        &self,
        request: BootstrapRequest,
    ) -> CoordinatorResult<ProjectBootstrap> {
        let proposal = self.planner.generate_plan(&request.description).await?;
        let option = proposal
            .option(request.tier)
            .ok_or(CoordinatorError::MissingCostOption(request.tier))?;
        let approved = option.total;

        let graph = self
            .graph
            .create_project(CreateProjectRequest::new(request.owner, request.title))
            .await?;
        let project_id = graph.project.id();
        let budget = self.budget.set_approved(project_id, approved).await?;

        let now = self.clock.utc();
        self.timers
            .schedule(TimerKind::BoardResync, project_id.into_inner(), now, json!({}))
            .await?;
        self.timers
            .schedule(
                TimerKind::BudgetReview,
                project_id.into_inner(),
                now + self.config.budget.review_interval(),
                json!({}),
            )
            .await?;

        info!(
            %project_id,
            tier = %request.tier,
            %approved,
            tasks = graph.tasks.len(),
            "project bootstrapped"
        );
        Ok(ProjectBootstrap {
            graph,
            proposal,
            budget,
        })
    }

    /// Applies a user status change and pushes it to the board.
    ///
    /// A stale or duplicate change is returned as a rejected outcome with no
    /// push. A board outage leaves the task sync-pending instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] for an unknown task, a transition the
    /// lifecycle forbids, or a store failure.
    pub async fn apply_task_status(
        &self,
        task_id: TaskId,
        target: TaskStatus,
    ) -> CoordinatorResult<TaskStatusUpdate> {
        let outcome = self.graph.apply_user_status(task_id, target).await?;
        let push = if outcome.status_changed() {
            Some(self.board.push_task(task_id).await?)
        } else {
            None
        };
        Ok(TaskStatusUpdate { outcome, push })
    }

    /// Decodes and applies a raw board webhook body.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::BoardSync`] for a malformed body or a
    /// store failure.
    pub async fn handle_board_webhook(&self, body: &str) -> CoordinatorResult<WebhookOutcome> {
        Ok(self.board.handle_payload(body).await?)
    }

    /// Files a dispute and pushes the task it blocked, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Dispute`] when the filing is invalid or a
    /// store fails.
    pub async fn file_dispute(&self, request: NewDispute) -> CoordinatorResult<Dispute> {
        let dispute = self.disputes.file(request).await?;
        self.push_disputed_task(&dispute).await?;
        Ok(dispute)
    }

    /// Records a party response on a dispute.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Dispute`] when the dispute is unknown or
    /// resolved.
    pub async fn respond_to_dispute(
        &self,
        dispute_id: DisputeId,
        author: &str,
        message: &str,
    ) -> CoordinatorResult<Dispute> {
        Ok(self.disputes.respond(dispute_id, author, message).await?)
    }

    /// Escalates a dispute to its next stage by hand.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Dispute`] when no later stage exists or
    /// the dispute is resolved.
    pub async fn escalate_dispute(&self, dispute_id: DisputeId) -> CoordinatorResult<Dispute> {
        Ok(self.disputes.escalate(dispute_id).await?)
    }

    /// Lists blocked tasks of a project that no open dispute covers yet.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Dispute`] when a store fails.
    pub async fn dispute_candidates(
        &self,
        project_id: ProjectId,
    ) -> CoordinatorResult<Vec<PotentialDispute>> {
        Ok(self.disputes.detect_potential(project_id).await?)
    }

    /// Resolves a dispute and pushes the task it released, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Dispute`] when the dispute is unknown or
    /// already resolved.
    pub async fn resolve_dispute(
        &self,
        dispute_id: DisputeId,
        outcome: &str,
    ) -> CoordinatorResult<Dispute> {
        let dispute = self.disputes.resolve(dispute_id, outcome).await?;
        self.push_disputed_task(&dispute).await?;
        Ok(dispute)
    }

    /// Records spend and fires newly crossed budget thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Budget`] for a negative amount, an
    /// overflowing total, or a store failure.
    pub async fn record_spend(
        &self,
        project_id: ProjectId,
        amount: Money,
        category: SpendCategory,
    ) -> CoordinatorResult<BudgetState> {
        Ok(self.budget.record_spend(project_id, amount, category).await?)
    }

    /// Returns the budget summary for a project.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Budget`] on store failure.
    pub async fn budget_summary(&self, project_id: ProjectId) -> CoordinatorResult<BudgetSummary> {
        Ok(self.budget.summary(project_id).await?)
    }

    /// Reconciles one project against the board immediately.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::BoardSync`] for an unknown project or a
    /// store failure.
    pub async fn reconcile_project(
        &self,
        project_id: ProjectId,
    ) -> CoordinatorResult<ReconcileReport> {
        Ok(self
            .reconciler
            .reconcile_project(project_id, &self.shutdown)
            .await?)
    }

    /// Runs one firing pass over due timers.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Timer`] when the timer store fails.
    pub async fn fire_due_timers(&self) -> CoordinatorResult<FiringReport> {
        Ok(self.scheduler.fire_due(&self.shutdown).await?)
    }

    /// Drives the timer firing loop until the shutdown token is cancelled.
    ///
    /// A handler already running when shutdown is requested finishes its
    /// current entity first.
    pub async fn run(&self) {
        self.scheduler.run(self.shutdown.clone()).await;
    }

    /// Requests shutdown of [`Self::run`] and any reconciliation pass.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn push_disputed_task(&self, dispute: &Dispute) -> CoordinatorResult<()> {
        let Some(task_id) = dispute.task_id() else {
            return Ok(());
        };
        if !self.graph.task(task_id).await?.sync_pending() {
            return Ok(());
        }
        let outcome = self.board.push_task(task_id).await?;
        debug!(%task_id, synced = outcome.is_synced(), "disputed task pushed");
        Ok(())
    }
}
