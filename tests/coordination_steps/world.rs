//! Shared world state for project coordination BDD scenarios.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rstest::fixture;
use tokio_util::sync::CancellationToken;
use vibehouse::{
    board_sync::{adapters::memory::InMemoryBoard, domain::WebhookOutcome},
    clock::ManualClock,
    config::CoordinatorConfig,
    coordinator::{Coordinator, CoordinatorParts, ProjectBootstrap},
    dispute::domain::DisputeId,
    events::{adapters::memory::RecordingSink, services::EventBus},
    plan::adapters::RateCardPlanGenerator,
    task_graph::domain::{CardId, TaskId},
};

/// Coordinator type used by the BDD world.
pub type TestCoordinator = Coordinator<InMemoryBoard, RateCardPlanGenerator, ManualClock>;

/// Scenario world for coordination behaviour tests.
pub struct CoordinationWorld {
    pub clock: Arc<ManualClock>,
    pub board: Arc<InMemoryBoard>,
    pub sink: RecordingSink,
    pub coordinator: TestCoordinator,
    pub project: Option<ProjectBootstrap>,
    pub task_id: Option<TaskId>,
    pub card_id: Option<CardId>,
    pub dispute_id: Option<DisputeId>,
    pub webhook_outcomes: Vec<WebhookOutcome>,
    pub fired_thresholds: Vec<u16>,
}

impl CoordinationWorld {
    /// Creates a world around a fresh coordinator with default settings.
    #[must_use]
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0)
                .single()
                .expect("valid start instant"),
        ));
        let board = Arc::new(InMemoryBoard::new());
        let sink = RecordingSink::new();
        let coordinator = Coordinator::new(CoordinatorParts {
            board: Arc::clone(&board),
            planner: Arc::new(RateCardPlanGenerator::new()),
            clock: Arc::clone(&clock),
            events: EventBus::new().with_sink(Arc::new(sink.clone())),
            config: CoordinatorConfig::default(),
            shutdown: CancellationToken::new(),
        })
        .expect("default configuration is valid");

        Self {
            clock,
            board,
            sink,
            coordinator,
            project: None,
            task_id: None,
            card_id: None,
            dispute_id: None,
            webhook_outcomes: Vec::new(),
            fired_thresholds: Vec::new(),
        }
    }

    /// Returns the bootstrapped project.
    pub fn project(&self) -> Result<&ProjectBootstrap, eyre::Report> {
        self.project
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing bootstrapped project in scenario world"))
    }
}

impl Default for CoordinationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> CoordinationWorld {
    CoordinationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
