//! Integration tests for the coordinator facade over in-memory stores.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use rstest::{fixture, rstest};
use tokio_util::sync::CancellationToken;
use vibehouse::{
    board_sync::{adapters::memory::InMemoryBoard, domain::PushOutcome},
    budget::domain::{Money, SpendCategory},
    clock::ManualClock,
    config::CoordinatorConfig,
    coordinator::{
        BootstrapRequest, Coordinator, CoordinatorError, CoordinatorParts, ProjectBootstrap,
    },
    dispute::domain::{DisputeCategory, DisputeStage, HistoryAction, HistoryEntry, NewDispute},
    events::{
        adapters::memory::{RecordingNotifier, RecordingSink},
        services::{EventBus, NotificationSink},
    },
    plan::{adapters::RateCardPlanGenerator, domain::CostTier},
    task_graph::{
        domain::{ApplyOutcome, Task, TaskStatus, UserId},
        services::TaskGraphServiceError,
    },
};

type TestCoordinator = Coordinator<InMemoryBoard, RateCardPlanGenerator, ManualClock>;

struct Harness {
    clock: Arc<ManualClock>,
    board: Arc<InMemoryBoard>,
    sink: RecordingSink,
    notifier: RecordingNotifier,
    coordinator: Arc<TestCoordinator>,
}

impl Harness {
    async fn bootstrap(&self) -> ProjectBootstrap {
        self.coordinator
            .bootstrap_project(BootstrapRequest {
                owner: UserId::new(),
                title: "Maple Street build".to_owned(),
                description: "two-story colonial with a wraparound porch".to_owned(),
                tier: CostTier::Balanced,
            })
            .await
            .expect("project bootstraps")
    }

    async fn task(&self, task: &Task) -> Task {
        self.coordinator
            .graph()
            .task(task.id())
            .await
            .expect("task exists")
    }

    fn card_list(&self, task: &Task) -> Option<String> {
        let card_id = task.card_id()?;
        self.board
            .card(card_id)
            .map(|card| card.list_id.as_str().to_owned())
    }

    async fn fire_after(&self, delta: Duration) {
        self.clock.advance(delta);
        self.coordinator
            .fire_due_timers()
            .await
            .expect("timer pass");
    }
}

fn fast_config() -> CoordinatorConfig {
    let mut config = CoordinatorConfig::default();
    config.board.backoff_base_ms = 1;
    config.board.backoff_cap_ms = 2;
    config.scheduler.poll_interval_ms = 10;
    config
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 5, 4, 7, 30, 0)
            .single()
            .expect("valid start instant"),
    ));
    let board = Arc::new(InMemoryBoard::new());
    let sink = RecordingSink::new();
    let notifier = RecordingNotifier::new();
    let events = EventBus::new()
        .with_sink(Arc::new(sink.clone()))
        .with_sink(Arc::new(NotificationSink::new(notifier.clone())));
    let coordinator = Coordinator::new(CoordinatorParts {
        board: Arc::clone(&board),
        planner: Arc::new(RateCardPlanGenerator::new()),
        clock: Arc::clone(&clock),
        events,
        config: fast_config(),
        shutdown: CancellationToken::new(),
    })
    .expect("configuration is valid");
    Harness {
        clock,
        board,
        sink,
        notifier,
        coordinator: Arc::new(coordinator),
    }
}

#[rstest]
fn invalid_configuration_is_rejected() {
    let mut config = CoordinatorConfig::default();
    config.board.max_attempts = 0;

    let result = Coordinator::new(CoordinatorParts {
        board: Arc::new(InMemoryBoard::new()),
        planner: Arc::new(RateCardPlanGenerator::new()),
        clock: Arc::new(ManualClock::default()),
        events: EventBus::new(),
        config,
        shutdown: CancellationToken::new(),
    });

    assert!(matches!(result, Err(CoordinatorError::Config(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_approves_chosen_option_and_arms_timers(harness: Harness) {
    let created = harness.bootstrap().await;

    let balanced = created
        .proposal
        .option(CostTier::Balanced)
        .expect("balanced option");
    assert_eq!(created.budget.budget.approved(), Some(balanced.total));
    assert!(created.budget.fired.is_empty());
    assert_eq!(created.graph.tasks.len(), 44);
    assert_eq!(harness.board.card_count(), 0);

    let report = harness
        .coordinator
        .fire_due_timers()
        .await
        .expect("timer pass");
    assert_eq!(report.fired, 1);
    assert_eq!(report.rescheduled, 1);
    assert_eq!(harness.board.card_count(), 44);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn user_status_change_moves_the_card(harness: Harness) {
    let created = harness.bootstrap().await;
    harness.fire_after(Duration::zero()).await;
    let task = created.graph.tasks.first().cloned().expect("seeded task");

    let update = harness
        .coordinator
        .apply_task_status(task.id(), TaskStatus::InProgress)
        .await
        .expect("status applied");

    assert!(matches!(update.outcome, ApplyOutcome::Applied { .. }));
    assert!(update.push.as_ref().is_some_and(PushOutcome::is_synced));
    let stored = harness.task(&task).await;
    assert!(!stored.sync_pending());
    assert_eq!(harness.card_list(&stored).as_deref(), Some("in_progress"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn forbidden_user_transition_is_a_client_error(harness: Harness) {
    let created = harness.bootstrap().await;
    let task = created.graph.tasks.first().cloned().expect("seeded task");

    let result = harness
        .coordinator
        .apply_task_status(task.id(), TaskStatus::Done)
        .await;

    assert!(matches!(
        result,
        Err(CoordinatorError::TaskGraph(TaskGraphServiceError::Domain(_)))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn board_outage_leaves_change_pending_until_reconciled(harness: Harness) {
    let created = harness.bootstrap().await;
    harness.fire_after(Duration::zero()).await;
    let task = created.graph.tasks.first().cloned().expect("seeded task");

    harness.board.fail_next(4);
    let update = harness
        .coordinator
        .apply_task_status(task.id(), TaskStatus::InProgress)
        .await
        .expect("outage is absorbed");

    assert!(matches!(update.push, Some(PushOutcome::Pending { .. })));
    let pending = harness.task(&task).await;
    assert!(pending.sync_pending());
    assert_eq!(harness.card_list(&pending).as_deref(), Some("backlog"));

    let report = harness
        .coordinator
        .reconcile_project(created.graph.project.id())
        .await
        .expect("reconciliation runs");
    assert_eq!(report.pushed, 1);
    let synced = harness.task(&task).await;
    assert!(!synced.sync_pending());
    assert_eq!(harness.card_list(&synced).as_deref(), Some("in_progress"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dispute_blocks_and_releases_the_card(harness: Harness) {
    let created = harness.bootstrap().await;
    harness.fire_after(Duration::zero()).await;
    let task = created.graph.tasks.first().cloned().expect("seeded task");
    harness
        .coordinator
        .apply_task_status(task.id(), TaskStatus::InProgress)
        .await
        .expect("task starts");

    let dispute = harness
        .coordinator
        .file_dispute(NewDispute {
            project_id: created.graph.project.id(),
            task_id: Some(task.id()),
            counterparty: "Keystone Masonry".to_owned(),
            category: DisputeCategory::Quality,
            description: "Footing poured below spec depth".to_owned(),
        })
        .await
        .expect("dispute filed");
    let blocked = harness.task(&task).await;
    assert_eq!(blocked.status(), TaskStatus::Blocked);
    assert_eq!(harness.card_list(&blocked).as_deref(), Some("blocked"));

    harness
        .coordinator
        .resolve_dispute(dispute.id(), "Footing re-poured")
        .await
        .expect("dispute resolved");
    let released = harness.task(&task).await;
    assert_eq!(released.status(), TaskStatus::InProgress);
    assert_eq!(harness.card_list(&released).as_deref(), Some("in_progress"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn blocked_task_without_dispute_is_a_candidate(harness: Harness) {
    let created = harness.bootstrap().await;
    let project_id = created.graph.project.id();
    let task = created.graph.tasks.first().cloned().expect("seeded task");
    for status in [TaskStatus::InProgress, TaskStatus::Blocked] {
        harness
            .coordinator
            .apply_task_status(task.id(), status)
            .await
            .expect("status applied");
    }

    let candidates = harness
        .coordinator
        .dispute_candidates(project_id)
        .await
        .expect("candidates listed");
    assert_eq!(
        candidates
            .iter()
            .map(|candidate| candidate.task_id)
            .collect::<Vec<_>>(),
        vec![task.id()]
    );

    harness
        .coordinator
        .file_dispute(NewDispute {
            project_id,
            task_id: Some(task.id()),
            counterparty: "Ridge Line Roofing".to_owned(),
            category: DisputeCategory::Timeline,
            description: "Crew has not returned since the storm".to_owned(),
        })
        .await
        .expect("dispute filed");
    let covered = harness
        .coordinator
        .dispute_candidates(project_id)
        .await
        .expect("candidates listed");
    assert!(covered.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn threshold_crossing_reaches_the_notifier(harness: Harness) {
    let created = harness.bootstrap().await;
    let project_id = created.graph.project.id();
    harness
        .coordinator
        .budget()
        .set_approved(project_id, Money::from_major(100_000).expect("amount"))
        .await
        .expect("budget approved");

    let state = harness
        .coordinator
        .record_spend(
            project_id,
            Money::from_major(80_000).expect("amount"),
            SpendCategory::Committed,
        )
        .await
        .expect("spend recorded");

    assert_eq!(state.fired.len(), 1);
    let sent = harness.notifier.sent();
    assert!(
        sent.iter()
            .any(|notification| notification.subject == "Budget 75% threshold reached")
    );
    assert!(
        harness
            .sink
            .event_types()
            .contains(&"budget_threshold_crossed")
    );
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Manual,
    Deadline,
}

fn visited_stages(history: &[HistoryEntry]) -> Vec<DisputeStage> {
    history
        .iter()
        .filter_map(|entry| match &entry.action {
            HistoryAction::Filed { .. } => Some(DisputeStage::Identified),
            HistoryAction::Escalated { to, .. } | HistoryAction::AutoEscalated { to, .. } => {
                Some(*to)
            }
            HistoryAction::Resolved { .. } => Some(DisputeStage::Resolved),
            HistoryAction::Response { .. } | HistoryAction::Stalled { .. } => None,
        })
        .collect()
}

#[rstest]
#[case::untouched(&[])]
#[case::manual_once(&[Step::Manual])]
#[case::deadlines_only(&[Step::Deadline, Step::Deadline, Step::Deadline, Step::Deadline])]
#[case::mixed(&[Step::Deadline, Step::Manual, Step::Deadline, Step::Manual, Step::Deadline])]
#[case::manual_past_the_end(&[Step::Manual, Step::Manual, Step::Manual, Step::Manual])]
#[tokio::test(flavor = "multi_thread")]
async fn stage_sequence_is_a_prefix_of_the_ladder(harness: Harness, #[case] steps: &[Step]) {
    let created = harness.bootstrap().await;
    let dispute = harness
        .coordinator
        .file_dispute(NewDispute {
            project_id: created.graph.project.id(),
            task_id: None,
            counterparty: "Summit Roofing".to_owned(),
            category: DisputeCategory::Timeline,
            description: "Roof install slipped three weeks".to_owned(),
        })
        .await
        .expect("dispute filed");

    for step in steps {
        match step {
            Step::Manual => {
                // Escalating from the last stage is refused; the ladder is unchanged.
                let _refused_at_end = harness.coordinator.escalate_dispute(dispute.id()).await;
            }
            Step::Deadline => harness.fire_after(Duration::hours(400)).await,
        }
    }
    let resolved = harness
        .coordinator
        .resolve_dispute(dispute.id(), "Schedule credit agreed")
        .await
        .expect("dispute resolved");

    let visited = visited_stages(resolved.history());
    let ladder = [
        DisputeStage::Identified,
        DisputeStage::DirectResolution,
        DisputeStage::AiMediation,
        DisputeStage::ExternalMediation,
    ];
    let (last, open) = visited.split_last().expect("at least one stage");
    assert_eq!(*last, DisputeStage::Resolved);
    assert!(open.len() <= ladder.len());
    assert!(ladder.starts_with(open), "{open:?} is not a ladder prefix");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn run_loop_stops_on_shutdown(harness: Harness) {
    let created = harness.bootstrap().await;
    let runner = {
        let coordinator = Arc::clone(&harness.coordinator);
        tokio::spawn(async move { coordinator.run().await })
    };

    tokio::time::timeout(StdDuration::from_secs(2), async {
        while harness.board.card_count() < created.graph.tasks.len() {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
    })
    .await
    .expect("first pass mirrors the project");

    harness.coordinator.shutdown();
    tokio::time::timeout(StdDuration::from_secs(1), runner)
        .await
        .expect("loop stops promptly")
        .expect("loop task joins");
}
