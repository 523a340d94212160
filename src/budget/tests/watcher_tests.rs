//! Unit tests for threshold alerting and periodic budget review.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use serde_json::json;

use crate::budget::{
    adapters::memory::InMemoryBudgetRepository,
    domain::{Money, ProjectBudget, SpendCategory, Threshold},
    ports::BudgetRepository,
    services::{BudgetReviewHandler, BudgetWatcher},
};
use crate::clock::ManualClock;
use crate::events::{adapters::memory::RecordingSink, services::EventBus};
use crate::scheduler::{
    domain::{ScheduledTimer, TimerDisposition, TimerKind},
    ports::TimerHandler,
};
use crate::task_graph::{
    adapters::memory::InMemoryTaskGraphRepository,
    domain::{ProjectId, ProjectStage, UserId},
    services::{CreateProjectRequest, TaskGraphService},
};

type Watcher = BudgetWatcher<InMemoryBudgetRepository, ManualClock>;

struct Harness {
    clock: Arc<ManualClock>,
    sink: RecordingSink,
    repository: Arc<InMemoryBudgetRepository>,
    watcher: Arc<Watcher>,
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0)
            .single()
            .expect("valid start instant"),
    ));
    let sink = RecordingSink::new();
    let repository = Arc::new(InMemoryBudgetRepository::new());
    let thresholds = [75, 90, 100].map(|percent| Threshold::new(percent).expect("valid threshold"));
    let watcher = Arc::new(BudgetWatcher::new(
        Arc::clone(&repository),
        Arc::clone(&clock),
        EventBus::new().with_sink(Arc::new(sink.clone())),
        thresholds,
    ));
    Harness {
        clock,
        sink,
        repository,
        watcher,
    }
}

fn money(raw: &str) -> Money {
    raw.parse().expect("valid amount")
}

fn percents(alerts: &[crate::budget::domain::BudgetAlert]) -> Vec<u16> {
    alerts.iter().map(|alert| alert.threshold.percent()).collect()
}

async fn approved(harness: &Harness, amount: &str) -> ProjectId {
    let project_id = ProjectId::new();
    harness
        .watcher
        .set_approved(project_id, money(amount))
        .await
        .expect("budget approved");
    project_id
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn each_threshold_fires_once_as_spend_grows(harness: Harness) {
    let project_id = approved(&harness, "100000").await;

    let first = harness
        .watcher
        .record_spend(project_id, money("76000"), SpendCategory::Committed)
        .await
        .expect("spend recorded");
    let second = harness
        .watcher
        .record_spend(project_id, money("20000"), SpendCategory::Committed)
        .await
        .expect("spend recorded");
    let third = harness
        .watcher
        .record_spend(project_id, Money::ZERO, SpendCategory::Committed)
        .await
        .expect("spend recorded");

    assert_eq!(percents(&first.fired), vec![75]);
    assert_eq!(percents(&second.fired), vec![90]);
    assert!(third.fired.is_empty());
    assert_eq!(second.budget.exposure(), money("96000"));
    assert_eq!(
        harness.sink.event_types(),
        vec!["budget_threshold_crossed", "budget_threshold_crossed"]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_large_update_fires_every_crossed_threshold(harness: Harness) {
    let project_id = approved(&harness, "50000").await;

    let state = harness
        .watcher
        .record_spend(project_id, money("51000"), SpendCategory::Committed)
        .await
        .expect("spend recorded");

    assert_eq!(percents(&state.fired), vec![75, 90, 100]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_updates_fire_each_alert_once(harness: Harness) {
    let project_id = approved(&harness, "100000").await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let watcher = Arc::clone(&harness.watcher);
        handles.push(tokio::spawn(async move {
            watcher
                .record_spend(project_id, money("10000"), SpendCategory::Committed)
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("task joins").expect("spend recorded");
    }

    let alerts = harness.watcher.alerts(project_id).await.expect("alerts readable");
    assert_eq!(percents(&alerts), vec![75, 90, 100]);
    let summary = harness.watcher.summary(project_id).await.expect("summary");
    assert_eq!(summary.committed, money("100000"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn no_approved_budget_fires_nothing(harness: Harness) {
    let project_id = ProjectId::new();

    let state = harness
        .watcher
        .record_spend(project_id, money("5000"), SpendCategory::Committed)
        .await
        .expect("spend recorded");

    assert!(state.fired.is_empty());
    assert_eq!(state.budget.burn_rate_bps(), None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn lowering_the_budget_can_cross_thresholds(harness: Harness) {
    let project_id = approved(&harness, "100000").await;
    harness
        .watcher
        .record_spend(project_id, money("70000"), SpendCategory::Committed)
        .await
        .expect("spend recorded");

    let state = harness
        .watcher
        .set_approved(project_id, money("80000"))
        .await
        .expect("budget lowered");

    assert_eq!(percents(&state.fired), vec![75]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn overspend_reports_invariant_violation_once(harness: Harness) {
    let project_id = approved(&harness, "1000").await;

    harness
        .watcher
        .record_spend(project_id, money("100"), SpendCategory::Spent)
        .await
        .expect("spend recorded");
    harness
        .watcher
        .record_spend(project_id, money("100"), SpendCategory::Spent)
        .await
        .expect("spend recorded");

    let violations = harness
        .sink
        .event_types()
        .into_iter()
        .filter(|kind| *kind == "budget_invariant_violated")
        .count();
    assert_eq!(violations, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn negative_spend_is_rejected_without_side_effects(harness: Harness) {
    let project_id = approved(&harness, "1000").await;

    let result = harness
        .watcher
        .record_spend(project_id, money("-1"), SpendCategory::Committed)
        .await;

    assert!(result.is_err());
    assert!(harness.sink.events().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn review_recovers_missing_alerts(harness: Harness) {
    let project_id = ProjectId::new();
    let mut ledger = ProjectBudget::new(project_id);
    ledger.set_approved(money("1000")).expect("approved");
    ledger
        .record(SpendCategory::Committed, money("950"))
        .expect("committed");
    harness.repository.save(&ledger).await.expect("ledger saved");

    let recovered = harness.watcher.review(project_id).await.expect("review runs");
    let repeated = harness.watcher.review(project_id).await.expect("review runs");

    assert_eq!(percents(&recovered), vec![75, 90]);
    assert!(repeated.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn review_handler_rearms_only_for_active_projects(harness: Harness) {
    let graph_repository = Arc::new(InMemoryTaskGraphRepository::new());
    let graph = TaskGraphService::new(
        Arc::clone(&graph_repository),
        Arc::clone(&harness.clock),
        EventBus::new(),
    );
    let project_id = graph
        .create_project(CreateProjectRequest::new(UserId::new(), "Orchard bungalow"))
        .await
        .expect("project creation")
        .project
        .id();
    let handler = BudgetReviewHandler::new(
        Arc::clone(&harness.watcher),
        graph_repository,
        Arc::clone(&harness.clock),
        Duration::hours(24),
    );
    let timer = ScheduledTimer::new(
        TimerKind::BudgetReview,
        project_id.into_inner(),
        harness.clock.utc(),
        json!({}),
        &*harness.clock,
    );

    let active = handler.fire(&timer).await.expect("handler runs");
    graph
        .advance_stage(project_id, ProjectStage::Complete)
        .await
        .expect("project completes");
    let finished = handler.fire(&timer).await.expect("handler runs");

    assert_eq!(
        active,
        TimerDisposition::RescheduleAt(harness.clock.utc() + Duration::hours(24))
    );
    assert_eq!(finished, TimerDisposition::Done);
}
