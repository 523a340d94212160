//! Unit tests for the firing loop's delivery guarantees.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use serde_json::json;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::clock::ManualClock;
use crate::config::SchedulerConfig;
use crate::scheduler::{
    adapters::memory::InMemoryTimerRepository,
    domain::{FiringReport, ScheduledTimer, TimerDisposition, TimerKey, TimerKind},
    ports::{
        TimerHandler, TimerHandlerError, TimerRepository, TimerRepositoryError,
        TimerRepositoryResult,
    },
    services::{TimerQueue, TimerScheduler},
};

type Scheduler = TimerScheduler<InMemoryTimerRepository, ManualClock>;

struct Harness {
    clock: Arc<ManualClock>,
    repository: Arc<InMemoryTimerRepository>,
    queue: TimerQueue<InMemoryTimerRepository, ManualClock>,
}

impl Harness {
    fn scheduler(&self, config: SchedulerConfig) -> Scheduler {
        TimerScheduler::new(Arc::clone(&self.repository), Arc::clone(&self.clock), config)
    }

    async fn schedule_now(&self, kind: TimerKind) -> TimerKey {
        self.queue
            .schedule(kind, Uuid::new_v4(), self.clock.utc(), json!({}))
            .await
            .expect("timer scheduled")
            .key
    }

    async fn pending(&self, key: &TimerKey) -> Option<ScheduledTimer> {
        self.queue.pending(key).await.expect("store readable")
    }
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 7, 20, 6, 0, 0)
            .single()
            .expect("valid start instant"),
    ));
    let repository = Arc::new(InMemoryTimerRepository::new());
    let queue = TimerQueue::new(Arc::clone(&repository), Arc::clone(&clock));
    Harness {
        clock,
        repository,
        queue,
    }
}

/// Counts invocations and answers with a fixed result.
struct CountingHandler {
    calls: AtomicUsize,
    result: Result<TimerDisposition, TimerHandlerError>,
}

impl CountingHandler {
    fn new(result: Result<TimerDisposition, TimerHandlerError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            result,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimerHandler for CountingHandler {
    async fn fire(&self, _timer: &ScheduledTimer) -> Result<TimerDisposition, TimerHandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Holds a firing open until released.
struct GatedHandler {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl TimerHandler for GatedHandler {
    async fn fire(&self, _timer: &ScheduledTimer) -> Result<TimerDisposition, TimerHandlerError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(TimerDisposition::Done)
    }
}

/// Runs an action against the queue from inside a firing.
struct QueueHandler {
    queue: TimerQueue<InMemoryTimerRepository, ManualClock>,
    action: QueueAction,
}

enum QueueAction {
    Cancel(TimerKey),
    RescheduleSelf(chrono::DateTime<Utc>),
}

#[async_trait]
impl TimerHandler for QueueHandler {
    async fn fire(&self, timer: &ScheduledTimer) -> Result<TimerDisposition, TimerHandlerError> {
        let result = match &self.action {
            QueueAction::Cancel(key) => self.queue.cancel(key).await.map(|_| ()),
            QueueAction::RescheduleSelf(due_at) => self
                .queue
                .schedule(timer.kind(), timer.owner(), *due_at, json!({"rearmed": true}))
                .await
                .map(|_| ()),
        };
        result.map_err(|error| TimerHandlerError::Failed(error.to_string()))?;
        Ok(TimerDisposition::Done)
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn done_timer_is_removed(harness: Harness) {
    let handler = CountingHandler::new(Ok(TimerDisposition::Done));
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_handler(TimerKind::BudgetReview, handler.clone());
    let key = harness.schedule_now(TimerKind::BudgetReview).await;

    let report = scheduler
        .fire_due(&CancellationToken::new())
        .await
        .expect("pass runs");

    assert_eq!(
        report,
        FiringReport {
            fired: 1,
            ..FiringReport::default()
        }
    );
    assert_eq!(handler.calls(), 1);
    assert!(harness.pending(&key).await.is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn future_timers_wait(harness: Harness) {
    let handler = CountingHandler::new(Ok(TimerDisposition::Done));
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_handler(TimerKind::BudgetReview, handler.clone());
    let due = harness.clock.utc() + Duration::minutes(10);
    harness
        .queue
        .schedule(TimerKind::BudgetReview, Uuid::new_v4(), due, json!({}))
        .await
        .expect("timer scheduled");
    let shutdown = CancellationToken::new();

    let early = scheduler.fire_due(&shutdown).await.expect("pass runs");
    harness.clock.advance(Duration::minutes(10));
    let on_time = scheduler.fire_due(&shutdown).await.expect("pass runs");

    assert_eq!(early.fired, 0);
    assert_eq!(on_time.fired, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rescheduled_timer_moves_to_new_instant(harness: Harness) {
    let next = harness.clock.utc() + Duration::hours(24);
    let handler = CountingHandler::new(Ok(TimerDisposition::RescheduleAt(next)));
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_handler(TimerKind::BoardResync, handler);
    let key = harness.schedule_now(TimerKind::BoardResync).await;
    let shutdown = CancellationToken::new();

    let report = scheduler.fire_due(&shutdown).await.expect("pass runs");
    let again = scheduler.fire_due(&shutdown).await.expect("pass runs");

    assert_eq!(report.rescheduled, 1);
    assert_eq!(again.fired, 0);
    let pending = harness.pending(&key).await.expect("timer kept");
    assert_eq!(pending.due_at(), next);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_handler_keeps_timer_for_redelivery(harness: Harness) {
    let handler = CountingHandler::new(Err(TimerHandlerError::Failed("store offline".to_owned())));
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_handler(TimerKind::DisputeEscalation, handler.clone());
    let key = harness.schedule_now(TimerKind::DisputeEscalation).await;
    let shutdown = CancellationToken::new();

    let first = scheduler.fire_due(&shutdown).await.expect("pass runs");
    let second = scheduler.fire_due(&shutdown).await.expect("pass runs");

    assert_eq!(first.failed, 1);
    assert_eq!(second.failed, 1);
    assert_eq!(handler.calls(), 2);
    assert!(harness.pending(&key).await.is_some());
}

/// Delegates to the in-memory store but cannot read back one key.
struct UnreadableKeyRepository {
    inner: Arc<InMemoryTimerRepository>,
    unreadable: TimerKey,
}

#[async_trait]
impl TimerRepository for UnreadableKeyRepository {
    async fn upsert(&self, timer: &ScheduledTimer) -> TimerRepositoryResult<()> {
        self.inner.upsert(timer).await
    }

    async fn remove(&self, key: &TimerKey) -> TimerRepositoryResult<bool> {
        self.inner.remove(key).await
    }

    async fn remove_if_matches(
        &self,
        key: &TimerKey,
        idempotency_key: &str,
    ) -> TimerRepositoryResult<bool> {
        self.inner.remove_if_matches(key, idempotency_key).await
    }

    async fn find(&self, key: &TimerKey) -> TimerRepositoryResult<Option<ScheduledTimer>> {
        if *key == self.unreadable {
            return Err(TimerRepositoryError::persistence(std::io::Error::other(
                "row unreadable",
            )));
        }
        self.inner.find(key).await
    }

    async fn due(
        &self,
        now: chrono::DateTime<Utc>,
        limit: usize,
    ) -> TimerRepositoryResult<Vec<ScheduledTimer>> {
        self.inner.due(now, limit).await
    }

    async fn list_all(&self) -> TimerRepositoryResult<Vec<ScheduledTimer>> {
        self.inner.list_all().await
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn store_failure_on_one_timer_does_not_stop_the_batch(harness: Harness) {
    let handler = CountingHandler::new(Ok(TimerDisposition::Done));
    let broken = harness.schedule_now(TimerKind::BudgetReview).await;
    let healthy = harness.schedule_now(TimerKind::BudgetReview).await;
    let repository = Arc::new(UnreadableKeyRepository {
        inner: Arc::clone(&harness.repository),
        unreadable: broken.clone(),
    });
    let scheduler = TimerScheduler::new(
        repository,
        Arc::clone(&harness.clock),
        SchedulerConfig::default(),
    )
    .with_handler(TimerKind::BudgetReview, handler.clone());

    let report = scheduler
        .fire_due(&CancellationToken::new())
        .await
        .expect("pass runs");

    assert_eq!(report.fired, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(handler.calls(), 1);
    assert!(harness.pending(&healthy).await.is_none());
    assert!(harness.pending(&broken).await.is_some());
    assert_eq!(scheduler.in_flight_count(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn timer_without_handler_is_kept(harness: Harness) {
    let scheduler = harness.scheduler(SchedulerConfig::default());
    let key = harness.schedule_now(TimerKind::BudgetReview).await;

    let report = scheduler
        .fire_due(&CancellationToken::new())
        .await
        .expect("pass runs");

    assert_eq!(report.failed, 1);
    assert!(harness.pending(&key).await.is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn overlapping_firing_of_same_key_is_skipped(harness: Harness) {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let scheduler = Arc::new(harness.scheduler(SchedulerConfig::default()).with_handler(
        TimerKind::DisputeEscalation,
        Arc::new(GatedHandler {
            started: Arc::clone(&started),
            release: Arc::clone(&release),
        }),
    ));
    let key = harness.schedule_now(TimerKind::DisputeEscalation).await;

    let first = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        async move { scheduler.fire_due(&CancellationToken::new()).await }
    });
    started.notified().await;
    let overlapping = scheduler
        .fire_due(&CancellationToken::new())
        .await
        .expect("pass runs");
    assert_eq!(scheduler.in_flight_count(), 1);
    release.notify_one();
    let completed = first.await.expect("task joins").expect("pass runs");

    assert_eq!(overlapping.skipped_in_flight, 1);
    assert_eq!(overlapping.fired, 0);
    assert_eq!(completed.fired, 1);
    assert_eq!(scheduler.in_flight_count(), 0);
    assert!(harness.pending(&key).await.is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn timer_cancelled_mid_pass_is_superseded(harness: Harness) {
    let victim = harness
        .queue
        .schedule(
            TimerKind::BudgetReview,
            Uuid::new_v4(),
            harness.clock.utc() - Duration::minutes(1),
            json!({}),
        )
        .await
        .expect("timer scheduled")
        .key;
    harness
        .queue
        .schedule(
            TimerKind::DisputeEscalation,
            Uuid::new_v4(),
            harness.clock.utc() - Duration::minutes(2),
            json!({}),
        )
        .await
        .expect("timer scheduled");
    let reviews = CountingHandler::new(Ok(TimerDisposition::Done));
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_handler(
            TimerKind::DisputeEscalation,
            Arc::new(QueueHandler {
                queue: harness.queue.clone(),
                action: QueueAction::Cancel(victim),
            }),
        )
        .with_handler(TimerKind::BudgetReview, reviews.clone());

    let report = scheduler
        .fire_due(&CancellationToken::new())
        .await
        .expect("pass runs");

    assert_eq!(report.fired, 1);
    assert_eq!(report.superseded, 1);
    assert_eq!(reviews.calls(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rescheduling_during_firing_survives_completion(harness: Harness) {
    let rearm_at = harness.clock.utc() + Duration::hours(4);
    let scheduler = harness.scheduler(SchedulerConfig::default()).with_handler(
        TimerKind::DisputeEscalation,
        Arc::new(QueueHandler {
            queue: harness.queue.clone(),
            action: QueueAction::RescheduleSelf(rearm_at),
        }),
    );
    let key = harness.schedule_now(TimerKind::DisputeEscalation).await;

    let report = scheduler
        .fire_due(&CancellationToken::new())
        .await
        .expect("pass runs");

    assert_eq!(report.fired, 1);
    let rearmed = harness.pending(&key).await.expect("new scheduling kept");
    assert_eq!(rearmed.due_at(), rearm_at);
    assert_eq!(rearmed.payload(), &json!({"rearmed": true}));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pass_is_limited_to_batch_size(harness: Harness) {
    let handler = CountingHandler::new(Ok(TimerDisposition::Done));
    let scheduler = harness
        .scheduler(SchedulerConfig {
            batch_size: 2,
            ..SchedulerConfig::default()
        })
        .with_handler(TimerKind::BudgetReview, handler.clone());
    for _ in 0..3 {
        harness.schedule_now(TimerKind::BudgetReview).await;
    }
    let shutdown = CancellationToken::new();

    let first = scheduler.fire_due(&shutdown).await.expect("pass runs");
    let second = scheduler.fire_due(&shutdown).await.expect("pass runs");

    assert_eq!(first.fired, 2);
    assert_eq!(second.fired, 1);
    assert!(harness.repository.list_all().await.expect("store readable").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_pass_fires_nothing(harness: Harness) {
    let handler = CountingHandler::new(Ok(TimerDisposition::Done));
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_handler(TimerKind::BudgetReview, handler.clone());
    let key = harness.schedule_now(TimerKind::BudgetReview).await;
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let report = scheduler.fire_due(&shutdown).await.expect("pass runs");

    assert_eq!(report, FiringReport::default());
    assert!(harness.pending(&key).await.is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn run_loop_fires_and_stops_on_shutdown(harness: Harness) {
    let handler = CountingHandler::new(Ok(TimerDisposition::Done));
    let scheduler = Arc::new(
        harness
            .scheduler(SchedulerConfig {
                poll_interval_ms: 5,
                ..SchedulerConfig::default()
            })
            .with_handler(TimerKind::BudgetReview, handler.clone()),
    );
    let key = harness.schedule_now(TimerKind::BudgetReview).await;
    let shutdown = CancellationToken::new();

    let running = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        let token = shutdown.clone();
        async move { scheduler.run(token).await }
    });
    for _ in 0..100 {
        if handler.calls() > 0 {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(5)).await;
    }
    shutdown.cancel();
    tokio::time::timeout(StdDuration::from_secs(1), running)
        .await
        .expect("loop stops promptly")
        .expect("task joins");

    assert_eq!(handler.calls(), 1);
    assert!(harness.pending(&key).await.is_none());
}
