//! Unit tests for board layout, backoff, mappings, and fingerprints.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use mockable::Clock;
use rstest::rstest;

use super::fixtures::list_id;
use crate::board_sync::domain::{
    BackoffPolicy, BoardLayout, BoardSyncDomainError, CardMapping, ListId, WebhookEvent,
    board_state_hash,
};
use crate::clock::ManualClock;
use crate::task_graph::domain::{CardId, ProjectId, Revision, TaskId, TaskStatus};

fn clock() -> ManualClock {
    ManualClock::new(
        Utc.with_ymd_and_hms(2026, 4, 6, 7, 30, 0)
            .single()
            .expect("valid start instant"),
    )
}

fn mapping(card: &str, clock: &ManualClock) -> CardMapping {
    CardMapping::new(
        TaskId::new(),
        ProjectId::new(),
        CardId::new(card).expect("valid card id"),
        clock,
    )
}

#[rstest]
#[case("backlog", TaskStatus::NotStarted)]
#[case("this_week", TaskStatus::NotStarted)]
#[case("in_progress", TaskStatus::InProgress)]
#[case("in_review", TaskStatus::InProgress)]
#[case("change_orders", TaskStatus::InProgress)]
#[case("blocked", TaskStatus::Blocked)]
#[case("dispute_hold", TaskStatus::Blocked)]
#[case("done", TaskStatus::Done)]
fn default_layout_maps_lists_to_statuses(#[case] list: &str, #[case] expected: TaskStatus) {
    assert_eq!(BoardLayout::default().status_for(&list_id(list)), Some(expected));
}

#[rstest]
fn unknown_list_has_no_status() {
    assert_eq!(BoardLayout::default().status_for(&list_id("icebox")), None);
}

#[rstest]
fn every_status_round_trips_through_its_target_list() {
    let layout = BoardLayout::default();
    for status in TaskStatus::ALL {
        assert_eq!(layout.status_for(layout.list_for(status)), Some(status));
    }
}

#[rstest]
fn shared_target_list_fails_validation() {
    let layout = BoardLayout {
        blocked: list_id("in_progress"),
        ..BoardLayout::default()
    };

    assert_eq!(
        layout.validate(),
        Err(BoardSyncDomainError::DuplicateTargetList(list_id("in_progress")))
    );
}

#[rstest]
fn alias_contradicting_target_fails_validation() {
    let layout = BoardLayout {
        aliases: BTreeMap::from([(list_id("done"), TaskStatus::Blocked)]),
        ..BoardLayout::default()
    };

    assert_eq!(
        layout.validate(),
        Err(BoardSyncDomainError::ConflictingAlias(list_id("done")))
    );
}

#[rstest]
fn blank_list_id_is_rejected() {
    assert_eq!(ListId::new("  "), Err(BoardSyncDomainError::EmptyListId));
}

#[rstest]
#[case(1, 250)]
#[case(2, 500)]
#[case(3, 1_000)]
#[case(6, 8_000)]
#[case(12, 8_000)]
#[case(40, 8_000)]
fn backoff_doubles_up_to_cap(#[case] attempt: u32, #[case] expected_ms: u64) {
    assert_eq!(
        BackoffPolicy::default().delay_after(attempt),
        Duration::from_millis(expected_ms)
    );
}

#[rstest]
fn backoff_stops_at_max_attempts() {
    let policy = BackoffPolicy::default();

    assert!(policy.allows_retry(3));
    assert!(!policy.allows_retry(4));
}

#[rstest]
fn mapping_revision_never_decreases() {
    let clock = clock();
    let mut card = mapping("card-1", &clock);

    card.observe(Revision::new(5), clock.utc());
    card.observe(Revision::new(3), clock.utc());

    assert_eq!(card.external_revision(), Revision::new(5));
}

#[rstest]
fn mapping_becomes_stale_after_threshold() {
    let clock = clock();
    let card = mapping("card-1", &clock);
    let staleness = ChronoDuration::minutes(30);

    assert!(!card.is_stale(clock.utc() + ChronoDuration::minutes(29), staleness));
    assert!(card.is_stale(clock.utc() + ChronoDuration::minutes(30), staleness));
}

#[rstest]
fn board_hash_ignores_order_and_tracks_revisions() {
    let clock = clock();
    let first = mapping("card-1", &clock);
    let mut second = mapping("card-2", &clock);

    let forward = board_state_hash(&[first.clone(), second.clone()]);
    let reversed = board_state_hash(&[second.clone(), first.clone()]);
    second.observe(Revision::new(2), clock.utc());
    let moved = board_state_hash(&[first, second]);

    assert_eq!(forward, reversed);
    assert_ne!(forward, moved);
    assert_eq!(forward.len(), 64);
}

#[rstest]
fn webhook_payload_uses_camel_case_fields() {
    let event: WebhookEvent = serde_json::from_str(
        r#"{"cardId":"card-9","listId":"in_review","revision":7,"timestamp":"2026-04-06T08:00:00Z"}"#,
    )
    .expect("payload decodes");

    assert_eq!(event.card_id.as_str(), "card-9");
    assert_eq!(event.list_id, list_id("in_review"));
    assert_eq!(event.revision, 7);
}

#[rstest]
fn webhook_with_blank_list_is_rejected() {
    let result = serde_json::from_str::<WebhookEvent>(
        r#"{"cardId":"card-9","listId":" ","revision":7,"timestamp":"2026-04-06T08:00:00Z"}"#,
    );

    assert!(result.is_err());
}
