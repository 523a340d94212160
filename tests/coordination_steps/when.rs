//! When steps for project coordination BDD scenarios.

use chrono::Duration;
use mockable::Clock;
use rstest_bdd_macros::when;
use serde_json::json;

use super::world::{CoordinationWorld, run_async};
use eyre::WrapErr;
use vibehouse::budget::domain::{Money, SpendCategory};

#[when(r#"the board reports the card on "{list}" at revision {revision:u64}"#)]
fn board_reports_card(
    world: &mut CoordinationWorld,
    list: String,
    revision: u64,
) -> Result<(), eyre::Report> {
    let card_id = world
        .card_id
        .clone()
        .ok_or_else(|| eyre::eyre!("missing card in scenario world"))?;
    let body = json!({
        "cardId": card_id.as_str(),
        "listId": list,
        "revision": revision,
        "timestamp": world.clock.utc(),
    })
    .to_string();
    let outcome = run_async(world.coordinator.handle_board_webhook(&body))
        .wrap_err("deliver board webhook")?;
    world.webhook_outcomes.push(outcome);
    Ok(())
}

#[when(r#"committed spend of "{amount}" is recorded"#)]
fn committed_spend(world: &mut CoordinationWorld, amount: String) -> Result<(), eyre::Report> {
    let spend: Money = amount
        .parse()
        .map_err(|err| eyre::eyre!("invalid amount in scenario: {err}"))?;
    let project_id = world.project()?.graph.project.id();
    let state = run_async(world.coordinator.record_spend(
        project_id,
        spend,
        SpendCategory::Committed,
    ))
    .wrap_err("record committed spend")?;
    world
        .fired_thresholds
        .extend(state.fired.iter().map(|alert| alert.threshold.percent()));
    Ok(())
}

#[when("{hours:i64} hours pass and due timers fire")]
fn hours_pass(world: &mut CoordinationWorld, hours: i64) -> Result<(), eyre::Report> {
    world.clock.advance(Duration::hours(hours));
    run_async(world.coordinator.fire_due_timers()).wrap_err("fire due timers")?;
    Ok(())
}

#[when(r#"the dispute is resolved with "{outcome}""#)]
fn resolve_dispute(world: &mut CoordinationWorld, outcome: String) -> Result<(), eyre::Report> {
    let dispute_id = world
        .dispute_id
        .ok_or_else(|| eyre::eyre!("missing dispute in scenario world"))?;
    run_async(world.coordinator.resolve_dispute(dispute_id, &outcome))
        .wrap_err("resolve dispute")?;
    Ok(())
}

#[when("the first task is pushed twice concurrently")]
fn concurrent_pushes(world: &mut CoordinationWorld) -> Result<(), eyre::Report> {
    let task_id = world
        .task_id
        .ok_or_else(|| eyre::eyre!("missing seeded task in scenario world"))?;
    let board = world.coordinator.board();
    let (first, second) = run_async(async {
        tokio::join!(board.push_task(task_id), board.push_task(task_id))
    });
    first.wrap_err("first concurrent push")?;
    second.wrap_err("second concurrent push")?;
    Ok(())
}
