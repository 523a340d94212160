//! Then steps for project coordination BDD scenarios.

use rstest_bdd_macros::then;

use super::world::{CoordinationWorld, run_async};
use eyre::WrapErr;
use vibehouse::{
    board_sync::domain::{IgnoreReason, WebhookOutcome},
    budget::domain::Money,
    task_graph::domain::Revision,
};

#[then(r#"the task status is "{status}" at revision {revision:u64}"#)]
fn task_status_is(
    world: &CoordinationWorld,
    status: String,
    revision: u64,
) -> Result<(), eyre::Report> {
    let task_id = world
        .task_id
        .ok_or_else(|| eyre::eyre!("missing seeded task in scenario world"))?;
    let task = run_async(world.coordinator.graph().task(task_id)).wrap_err("load task")?;
    if task.status().as_str() != status || task.revision() != Revision::new(revision) {
        return Err(eyre::eyre!(
            "expected {status} at revision {revision}, found {} at revision {}",
            task.status().as_str(),
            task.revision()
        ));
    }
    Ok(())
}

#[then("the last webhook was ignored as stale")]
fn last_webhook_stale(world: &CoordinationWorld) -> Result<(), eyre::Report> {
    let last = world
        .webhook_outcomes
        .last()
        .ok_or_else(|| eyre::eyre!("no webhook delivered in scenario"))?;
    if *last != WebhookOutcome::Ignored(IgnoreReason::StaleRevision) {
        return Err(eyre::eyre!("expected stale webhook, got {last:?}"));
    }
    Ok(())
}

#[then("budget alerts fired at {first:u16} then {second:u16} percent")]
fn alerts_fired_in_order(
    world: &CoordinationWorld,
    first: u16,
    second: u16,
) -> Result<(), eyre::Report> {
    if world.fired_thresholds != [first, second] {
        return Err(eyre::eyre!(
            "expected alerts at {first} then {second}, found {:?}",
            world.fired_thresholds
        ));
    }
    Ok(())
}

#[then("no budget alert fired at {percent:u16} percent")]
fn no_alert_at(world: &CoordinationWorld, percent: u16) -> Result<(), eyre::Report> {
    let project_id = world.project()?.graph.project.id();
    let alerts =
        run_async(world.coordinator.budget().alerts(project_id)).wrap_err("load budget alerts")?;
    if alerts
        .iter()
        .any(|alert| alert.threshold.percent() == percent)
    {
        return Err(eyre::eyre!("unexpected alert at {percent}%: {alerts:?}"));
    }
    Ok(())
}

#[then(r#"the dispute stage is "{stage}""#)]
fn dispute_stage_is(world: &CoordinationWorld, stage: String) -> Result<(), eyre::Report> {
    let dispute_id = world
        .dispute_id
        .ok_or_else(|| eyre::eyre!("missing dispute in scenario world"))?;
    let dispute =
        run_async(world.coordinator.disputes().dispute(dispute_id)).wrap_err("load dispute")?;
    if dispute.stage().as_str() != stage {
        return Err(eyre::eyre!(
            "expected stage {stage}, found {}",
            dispute.stage().as_str()
        ));
    }
    Ok(())
}

#[then(r#"the dispute outcome is "{outcome}""#)]
fn dispute_outcome_is(world: &CoordinationWorld, outcome: String) -> Result<(), eyre::Report> {
    let dispute_id = world
        .dispute_id
        .ok_or_else(|| eyre::eyre!("missing dispute in scenario world"))?;
    let dispute =
        run_async(world.coordinator.disputes().dispute(dispute_id)).wrap_err("load dispute")?;
    if dispute.outcome() != Some(outcome.as_str()) {
        return Err(eyre::eyre!(
            "expected outcome {outcome}, found {:?}",
            dispute.outcome()
        ));
    }
    Ok(())
}

#[then("exactly one card exists on the board")]
fn one_card(world: &CoordinationWorld) -> Result<(), eyre::Report> {
    let cards = world.board.card_count();
    if cards != 1 {
        return Err(eyre::eyre!("expected one card, found {cards}"));
    }
    Ok(())
}

#[then(r#"the approved budget is "{amount}""#)]
fn approved_budget_is(world: &CoordinationWorld, amount: String) -> Result<(), eyre::Report> {
    let expected: Money = amount
        .parse()
        .map_err(|err| eyre::eyre!("invalid amount in scenario: {err}"))?;
    let project_id = world.project()?.graph.project.id();
    let summary =
        run_async(world.coordinator.budget_summary(project_id)).wrap_err("load budget")?;
    if summary.approved != Some(expected) {
        return Err(eyre::eyre!(
            "expected approved {expected}, found {:?}",
            summary.approved
        ));
    }
    Ok(())
}

#[then("every seeded task has a card on the board")]
fn every_task_on_board(world: &CoordinationWorld) -> Result<(), eyre::Report> {
    let project = world.project()?;
    let expected = project.graph.tasks.len();
    let cards = world.board.card_count();
    if cards != expected {
        return Err(eyre::eyre!("expected {expected} cards, found {cards}"));
    }
    let pending = run_async(
        world
            .coordinator
            .graph()
            .tasks_needing_push(project.graph.project.id()),
    )
    .wrap_err("list tasks needing push")?;
    if !pending.is_empty() {
        return Err(eyre::eyre!("{} tasks still sync-pending", pending.len()));
    }
    Ok(())
}
