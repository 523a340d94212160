//! Given steps for project coordination BDD scenarios.

use std::time::Duration;

use super::world::{CoordinationWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use vibehouse::{
    board_sync::domain::PushOutcome,
    budget::domain::Money,
    coordinator::BootstrapRequest,
    dispute::domain::{DisputeCategory, NewDispute},
    plan::domain::CostTier,
    task_graph::domain::{Task, UserId},
};

fn bootstrap(
    world: &mut CoordinationWorld,
    description: &str,
    tier: CostTier,
) -> Result<(), eyre::Report> {
    let created = run_async(world.coordinator.bootstrap_project(BootstrapRequest {
        owner: UserId::new(),
        title: "Hillside residence".to_owned(),
        description: description.to_owned(),
        tier,
    }))
    .wrap_err("bootstrap project for scenario")?;
    world.task_id = created.graph.tasks.first().map(Task::id);
    world.project = Some(created);
    Ok(())
}

#[given("a bootstrapped project with no cards on the board")]
fn project_without_cards(world: &mut CoordinationWorld) -> Result<(), eyre::Report> {
    bootstrap(world, "craftsman bungalow", CostTier::Balanced)
}

#[given(r#"a bootstrapped project from "{description}" at the "{tier}" tier"#)]
fn project_from_description(
    world: &mut CoordinationWorld,
    description: String,
    tier: String,
) -> Result<(), eyre::Report> {
    let chosen = CostTier::ALL
        .into_iter()
        .find(|candidate| candidate.as_str() == tier)
        .ok_or_else(|| eyre::eyre!("unknown cost tier in scenario: {tier}"))?;
    bootstrap(world, &description, chosen)
}

#[given("a bootstrapped project with its first task on the board")]
fn project_with_card(world: &mut CoordinationWorld) -> Result<(), eyre::Report> {
    bootstrap(world, "craftsman bungalow", CostTier::Balanced)?;
    let task_id = world
        .task_id
        .ok_or_else(|| eyre::eyre!("missing seeded task in scenario world"))?;
    let outcome = run_async(world.coordinator.board().push_task(task_id))
        .wrap_err("push first task to the board")?;
    let PushOutcome::Synced(mapping) = outcome else {
        return Err(eyre::eyre!("expected first push to reach the board, got {outcome:?}"));
    };
    world.card_id = Some(mapping.card_id().clone());
    Ok(())
}

#[given(r#"a bootstrapped project with an approved budget of "{amount}""#)]
fn project_with_budget(world: &mut CoordinationWorld, amount: String) -> Result<(), eyre::Report> {
    bootstrap(world, "ranch house", CostTier::Efficient)?;
    let approved: Money = amount
        .parse()
        .map_err(|err| eyre::eyre!("invalid amount in scenario: {err}"))?;
    let project_id = world.project()?.graph.project.id();
    run_async(world.coordinator.budget().set_approved(project_id, approved))
        .wrap_err("set approved budget")?;
    Ok(())
}

#[given("a bootstrapped project with a filed dispute")]
fn project_with_dispute(world: &mut CoordinationWorld) -> Result<(), eyre::Report> {
    bootstrap(world, "farmhouse", CostTier::Balanced)?;
    let project_id = world.project()?.graph.project.id();
    let dispute = run_async(world.coordinator.file_dispute(NewDispute {
        project_id,
        task_id: None,
        counterparty: "Ridge Framing Co".to_owned(),
        category: DisputeCategory::Quality,
        description: "Wall studs out of plumb".to_owned(),
    }))
    .wrap_err("file dispute for scenario")?;
    world.dispute_id = Some(dispute.id());
    Ok(())
}

#[given("the board takes {millis:u64} milliseconds to create a card")]
fn slow_card_creation(world: &mut CoordinationWorld, millis: u64) {
    world.board.set_create_delay(Duration::from_millis(millis));
}
