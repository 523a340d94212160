//! Tests for the rate card plan generator.

use rstest::rstest;

use crate::budget::domain::Money;
use crate::plan::{
    adapters::RateCardPlanGenerator,
    domain::CostTier,
    ports::{PlanGenerator, PlanGeneratorError},
};

#[rstest]
#[case("A modern three bedroom home", 195)]
#[case("Cozy FARMHOUSE with a porch", 175)]
#[case("single level ranch", 160)]
#[case("something nice near the lake", 185)]
fn rate_follows_style_keyword(#[case] description: &str, #[case] expected: i64) {
    assert_eq!(RateCardPlanGenerator::rate_for(description), expected);
}

#[rstest]
#[tokio::test]
async fn proposal_has_three_tiered_options() {
    let proposal = RateCardPlanGenerator::new()
        .generate_plan("modern home")
        .await
        .expect("plan generated");

    assert_eq!(proposal.floor_plan.total_sqft(), 1_900);
    let tiers: Vec<CostTier> = proposal.cost_options.iter().map(|option| option.tier).collect();
    assert_eq!(tiers, CostTier::ALL.to_vec());

    let efficient = proposal.option(CostTier::Efficient).expect("efficient option");
    assert_eq!(efficient.title, "Efficient Living");
    assert_eq!(efficient.total_sqft, 1_615);
    // 1615 sqft at 195 * 0.90 = 175.50 per sqft.
    assert_eq!(efficient.total, Money::from_minor(28_343_250));

    let balanced = proposal.option(CostTier::Balanced).expect("balanced option");
    assert_eq!(balanced.total_sqft, 1_900);
    assert_eq!(balanced.total, "370500.00".parse::<Money>().expect("money"));

    let premium = proposal.option(CostTier::Premium).expect("premium option");
    assert_eq!(premium.title, "Premium Design");
    assert_eq!(premium.total_sqft, 2_280);
    assert!(premium.total > balanced.total);
    assert!(balanced.total > efficient.total);
}

#[rstest]
#[case("two-story colonial", 2)]
#[case("colonial bungalow", 1)]
#[tokio::test]
async fn bedrooms_move_upstairs_in_two_storey_plans(
    #[case] description: &str,
    #[case] bedroom_floor: u8,
) {
    let proposal = RateCardPlanGenerator::new()
        .generate_plan(description)
        .await
        .expect("plan generated");

    let primary = proposal
        .floor_plan
        .rooms
        .iter()
        .find(|room| room.name == "Primary bedroom")
        .expect("primary bedroom present");
    assert_eq!(primary.floor, bedroom_floor);
    let kitchen = proposal
        .floor_plan
        .rooms
        .iter()
        .find(|room| room.name == "Kitchen")
        .expect("kitchen present");
    assert_eq!(kitchen.floor, 1);
}

#[rstest]
#[case("")]
#[case("   ")]
#[tokio::test]
async fn blank_description_is_rejected(#[case] description: &str) {
    let result = RateCardPlanGenerator::new().generate_plan(description).await;

    assert_eq!(result, Err(PlanGeneratorError::EmptyDescription));
}
