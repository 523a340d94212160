//! Deterministic plan generator pricing a fixed room program by style.

use async_trait::async_trait;

use crate::budget::domain::Money;
use crate::plan::{
    domain::{CostOption, CostTier, FloorPlan, PlanProposal, Room},
    ports::{PlanGenerator, PlanGeneratorError},
};

/// Balanced room program: name, square feet, and whether it is a sleeping
/// area that moves upstairs in a two-storey house.
const ROOM_PROGRAM: [(&str, u32, bool); 12] = [
    ("Foyer", 70, false),
    ("Living room", 320, false),
    ("Kitchen", 220, false),
    ("Dining room", 180, false),
    ("Office", 130, false),
    ("Laundry", 60, false),
    ("Primary bedroom", 260, true),
    ("Primary bathroom", 110, true),
    ("Bedroom 2", 160, true),
    ("Bedroom 3", 150, true),
    ("Bathroom 2", 70, true),
    ("Circulation", 170, false),
];

/// Base construction rate per square foot, in whole currency units, by
/// architectural style keyword.
const STYLE_RATES: [(&str, i64); 6] = [
    ("modern", 195),
    ("contemporary", 200),
    ("farmhouse", 175),
    ("craftsman", 185),
    ("colonial", 180),
    ("ranch", 160),
];

const DEFAULT_RATE: i64 = 185;

const TWO_STOREY_MARKERS: [&str; 4] = ["two-story", "two story", "two-storey", "2-story"];

/// Plan generator that prices a fixed room program against a style rate
/// card.
///
/// The description is only scanned for a style keyword and a two-storey
/// marker; everything else about the layout is fixed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateCardPlanGenerator;

impl RateCardPlanGenerator {
    /// Creates the generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the per-square-foot rate, in whole units, for a description.
    #[must_use]
    pub fn rate_for(description: &str) -> i64 {
        let lowered = description.to_lowercase();
        STYLE_RATES
            .iter()
            .find(|(style, _)| lowered.contains(style))
            .map_or(DEFAULT_RATE, |&(_, rate)| rate)
    }

    fn floor_plan(description: &str) -> FloorPlan {
        let lowered = description.to_lowercase();
        let two_storey = TWO_STOREY_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker));
        let rooms = ROOM_PROGRAM
            .iter()
            .map(|&(name, sqft, sleeping)| Room {
                name: name.to_owned(),
                sqft,
                floor: if two_storey && sleeping { 2 } else { 1 },
            })
            .collect();
        FloorPlan { rooms }
    }

    fn price(tier: CostTier, base_sqft: u32, rate: i64) -> Result<CostOption, PlanGeneratorError> {
        let total_sqft = percent_of(i64::from(base_sqft), tier.area_percent())
            .and_then(|sqft| u32::try_from(sqft).ok())
            .ok_or(PlanGeneratorError::EstimateOutOfRange)?;
        let rate_minor = rate
            .checked_mul(100)
            .and_then(|minor| percent_of(minor, tier.rate_percent()))
            .ok_or(PlanGeneratorError::EstimateOutOfRange)?;
        let total = rate_minor
            .checked_mul(i64::from(total_sqft))
            .map(Money::from_minor)
            .ok_or(PlanGeneratorError::EstimateOutOfRange)?;
        Ok(CostOption {
            tier,
            title: tier.title().to_owned(),
            total_sqft,
            total,
        })
    }
}

fn percent_of(value: i64, percent: u32) -> Option<i64> {
    value.checked_mul(i64::from(percent))?.checked_div(100)
}

#[async_trait]
impl PlanGenerator for RateCardPlanGenerator {
    async fn generate_plan(&self, description: &str) -> Result<PlanProposal, PlanGeneratorError> {
        if description.trim().is_empty() {
            return Err(PlanGeneratorError::EmptyDescription);
        }
        let floor_plan = Self::floor_plan(description);
        let base_sqft = floor_plan.total_sqft();
        let rate = Self::rate_for(description);
        let [efficient, balanced, premium] = CostTier::ALL;
        let cost_options = [
            Self::price(efficient, base_sqft, rate)?,
            Self::price(balanced, base_sqft, rate)?,
            Self::price(premium, base_sqft, rate)?,
        ];
        Ok(PlanProposal {
            floor_plan,
            cost_options,
        })
    }
}
