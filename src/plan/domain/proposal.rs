//! Floor plans and the three priced options offered for them.

use crate::budget::domain::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price and space tier of a cost option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    /// Compact layout at a reduced rate.
    Efficient,
    /// Standard room sizes and finishes.
    Balanced,
    /// Oversized rooms and premium finishes.
    Premium,
}

impl CostTier {
    /// All tiers from cheapest to most expensive.
    pub const ALL: [Self; 3] = [Self::Efficient, Self::Balanced, Self::Premium];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Efficient => "efficient",
            Self::Balanced => "balanced",
            Self::Premium => "premium",
        }
    }

    /// Returns the homeowner-facing title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Efficient => "Efficient Living",
            Self::Balanced => "Spacious Comfort",
            Self::Premium => "Premium Design",
        }
    }

    /// Room size relative to the balanced plan, in percent.
    #[must_use]
    pub const fn area_percent(self) -> u32 {
        match self {
            Self::Efficient => 85,
            Self::Balanced => 100,
            Self::Premium => 120,
        }
    }

    /// Rate per square foot relative to the base rate, in percent.
    #[must_use]
    pub const fn rate_percent(self) -> u32 {
        match self {
            Self::Efficient => 90,
            Self::Balanced => 100,
            Self::Premium => 112,
        }
    }
}

impl fmt::Display for CostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One room of a floor plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room name.
    pub name: String,
    /// Area in square feet.
    pub sqft: u32,
    /// Storey, starting at 1.
    pub floor: u8,
}

/// Room-level layout of a proposed house.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorPlan {
    /// Rooms in presentation order.
    pub rooms: Vec<Room>,
}

impl FloorPlan {
    /// Returns the total area across rooms.
    #[must_use]
    pub fn total_sqft(&self) -> u32 {
        self.rooms
            .iter()
            .fold(0_u32, |total, room| total.saturating_add(room.sqft))
    }
}

/// A priced variant of the proposed plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostOption {
    /// Tier of the option.
    pub tier: CostTier,
    /// Homeowner-facing title.
    pub title: String,
    /// Living area of this variant.
    pub total_sqft: u32,
    /// Estimated total cost.
    pub total: Money,
}

/// Output of plan generation: one floor plan and exactly three options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanProposal {
    /// Proposed layout at balanced room sizes.
    pub floor_plan: FloorPlan,
    /// Options ordered efficient, balanced, premium.
    pub cost_options: [CostOption; 3],
}

impl PlanProposal {
    /// Returns the option for `tier`, if present.
    #[must_use]
    pub fn option(&self, tier: CostTier) -> Option<&CostOption> {
        self.cost_options.iter().find(|option| option.tier == tier)
    }
}
