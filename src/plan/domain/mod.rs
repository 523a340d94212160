//! Plan proposal types.

mod proposal;

pub use proposal::{CostOption, CostTier, FloorPlan, PlanProposal, Room};
