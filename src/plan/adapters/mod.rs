//! Plan generator adapters.

pub mod rate_card;

pub use rate_card::RateCardPlanGenerator;
