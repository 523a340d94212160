//! Budget domain errors.

use super::Money;
use thiserror::Error;

/// Errors returned by budget domain rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BudgetDomainError {
    /// Spend and budget amounts must not be negative.
    #[error("amount must not be negative: {0}")]
    NegativeAmount(Money),

    /// An addition left the representable range.
    #[error("amount overflow")]
    Overflow,

    /// A threshold percentage is outside `1..=1000`.
    #[error("threshold {0}% is outside 1..=1000")]
    InvalidThreshold(u16),
}

/// Error returned while parsing a decimal money amount.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid money amount: {0}")]
pub struct ParseMoneyError(pub String);
