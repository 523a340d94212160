//! Budget domain types.

mod alert;
mod budget;
mod error;
mod money;
mod threshold;

pub use alert::BudgetAlert;
pub use budget::{AlertLevel, BudgetSummary, ProjectBudget, SpendCategory};
pub use error::{BudgetDomainError, ParseMoneyError};
pub use money::Money;
pub use threshold::Threshold;
