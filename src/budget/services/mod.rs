//! Budget watcher and periodic review.

mod review;
mod watcher;

pub use review::BudgetReviewHandler;
pub use watcher::{BudgetServiceError, BudgetServiceResult, BudgetState, BudgetWatcher};
