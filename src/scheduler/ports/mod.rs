//! Port contracts for timer storage and firing.

pub mod handler;
pub mod repository;

pub use handler::{TimerHandler, TimerHandlerError};
pub use repository::{TimerRepository, TimerRepositoryError, TimerRepositoryResult};
