//! Timer scheduling and the firing loop.

mod firing;
mod queue;

pub use firing::TimerScheduler;
pub use queue::TimerQueue;
