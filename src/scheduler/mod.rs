//! At-least-once deadline timers.
//!
//! [`services::TimerQueue`] records timers; [`services::TimerScheduler`]
//! repeatedly takes due timers from the store and hands each to the
//! [`ports::TimerHandler`] registered for its kind. A firing that overlaps a
//! still-running firing of the same key is skipped, and a timer is only
//! deleted after its handler finishes, so a crash between firing and
//! deletion re-delivers it. Handlers compare the state captured in the
//! payload against the entity's current state and treat a mismatch as a
//! no-op.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
