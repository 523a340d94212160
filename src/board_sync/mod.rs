//! Synchronization between the task graph and the external kanban board.
//!
//! The board is the system of record for execution status. Internal changes
//! are pushed as card moves; board webhooks come back as revision-stamped
//! status changes that the task graph accepts only when newer than what it
//! holds. Lost or duplicated webhooks are repaired by a periodic
//! reconciliation pass that re-fetches card state and feeds it through the
//! same path. Board outages never fail the triggering request: the task
//! stays sync-pending and a later push or reconciliation catches up.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
