//! Budget burn-down tracking with exactly-once threshold alerts.
//!
//! Spend updates and threshold evaluation run as one read-modify-write
//! cycle per project. Alerts are unique per project and threshold in the
//! repository, so a second crossing of the same threshold is suppressed at
//! insertion rather than filtered afterwards.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
