//! Vibehouse: construction project coordination core.
//!
//! This crate keeps an internal construction project model consistent with an
//! external kanban board while driving dispute escalation timers and budget
//! threshold alerts against the same project state.
//!
//! # Architecture
//!
//! Vibehouse follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory stores, board
//!   fakes, event sinks)
//! - **Services**: Orchestration of domain rules over ports
//!
//! # Modules
//!
//! - [`task_graph`]: Projects, phases, and tasks with revision-checked status
//!   changes
//! - [`board_sync`]: Board adapter and reconciliation against the external
//!   board
//! - [`dispute`]: Dispute stage machine with time-boxed escalation
//! - [`scheduler`]: At-least-once deadline timers with idempotent handlers
//! - [`budget`]: Budget burn-down tracking with exactly-once threshold alerts
//! - [`events`]: Domain event fan-out to notification and live-update sinks
//! - [`plan`]: Contract for the external plan and cost estimation transform
//! - [`coordinator`]: Facade wiring the contexts and background loops

pub mod board_sync;
pub mod budget;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod dispute;
pub mod events;
pub mod keyed_lock;
pub mod plan;
pub mod scheduler;
pub mod task_graph;
