//! Unit tests for the task graph context.
