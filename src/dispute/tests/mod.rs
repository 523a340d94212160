//! Unit tests for the dispute module.
