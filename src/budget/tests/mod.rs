//! Unit tests for the budget context.

mod watcher_tests;
