//! Unit tests for the board synchronization module.

mod domain_tests;
