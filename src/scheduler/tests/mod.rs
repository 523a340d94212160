//! Unit tests for timer scheduling and firing.

mod firing_tests;
