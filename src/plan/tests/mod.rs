//! Unit tests for the plan context.

mod rate_card_tests;
