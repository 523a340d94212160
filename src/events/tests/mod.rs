//! Unit tests for event fan-out and notification rendering.
