//! End-to-end tests against a mock echo device.

pub mod discovery_tests;
pub mod interactive_tests;
pub mod scripted_tests;
