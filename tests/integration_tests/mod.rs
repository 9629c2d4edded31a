//! Integration tests module
//!
//! End-to-end tests of the notification pipeline: captured fault, policy,
//! rendering and delivery to a recording mail transport and a mock webhook.

pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
