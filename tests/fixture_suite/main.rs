//! Fixture Integration Tests
//!
//! End-to-end tests for docfixture against the simulated cluster:
//! provisioning, reconnect handling, unavailable clusters, teardown,
//! assertions, procedures and configuration.

#[path = "../common/mod.rs"]
mod common;

mod assertions;
mod config;
mod lifecycle;
mod procedures;
mod reconnect;
mod unavailable;
