//! Ephemeral document-store fixtures for integration tests
//!
//! A [`FixtureContext`] provisions a throwaway bucket, seeds it with one
//! canonical document, checks that a `RequestPlus` query can see it and tears
//! everything down again when the suite ends.
//!
//! - [`ConnectionManager`]: connect with bounded retry, settle, reconnect
//! - [`CapabilityProbe`]: server version and the reconnect rule for 4.x
//! - [`Provisioner`]: bucket creation and seeding
//! - [`TeardownCoordinator`]: idempotent cleanup
//! - [`assertions`]: shape checks for documents and query results
//! - [`DocumentProcedures`]: document and query operations in procedure form
//!
//! A cluster that is unreachable or misbehaving does not fail set-up; the
//! context reports [`Readiness::Unavailable`] and store-dependent tests skip
//! themselves with [`require_ready!`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assertions;
pub mod canonical;
pub mod config;
pub mod connection;
pub mod context;
pub mod logging;
pub mod probe;
pub mod procedures;
pub mod provision;
pub mod retry;
pub mod teardown;

#[doc(hidden)]
pub use tracing as __tracing;

pub use config::{BackoffPolicy, FixtureConfig};
pub use connection::ConnectionManager;
pub use context::{FixtureContext, ReadyFixture};
pub use logging::init_test_logging;
pub use probe::{CapabilityProbe, ProbeOutcome};
pub use procedures::{DocumentProcedures, DocumentResult, QueryResultRecord, QueryStream};
pub use provision::{
    FixtureState, ProvisionOptions, Provisioner, Readiness, Stage, StepFailure, StepResult,
};
pub use teardown::{TeardownCoordinator, TeardownReport};
