//! # docfixture
//!
//! Ephemeral document-store fixtures for integration tests.
//!
//! docfixture provisions a throwaway bucket, seeds one canonical document,
//! confirms it is queryable with request-level consistency and removes
//! everything again once the suite is done. Tests receive a typed readiness
//! value instead of failing when no cluster is reachable.
//!
//! ## Quick Start
//!
//! ```
//! use docfixture::prelude::*;
//!
//! let node = MemoryNode::new(NodeConfig::default());
//! let mut ctx = FixtureContext::set_up(
//!     MemoryNetwork::localhost(node),
//!     FixtureConfig::default(),
//! )?;
//!
//! if let Some(fixture) = ctx.ready() {
//!     let procs = DocumentProcedures::new(fixture.bucket)
//!         .with_consistency(ScanConsistency::RequestPlus);
//!     let stream = procs.query("select * from mybucket where lastName = 'Van Gogh'")?;
//!     assert_single_stream_result(stream, "mybucket");
//! }
//!
//! ctx.tear_down()?;
//! # Ok::<(), docfixture::Error>(())
//! ```
//!
//! ## Crates
//!
//! - [`docfix_core`]: error taxonomy, documents, queries and the store traits
//! - [`docfix_memstore`]: an in-memory simulated cluster implementing those traits
//! - [`docfix_fixture`]: connection handling, provisioning, teardown and assertions

#![warn(missing_docs)]

pub mod prelude;

pub use docfix_core;
pub use docfix_fixture;
pub use docfix_memstore;

// Re-export the entry points
pub use docfix_core::{Error, Result};
pub use docfix_fixture::{FixtureConfig, FixtureContext, Readiness};
