//! Shared helpers for docfixture integration tests.

#![allow(dead_code)]

pub use docfixture::prelude::*;
pub use docfix_core::{Error, ServerVersion};
pub use docfix_fixture::{BackoffPolicy, Stage};
pub use docfix_memstore::{MemorySession, Operation};
pub use std::time::Duration;

/// Configuration with timeouts short enough for tests.
pub fn quick_config() -> FixtureConfig {
    FixtureConfig {
        connect_timeout_ms: 150,
        settle_timeout_ms: 500,
        probe_timeout_ms: 200,
        backoff: BackoffPolicy {
            initial_ms: 2,
            max_ms: 25,
            multiplier: 2.0,
        },
        ..FixtureConfig::default()
    }
}

/// A simulated cluster plus a fixture context set up against it.
pub struct TestCluster {
    pub node: MemoryNode,
    pub ctx: FixtureContext<MemoryNetwork>,
}

impl TestCluster {
    pub fn new(config: NodeConfig) -> Self {
        Self::with_fixture_config(config, quick_config())
    }

    pub fn with_fixture_config(config: NodeConfig, fixture: FixtureConfig) -> Self {
        init_test_logging();
        let node = MemoryNode::new(config);
        let ctx = FixtureContext::set_up(MemoryNetwork::localhost(node.clone()), fixture)
            .expect("fixture set-up");
        Self { node, ctx }
    }

    /// Session ids that appear in the node's operation log, in first-seen order.
    pub fn session_ids(&self) -> Vec<u64> {
        let mut ids = Vec::new();
        for record in self.node.operations() {
            if !ids.contains(&record.session) {
                ids.push(record.session);
            }
        }
        ids
    }
}
