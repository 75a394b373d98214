//! Host routing for simulated nodes.

use crate::node::MemoryNode;
use crate::session::MemorySession;
use dashmap::DashMap;
use docfix_core::{Connector, Endpoint, Error, Result};
use std::sync::Arc;
use tracing::debug;

/// A set of simulated nodes addressable by host name.
///
/// `MemoryNetwork` is the [`Connector`] of the simulated cluster: connecting
/// to an endpoint routes to the node attached under the endpoint's address
/// (`host:port`) or, failing that, its bare host.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    nodes: Arc<DashMap<String, MemoryNode>>,
}

impl MemoryNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a network with a single node on `localhost`.
    pub fn localhost(node: MemoryNode) -> Self {
        let network = Self::new();
        network.attach("localhost", node);
        network
    }

    /// Make `node` reachable under `host`.
    pub fn attach(&self, host: impl Into<String>, node: MemoryNode) {
        self.nodes.insert(host.into(), node);
    }

    /// Make `host` unresolvable.
    pub fn detach(&self, host: &str) -> Option<MemoryNode> {
        self.nodes.remove(host).map(|(_, node)| node)
    }

    /// Node attached under `host`.
    pub fn node(&self, host: &str) -> Option<MemoryNode> {
        self.nodes.get(host).map(|n| n.value().clone())
    }
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hosts: Vec<String> = self.nodes.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("MemoryNetwork").field("hosts", &hosts).finish()
    }
}

impl Connector for MemoryNetwork {
    type Session = MemorySession;

    fn connect(&self, endpoint: &Endpoint) -> Result<MemorySession> {
        let address = endpoint.address();
        let node = self
            .node(&address)
            .or_else(|| self.node(&endpoint.host))
            .ok_or_else(|| Error::Connection {
                endpoint: address.clone(),
                reason: "unknown host".into(),
            })?;
        debug!(endpoint = %endpoint, "connecting");
        node.open_session(&address, &endpoint.credentials)
    }
}
