//! A simulated cluster node.
//!
//! A node owns buckets, credentials and version information, and models the
//! timing behaviour clients have to cope with:
//!
//! | Knob | Effect |
//! |------|--------|
//! | `boot_delay` | connections are refused until the node has been up this long |
//! | `settle_delay` | a new session reports `is_ready() == false` for this long |
//! | `info_latency` | cluster info takes this long to answer |
//!
//! Every session operation is appended to an operation log so tests can check
//! which session issued what.

use crate::bucket::BucketState;
use crate::faults::{FaultPlan, Operation};
use crate::index::IndexerMode;
use crate::session::MemorySession;
use crate::vbucket::DEFAULT_VBUCKETS;
use dashmap::DashMap;
use docfix_core::{Credentials, Error, Result, ServerVersion};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Configuration of a simulated node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Accepted credentials
    pub credentials: Credentials,
    /// Versions reported for each node of the cluster
    pub versions: Vec<ServerVersion>,
    /// Time after start before connections are accepted
    pub boot_delay: Duration,
    /// Time after connect before a session is ready
    pub settle_delay: Duration,
    /// Cluster info response time
    pub info_latency: Duration,
    /// Partitions per bucket
    pub num_vbuckets: u16,
    /// Indexer behaviour
    pub indexer: IndexerMode,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::new("Administrator", "password"),
            versions: vec![ServerVersion::new(7, 2, 0)],
            boot_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            info_latency: Duration::ZERO,
            num_vbuckets: DEFAULT_VBUCKETS,
            indexer: IndexerMode::Lagging,
        }
    }
}

impl NodeConfig {
    /// Report a single node of the given version.
    pub fn version(mut self, version: ServerVersion) -> Self {
        self.versions = vec![version];
        self
    }

    /// Set the accepted credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the boot delay.
    pub fn boot_delay(mut self, delay: Duration) -> Self {
        self.boot_delay = delay;
        self
    }

    /// Set the post-connect settle delay.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the cluster info latency.
    pub fn info_latency(mut self, latency: Duration) -> Self {
        self.info_latency = latency;
        self
    }

    /// Set the indexer mode.
    pub fn indexer(mut self, mode: IndexerMode) -> Self {
        self.indexer = mode;
        self
    }
}

/// One entry of the operation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRecord {
    /// Session that issued the operation
    pub session: u64,
    /// What was attempted
    pub op: Operation,
}

pub(crate) struct NodeShared {
    pub(crate) config: NodeConfig,
    pub(crate) uuid: Uuid,
    started_at: Instant,
    running: AtomicBool,
    pub(crate) buckets: DashMap<String, Arc<BucketState>>,
    pub(crate) faults: FaultPlan,
    op_log: Mutex<Vec<OpRecord>>,
    next_session: AtomicU64,
}

impl NodeShared {
    pub(crate) fn record(&self, session: u64, op: Operation) {
        self.op_log.lock().push(OpRecord { session, op });
    }
}

/// Handle to a simulated node. Cheap to clone.
#[derive(Clone)]
pub struct MemoryNode {
    pub(crate) shared: Arc<NodeShared>,
}

impl MemoryNode {
    /// Start a node with `config`.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            shared: Arc::new(NodeShared {
                config,
                uuid: Uuid::new_v4(),
                started_at: Instant::now(),
                running: AtomicBool::new(true),
                buckets: DashMap::new(),
                faults: FaultPlan::new(),
                op_log: Mutex::new(Vec::new()),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    /// Node configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.shared.config
    }

    /// Cluster identity.
    pub fn uuid(&self) -> Uuid {
        self.shared.uuid
    }

    /// Fault plan, for arming injected failures.
    pub fn faults(&self) -> &FaultPlan {
        &self.shared.faults
    }

    /// Stop accepting connections.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
    }

    /// Accept connections again.
    pub fn start(&self) {
        self.shared.running.store(true, Ordering::Release);
    }

    /// Whether the node currently accepts connections.
    pub fn is_accepting(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
            && self.shared.started_at.elapsed() >= self.shared.config.boot_delay
    }

    /// Full operation log in issue order.
    pub fn operations(&self) -> Vec<OpRecord> {
        self.shared.op_log.lock().clone()
    }

    /// Operations issued by one session.
    pub fn operations_for(&self, session: u64) -> Vec<Operation> {
        self.shared
            .op_log
            .lock()
            .iter()
            .filter(|r| r.session == session)
            .map(|r| r.op)
            .collect()
    }

    /// Names of existing buckets, sorted.
    pub fn bucket_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .shared
            .buckets
            .iter()
            .map(|e| e.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Live (unexpired) document count of a bucket.
    pub fn document_count(&self, bucket: &str) -> Option<usize> {
        self.shared.buckets.get(bucket).map(|b| b.document_count())
    }

    /// Let the indexer of every bucket catch up with pending writes.
    pub fn run_indexer(&self) {
        for bucket in self.shared.buckets.iter() {
            bucket.value().run_indexer();
        }
    }

    /// Open a session. Called by the network connector.
    pub(crate) fn open_session(&self, address: &str, credentials: &Credentials) -> Result<MemorySession> {
        if !self.is_accepting() {
            return Err(Error::ConnectionRefused {
                endpoint: address.to_string(),
            });
        }
        let id = self.shared.next_session.fetch_add(1, Ordering::AcqRel);
        self.shared.record(id, Operation::Connect);
        self.shared.faults.check(Operation::Connect)?;

        let expected = &self.shared.config.credentials;
        if credentials.username != expected.username || credentials.password != expected.password {
            return Err(Error::Authentication {
                user: credentials.username.clone(),
            });
        }

        debug!(session = id, address, "session opened");
        Ok(MemorySession::new(id, Arc::clone(&self.shared)))
    }
}

impl std::fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNode")
            .field("uuid", &self.shared.uuid)
            .field("versions", &self.shared.config.versions)
            .field("buckets", &self.bucket_names())
            .finish()
    }
}
