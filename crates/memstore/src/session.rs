//! Sessions against a simulated node.

use crate::bucket::{BucketState, MemoryBucket};
use crate::faults::Operation;
use crate::node::NodeShared;
use dashmap::mapref::entry::Entry;
use docfix_core::{BucketSettings, ClusterInfo, Error, Result, Session};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub(crate) struct SessionInner {
    pub(crate) id: u64,
    pub(crate) node: Arc<NodeShared>,
    connected: AtomicBool,
    connected_at: Instant,
}

impl SessionInner {
    /// Log `op`, then fail if the session is closed or a fault is armed.
    pub(crate) fn guard(&self, op: Operation) -> Result<()> {
        self.node.record(self.id, op);
        if !self.connected.load(Ordering::Acquire) {
            return Err(Error::SessionClosed);
        }
        self.node.faults.check(op)
    }
}

/// An authenticated session on a [`MemoryNode`](crate::MemoryNode).
#[derive(Clone)]
pub struct MemorySession {
    inner: Arc<SessionInner>,
}

impl MemorySession {
    pub(crate) fn new(id: u64, node: Arc<NodeShared>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                node,
                connected: AtomicBool::new(true),
                connected_at: Instant::now(),
            }),
        }
    }

    /// Identifier used in the node's operation log.
    pub fn id(&self) -> u64 {
        self.inner.id
    }
}

impl std::fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySession")
            .field("id", &self.inner.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Session for MemorySession {
    type Bucket = MemoryBucket;

    fn is_ready(&self) -> bool {
        self.is_connected() && self.inner.connected_at.elapsed() >= self.inner.node.config.settle_delay
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    fn cluster_info(&self, timeout: Duration) -> Result<ClusterInfo> {
        self.inner.guard(Operation::ClusterInfo)?;
        let latency = self.inner.node.config.info_latency;
        if latency > timeout {
            std::thread::sleep(timeout);
            return Err(Error::timeout("cluster info", timeout));
        }
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        Ok(ClusterInfo {
            node_versions: self.inner.node.config.versions.clone(),
        })
    }

    fn insert_bucket(&self, settings: &BucketSettings) -> Result<()> {
        self.inner.guard(Operation::InsertBucket)?;
        settings.validate()?;
        let config = &self.inner.node.config;
        match self.inner.node.buckets.entry(settings.name.clone()) {
            Entry::Occupied(_) => Err(Error::BucketExists {
                name: settings.name.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(BucketState::new(
                    settings.clone(),
                    config.num_vbuckets,
                    config.indexer,
                )));
                debug!(session = self.inner.id, bucket = %settings.name, "bucket created");
                Ok(())
            }
        }
    }

    fn bucket_exists(&self, name: &str) -> Result<bool> {
        self.inner.guard(Operation::BucketExists)?;
        Ok(self.inner.node.buckets.contains_key(name))
    }

    fn remove_bucket(&self, name: &str) -> Result<()> {
        self.inner.guard(Operation::RemoveBucket)?;
        match self.inner.node.buckets.remove(name) {
            Some(_) => {
                debug!(session = self.inner.id, bucket = name, "bucket removed");
                Ok(())
            }
            None => Err(Error::BucketNotFound {
                name: name.to_string(),
            }),
        }
    }

    fn flush_bucket(&self, name: &str) -> Result<()> {
        self.inner.guard(Operation::FlushBucket)?;
        let bucket = self
            .inner
            .node
            .buckets
            .get(name)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| Error::BucketNotFound {
                name: name.to_string(),
            })?;
        if !bucket.settings.flush_enabled {
            return Err(Error::InvalidSettings(format!(
                "flush is disabled for bucket {}",
                name
            )));
        }
        bucket.flush();
        Ok(())
    }

    fn open_bucket(&self, name: &str) -> Result<MemoryBucket> {
        self.inner.guard(Operation::OpenBucket)?;
        let state = self
            .inner
            .node
            .buckets
            .get(name)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| Error::BucketNotFound {
                name: name.to_string(),
            })?;
        Ok(MemoryBucket::new(state, Arc::clone(&self.inner)))
    }

    fn disconnect(&self) -> Result<()> {
        self.inner.node.record(self.inner.id, Operation::Disconnect);
        if self.inner.connected.swap(false, Ordering::AcqRel) {
            debug!(session = self.inner.id, "session disconnected");
        }
        Ok(())
    }
}
