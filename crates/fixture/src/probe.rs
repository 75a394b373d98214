//! Server capability detection.

use docfix_core::{Error, Result, ServerVersion, Session};
use std::time::{Duration, Instant};
use tracing::info;

/// Major version whose clusters need a fresh session after bucket creation.
pub const RECONNECT_MAJOR_VERSION: u32 = 4;

/// What the probe learned about the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Lowest version across the cluster's nodes
    pub version: ServerVersion,
    /// Whether the session must be replaced after the bucket is created
    pub reconnect_required: bool,
}

impl ProbeOutcome {
    /// Outcome for a cluster whose lowest node runs `version`.
    pub fn for_version(version: ServerVersion) -> Self {
        Self {
            version,
            reconnect_required: version.major == RECONNECT_MAJOR_VERSION,
        }
    }
}

/// Looks up the cluster version within a deadline.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityProbe {
    timeout: Duration,
}

impl CapabilityProbe {
    /// Probe with the given deadline.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Deadline for the cluster info lookup.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Detect the cluster version.
    ///
    /// A cluster that answers after the deadline is treated the same as one
    /// that does not answer.
    pub fn detect<S: Session>(&self, session: &S) -> Result<ProbeOutcome> {
        let started = Instant::now();
        let cluster = session.cluster_info(self.timeout)?;
        if started.elapsed() > self.timeout {
            return Err(Error::timeout("probe", self.timeout));
        }
        let version = cluster
            .min_version()
            .ok_or_else(|| Error::protocol("cluster info lists no nodes"))?;
        let outcome = ProbeOutcome::for_version(version);
        info!(
            version = %version,
            reconnect_required = outcome.reconnect_required,
            "server version detected"
        );
        Ok(outcome)
    }

    /// Major version of the lowest node.
    pub fn detect_server_major_version<S: Session>(&self, session: &S) -> Result<u32> {
        self.detect(session).map(|outcome| outcome.version.major)
    }
}

impl Default for CapabilityProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
