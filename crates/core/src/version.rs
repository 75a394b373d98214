//! Server version reporting.

use crate::error::{Error, Result};
use std::fmt;

/// A server build version (`major.minor.patch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    pub patch: u32,
}

impl ServerVersion {
    /// Create a version.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a build string such as `4.6.5-4742-enterprise` or `7.2.0`.
    ///
    /// Missing minor/patch components default to 0.
    pub fn parse(raw: &str) -> Result<Self> {
        let core = raw.split('-').next().unwrap_or_default();
        let mut parts = core.split('.');
        let mut next = |required: bool| -> Result<u32> {
            match parts.next() {
                Some(p) => p
                    .parse::<u32>()
                    .map_err(|_| Error::protocol(format!("unparseable server version {:?}", raw))),
                None if required => Err(Error::protocol(format!(
                    "unparseable server version {:?}",
                    raw
                ))),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Cluster-level information returned by the management interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    /// Version of every node in the cluster
    pub node_versions: Vec<ServerVersion>,
}

impl ClusterInfo {
    /// Lowest version across all nodes; the cluster behaves like this version.
    pub fn min_version(&self) -> Option<ServerVersion> {
        self.node_versions.iter().min().copied()
    }
}
