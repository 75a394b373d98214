//! Bucket settings.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Smallest per-node memory quota the cluster accepts for a bucket.
pub const MIN_QUOTA_MB: u64 = 100;

/// Largest replica count the cluster accepts.
pub const MAX_REPLICAS: u32 = 3;

/// Kind of bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketType {
    /// Persistent document bucket (supports indexes and queries)
    Couchbase,
    /// Memory-only bucket with indexes
    Ephemeral,
    /// Legacy cache bucket (no replicas, no indexes)
    Memcached,
}

impl BucketType {
    /// Whether query indexes can be built on this bucket type.
    pub fn supports_indexes(&self) -> bool {
        !matches!(self, BucketType::Memcached)
    }
}

impl Default for BucketType {
    fn default() -> Self {
        BucketType::Couchbase
    }
}

/// Settings passed to bucket creation.
///
/// Defaults match the ephemeral test bucket: no replicas, 100 MB quota,
/// no index replicas, flush enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketSettings {
    /// Bucket name
    pub name: String,
    /// Bucket type
    #[serde(rename = "type")]
    pub bucket_type: BucketType,
    /// Number of replicas
    pub replicas: u32,
    /// Memory quota in MB
    pub quota_mb: u64,
    /// Whether index replicas are kept
    pub index_replicas: bool,
    /// Whether the bucket may be flushed
    pub flush_enabled: bool,
}

impl Default for BucketSettings {
    fn default() -> Self {
        Self {
            name: "mybucket".to_string(),
            bucket_type: BucketType::Couchbase,
            replicas: 0,
            quota_mb: MIN_QUOTA_MB,
            index_replicas: false,
            flush_enabled: true,
        }
    }
}

impl BucketSettings {
    /// Start building settings for `name` from the defaults.
    pub fn builder(name: impl Into<String>) -> BucketSettingsBuilder {
        BucketSettingsBuilder {
            settings: BucketSettings {
                name: name.into(),
                ..BucketSettings::default()
            },
        }
    }

    /// Quota in bytes.
    pub fn quota_bytes(&self) -> u64 {
        self.quota_mb * 1024 * 1024
    }

    /// Check the settings against cluster limits.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidSettings("bucket name is empty".into()));
        }
        if let Some(c) = self
            .name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '%')))
        {
            return Err(Error::InvalidSettings(format!(
                "bucket name {:?} contains invalid character {:?}",
                self.name, c
            )));
        }
        if self.quota_mb < MIN_QUOTA_MB {
            return Err(Error::InvalidSettings(format!(
                "quota {}MB is below the {}MB minimum",
                self.quota_mb, MIN_QUOTA_MB
            )));
        }
        if self.replicas > MAX_REPLICAS {
            return Err(Error::InvalidSettings(format!(
                "replica count {} exceeds {}",
                self.replicas, MAX_REPLICAS
            )));
        }
        if self.bucket_type == BucketType::Memcached && self.replicas > 0 {
            return Err(Error::InvalidSettings(
                "memcached buckets do not support replicas".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`BucketSettings`].
#[derive(Debug, Clone)]
pub struct BucketSettingsBuilder {
    settings: BucketSettings,
}

impl BucketSettingsBuilder {
    /// Set the bucket type.
    pub fn bucket_type(mut self, bucket_type: BucketType) -> Self {
        self.settings.bucket_type = bucket_type;
        self
    }

    /// Set the replica count.
    pub fn replicas(mut self, replicas: u32) -> Self {
        self.settings.replicas = replicas;
        self
    }

    /// Set the memory quota in MB.
    pub fn quota_mb(mut self, quota_mb: u64) -> Self {
        self.settings.quota_mb = quota_mb;
        self
    }

    /// Enable or disable index replicas.
    pub fn index_replicas(mut self, enabled: bool) -> Self {
        self.settings.index_replicas = enabled;
        self
    }

    /// Enable or disable flush.
    pub fn flush_enabled(mut self, enabled: bool) -> Self {
        self.settings.flush_enabled = enabled;
        self
    }

    /// Finish building.
    pub fn build(self) -> BucketSettings {
        self.settings
    }
}
