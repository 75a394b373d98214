//! Partition (vbucket) mapping and mutation sequencing.
//!
//! Keys hash to one of `num_vbuckets` partitions using the CRC32 scheme the
//! server uses. Each partition owns a random UUID and a monotonically
//! increasing sequence number; together they form the mutation token of a
//! write.

use docfix_core::MutationToken;
use std::collections::HashMap;

/// Partition count of a default cluster.
pub const DEFAULT_VBUCKETS: u16 = 1024;

/// Partition a key hashes to.
pub fn vbucket_for(key: &str, num_vbuckets: u16) -> u16 {
    let crc = crc32fast::hash(key.as_bytes());
    (((crc >> 16) & 0x7fff) % u32::from(num_vbuckets.max(1))) as u16
}

#[derive(Debug, Clone, Copy)]
struct Partition {
    uuid: u64,
    high_seqno: u64,
}

/// Per-bucket partition state.
#[derive(Debug)]
pub struct VBucketMap {
    num_vbuckets: u16,
    partitions: HashMap<u16, Partition>,
}

impl VBucketMap {
    /// Create a map with `num_vbuckets` partitions.
    pub fn new(num_vbuckets: u16) -> Self {
        Self {
            num_vbuckets: num_vbuckets.max(1),
            partitions: HashMap::new(),
        }
    }

    /// Number of partitions.
    pub fn num_vbuckets(&self) -> u16 {
        self.num_vbuckets
    }

    /// Record a mutation of `key` and return its token.
    pub fn record_mutation(&mut self, bucket: &str, key: &str) -> MutationToken {
        let vbucket_id = vbucket_for(key, self.num_vbuckets);
        // Partitions are materialised on first write with a fresh history id.
        let partition = self.partitions.entry(vbucket_id).or_insert_with(|| Partition {
            uuid: rand::random::<u64>(),
            high_seqno: 0,
        });
        partition.high_seqno += 1;
        MutationToken {
            bucket: bucket.to_string(),
            vbucket_id,
            vbucket_uuid: partition.uuid,
            sequence_number: partition.high_seqno,
        }
    }

    /// Highest sequence number written to `vbucket_id`.
    pub fn high_seqno(&self, vbucket_id: u16) -> u64 {
        self.partitions
            .get(&vbucket_id)
            .map(|p| p.high_seqno)
            .unwrap_or(0)
    }
}
