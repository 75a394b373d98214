//! Documents and store-assigned metadata.
//!
//! CAS values and mutation tokens are assigned by the store on every write.
//! Callers treat them as opaque: they are captured, carried around and
//! compared for equality, never computed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object body.
pub type JsonObject = Map<String, Value>;

/// Position of a write in a vbucket's mutation history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationToken {
    /// Bucket the write landed in
    pub bucket: String,
    /// Partition the document hashes to
    pub vbucket_id: u16,
    /// Identity of the partition's history branch
    pub vbucket_uuid: u64,
    /// Sequence number of the write within the partition
    pub sequence_number: u64,
}

impl MutationToken {
    /// Map form, as handed to procedure callers.
    ///
    /// Keys: `bucket`, `vbucketID`, `vbucketUUID`, `sequenceNumber`.
    pub fn to_map(&self) -> JsonObject {
        let mut map = Map::new();
        map.insert("bucket".into(), Value::String(self.bucket.clone()));
        map.insert("vbucketID".into(), Value::from(self.vbucket_id));
        map.insert("vbucketUUID".into(), Value::from(self.vbucket_uuid));
        map.insert("sequenceNumber".into(), Value::from(self.sequence_number));
        map
    }

    /// Parse the map form. Returns `None` if any key is missing or mistyped.
    pub fn from_map(map: &JsonObject) -> Option<Self> {
        Some(Self {
            bucket: map.get("bucket")?.as_str()?.to_string(),
            vbucket_id: u16::try_from(map.get("vbucketID")?.as_u64()?).ok()?,
            vbucket_uuid: map.get("vbucketUUID")?.as_u64()?,
            sequence_number: map.get("sequenceNumber")?.as_u64()?,
        })
    }
}

/// A stored document together with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document key
    pub id: String,
    /// Document body
    pub content: JsonObject,
    /// Compare-and-swap stamp
    pub cas: u64,
    /// Expiry in seconds (0 = never)
    pub expiry: u32,
    /// Token of the write that produced this version, if the store reports one
    pub mutation_token: Option<MutationToken>,
}

impl Document {
    /// Capture the metadata of this document for later comparison.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            id: self.id.clone(),
            expiry: self.expiry,
            cas: self.cas,
            mutation_token: self.mutation_token.clone(),
        }
    }
}

/// Metadata captured from a write: id, expiry, CAS and mutation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Document key
    pub id: String,
    /// Expiry in seconds
    pub expiry: u32,
    /// CAS at capture time
    pub cas: u64,
    /// Mutation token at capture time
    pub mutation_token: Option<MutationToken>,
}

impl DocumentSnapshot {
    /// Mutation token in map form (empty map when the store reported none).
    pub fn mutation_token_map(&self) -> JsonObject {
        self.mutation_token
            .as_ref()
            .map(MutationToken::to_map)
            .unwrap_or_default()
    }
}

/// Outcome of a write that does not return a body (remove).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    /// CAS assigned to the mutation
    pub cas: u64,
    /// Token of the mutation
    pub mutation_token: Option<MutationToken>,
}

/// Options for document writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Expiry in seconds (0 = never)
    pub expiry: u32,
    /// Required current CAS (0 = no check)
    pub cas: u64,
}

impl WriteOptions {
    /// Write with an expiry.
    pub fn with_expiry(expiry: u32) -> Self {
        Self { expiry, cas: 0 }
    }

    /// Write only if the stored CAS equals `cas`.
    pub fn with_cas(cas: u64) -> Self {
        Self { expiry: 0, cas }
    }
}
