//! Bucket storage and the bucket handle.
//!
//! ## Design
//!
//! `BucketState` is shared by every handle that opened the bucket. All
//! document data sits behind a single mutex; the simulated cluster is not a
//! performance subject, only a behavioural one.
//!
//! Every mutation:
//! 1. assigns a new CAS (strictly greater than any previous CAS in the bucket)
//! 2. records the write in the key's vbucket, producing a mutation token
//! 3. bumps the bucket write sequence the indexer catches up to

use crate::faults::Operation;
use crate::index::{IndexState, IndexerMode, PrimaryIndex};
use crate::query;
use crate::session::SessionInner;
use crate::vbucket::VBucketMap;
use docfix_core::{
    BucketHandle, BucketSettings, Document, Error, JsonObject, MutationResult, QueryMetrics,
    QueryOptions, QueryResult, Result, ScanConsistency, WriteOptions,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredDoc {
    content: JsonObject,
    cas: u64,
    expiry: u32,
    expires_at: Option<Instant>,
    mutation_token: docfix_core::MutationToken,
    size: u64,
}

impl StoredDoc {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|t| now >= t).unwrap_or(false)
    }

    fn to_document(&self, id: &str) -> Document {
        Document {
            id: id.to_string(),
            content: self.content.clone(),
            cas: self.cas,
            expiry: self.expiry,
            mutation_token: Some(self.mutation_token.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Insert,
    Upsert,
    Replace,
}

#[derive(Debug)]
struct BucketData {
    docs: BTreeMap<String, StoredDoc>,
    vbuckets: VBucketMap,
    last_cas: u64,
    bytes_used: u64,
    write_seqno: u64,
    index: Option<PrimaryIndex>,
}

impl BucketData {
    fn next_cas(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        self.last_cas = now.max(self.last_cas + 1);
        self.last_cas
    }

    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .docs
            .iter()
            .filter(|(_, d)| d.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for id in expired {
            if let Some(doc) = self.docs.remove(&id) {
                self.bytes_used -= doc.size;
                self.write_seqno += 1;
            }
        }
    }

    fn catch_up_index(&mut self) {
        let seqno = self.write_seqno;
        if let Some(index) = self.index.as_mut() {
            index.catch_up(self.docs.iter().map(|(k, d)| (k, &d.content)), seqno);
        }
    }
}

pub(crate) struct BucketState {
    pub(crate) settings: BucketSettings,
    indexer: IndexerMode,
    data: Mutex<BucketData>,
}

impl BucketState {
    pub(crate) fn new(settings: BucketSettings, num_vbuckets: u16, indexer: IndexerMode) -> Self {
        Self {
            settings,
            indexer,
            data: Mutex::new(BucketData {
                docs: BTreeMap::new(),
                vbuckets: VBucketMap::new(num_vbuckets),
                last_cas: 0,
                bytes_used: 0,
                write_seqno: 0,
                index: None,
            }),
        }
    }

    pub(crate) fn document_count(&self) -> usize {
        let now = Instant::now();
        self.data
            .lock()
            .docs
            .values()
            .filter(|d| !d.is_expired(now))
            .count()
    }

    pub(crate) fn run_indexer(&self) {
        let mut data = self.data.lock();
        data.purge_expired(Instant::now());
        data.catch_up_index();
    }

    pub(crate) fn flush(&self) {
        let mut data = self.data.lock();
        data.docs.clear();
        data.bytes_used = 0;
        data.write_seqno += 1;
        let seqno = data.write_seqno;
        if let Some(index) = data.index.as_mut() {
            index.clear(seqno);
        }
    }

    fn get(&self, id: &str) -> Option<Document> {
        let mut data = self.data.lock();
        data.purge_expired(Instant::now());
        data.docs.get(id).map(|d| d.to_document(id))
    }

    fn write(&self, id: &str, content: JsonObject, options: WriteOptions, mode: WriteMode) -> Result<Document> {
        if id.is_empty() {
            return Err(Error::InvalidDocument("document id is empty".into()));
        }
        let size = serde_json::to_vec(&content)?.len() as u64 + id.len() as u64;

        let mut data = self.data.lock();
        let now = Instant::now();
        data.purge_expired(now);

        let existing = data.docs.get(id);
        match (mode, existing) {
            (WriteMode::Insert, Some(_)) => {
                return Err(Error::DocumentExists { id: id.to_string() })
            }
            (WriteMode::Replace, None) => {
                return Err(Error::DocumentNotFound { id: id.to_string() })
            }
            _ => {}
        }
        if options.cas != 0 {
            match existing {
                Some(doc) if doc.cas != options.cas => {
                    return Err(Error::CasMismatch {
                        id: id.to_string(),
                        expected: options.cas,
                        actual: doc.cas,
                    })
                }
                Some(_) => {}
                None => return Err(Error::DocumentNotFound { id: id.to_string() }),
            }
        }

        let previous_size = existing.map(|d| d.size).unwrap_or(0);
        let projected = data.bytes_used - previous_size + size;
        if projected > self.settings.quota_bytes() {
            return Err(Error::QuotaExceeded {
                bucket: self.settings.name.clone(),
            });
        }

        let cas = data.next_cas();
        let mutation_token = data.vbuckets.record_mutation(&self.settings.name, id);
        data.write_seqno += 1;
        data.bytes_used = projected;

        let stored = StoredDoc {
            content,
            cas,
            expiry: options.expiry,
            expires_at: (options.expiry > 0)
                .then(|| now + Duration::from_secs(u64::from(options.expiry))),
            mutation_token,
            size,
        };
        let doc = stored.to_document(id);
        data.docs.insert(id.to_string(), stored);
        Ok(doc)
    }

    fn remove(&self, id: &str, options: WriteOptions) -> Result<MutationResult> {
        let mut data = self.data.lock();
        data.purge_expired(Instant::now());

        let current_cas = match data.docs.get(id) {
            Some(doc) => doc.cas,
            None => return Err(Error::DocumentNotFound { id: id.to_string() }),
        };
        if options.cas != 0 && options.cas != current_cas {
            return Err(Error::CasMismatch {
                id: id.to_string(),
                expected: options.cas,
                actual: current_cas,
            });
        }

        if let Some(doc) = data.docs.remove(id) {
            data.bytes_used -= doc.size;
        }
        let cas = data.next_cas();
        let mutation_token = data.vbuckets.record_mutation(&self.settings.name, id);
        data.write_seqno += 1;
        Ok(MutationResult {
            cas,
            mutation_token: Some(mutation_token),
        })
    }

    fn create_primary_index(&self, ignore_if_exists: bool, defer: bool) -> Result<()> {
        if !self.settings.bucket_type.supports_indexes() {
            return Err(Error::InvalidSettings(format!(
                "bucket {} does not support indexes",
                self.settings.name
            )));
        }
        let mut data = self.data.lock();
        if data.index.is_some() {
            if ignore_if_exists {
                return Ok(());
            }
            return Err(Error::protocol(format!(
                "primary index already exists on {}",
                self.settings.name
            )));
        }
        data.index = Some(PrimaryIndex::new(defer));
        // A freshly built index scans what is already there.
        if !defer {
            data.catch_up_index();
        }
        Ok(())
    }

    fn build_deferred_indexes(&self) -> Result<()> {
        let mut data = self.data.lock();
        match data.index.as_mut() {
            Some(index) => {
                index.build();
                data.catch_up_index();
                Ok(())
            }
            None => Err(Error::IndexNotFound {
                bucket: self.settings.name.clone(),
            }),
        }
    }

    fn scan(&self, predicates: &[query::BoundPredicate], consistency: ScanConsistency) -> Result<Vec<JsonObject>> {
        let mut data = self.data.lock();
        match data.index.as_ref().map(PrimaryIndex::state) {
            None => {
                return Err(Error::IndexNotFound {
                    bucket: self.settings.name.clone(),
                })
            }
            Some(IndexState::Deferred) => {
                return Err(Error::protocol(format!(
                    "primary index on {} is deferred and not yet built",
                    self.settings.name
                )))
            }
            Some(IndexState::Online) => {}
        }

        if consistency == ScanConsistency::RequestPlus || self.indexer == IndexerMode::Immediate {
            data.purge_expired(Instant::now());
            data.catch_up_index();
        }

        let index = data.index.as_ref().ok_or_else(|| Error::IndexNotFound {
            bucket: self.settings.name.clone(),
        })?;
        let rows = index
            .scan()
            .filter(|(_, content)| query::matches(content, predicates))
            .map(|(_, content)| {
                let mut row = JsonObject::new();
                row.insert(self.settings.name.clone(), Value::Object(content.clone()));
                row
            })
            .collect();
        Ok(rows)
    }
}

/// Handle to an open bucket.
///
/// Operations fail with `SessionClosed` once the owning session disconnects
/// and with `BucketNotFound` once the bucket is removed.
#[derive(Clone)]
pub struct MemoryBucket {
    state: Arc<BucketState>,
    session: Arc<SessionInner>,
}

impl MemoryBucket {
    pub(crate) fn new(state: Arc<BucketState>, session: Arc<SessionInner>) -> Self {
        Self { state, session }
    }

    /// Settings the bucket was created with.
    pub fn settings(&self) -> &BucketSettings {
        &self.state.settings
    }

    fn check(&self, op: Operation) -> Result<()> {
        self.session.guard(op)?;
        let live = self
            .session
            .node
            .buckets
            .get(&self.state.settings.name)
            .map(|b| Arc::ptr_eq(b.value(), &self.state))
            .unwrap_or(false);
        if live {
            Ok(())
        } else {
            Err(Error::BucketNotFound {
                name: self.state.settings.name.clone(),
            })
        }
    }

    /// Resolve the bucket a statement targets.
    fn target(&self, name: &str) -> Result<Arc<BucketState>> {
        if name == self.state.settings.name {
            return Ok(Arc::clone(&self.state));
        }
        self.session
            .node
            .buckets
            .get(name)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| Error::BucketNotFound {
                name: name.to_string(),
            })
    }
}

impl std::fmt::Debug for MemoryBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBucket")
            .field("name", &self.state.settings.name)
            .field("session", &self.session.id)
            .finish()
    }
}

impl BucketHandle for MemoryBucket {
    fn name(&self) -> &str {
        &self.state.settings.name
    }

    fn get(&self, id: &str) -> Result<Option<Document>> {
        self.check(Operation::Get)?;
        Ok(self.state.get(id))
    }

    fn exists(&self, id: &str) -> Result<bool> {
        self.check(Operation::Get)?;
        Ok(self.state.get(id).is_some())
    }

    fn insert(&self, id: &str, content: JsonObject, options: WriteOptions) -> Result<Document> {
        self.check(Operation::Insert)?;
        self.state.write(id, content, options, WriteMode::Insert)
    }

    fn upsert(&self, id: &str, content: JsonObject, options: WriteOptions) -> Result<Document> {
        self.check(Operation::Upsert)?;
        let doc = self.state.write(id, content, options, WriteMode::Upsert)?;
        debug!(bucket = self.name(), id, cas = doc.cas, "document upserted");
        Ok(doc)
    }

    fn replace(&self, id: &str, content: JsonObject, options: WriteOptions) -> Result<Document> {
        self.check(Operation::Replace)?;
        self.state.write(id, content, options, WriteMode::Replace)
    }

    fn remove(&self, id: &str, options: WriteOptions) -> Result<MutationResult> {
        self.check(Operation::Remove)?;
        self.state.remove(id, options)
    }

    fn create_primary_index(&self, ignore_if_exists: bool, defer: bool) -> Result<()> {
        self.check(Operation::CreateIndex)?;
        self.state.create_primary_index(ignore_if_exists, defer)
    }

    fn build_deferred_indexes(&self) -> Result<()> {
        self.check(Operation::BuildIndex)?;
        self.state.build_deferred_indexes()
    }

    fn query(&self, statement: &str, options: &QueryOptions) -> Result<QueryResult> {
        self.check(Operation::Query)?;
        let started = Instant::now();
        let select = query::parse(statement)?;
        let predicates = select.bind(options)?;
        let rows = self
            .target(&select.bucket)?
            .scan(&predicates, options.scan_consistency)?;
        debug!(
            bucket = %select.bucket,
            consistency = ?options.scan_consistency,
            rows = rows.len(),
            "query executed"
        );
        Ok(QueryResult {
            metrics: QueryMetrics {
                result_count: rows.len(),
                elapsed: started.elapsed(),
            },
            rows,
        })
    }
}
