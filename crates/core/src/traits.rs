//! Store traits.
//!
//! The fixture layer only talks to a document store through these three
//! traits. A [`Connector`] produces [`Session`]s, a session manages buckets and
//! opens [`BucketHandle`]s, and a bucket handle performs document and query
//! operations.
//!
//! All operations are synchronous. Implementations must be `Send + Sync` so
//! handles can be shared by tests that run on several threads.

use crate::bucket::BucketSettings;
use crate::document::{Document, JsonObject, MutationResult, WriteOptions};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::query::{QueryOptions, QueryResult};
use crate::version::ClusterInfo;
use std::time::Duration;

/// Opens authenticated sessions against a cluster.
pub trait Connector: Send + Sync {
    /// Session type produced by this connector
    type Session: Session;

    /// Perform one connection attempt.
    ///
    /// # Errors
    ///
    /// - `Connection` if the host cannot be resolved
    /// - `ConnectionRefused` if the host is known but not accepting yet
    /// - `Authentication` if the credentials are rejected
    fn connect(&self, endpoint: &Endpoint) -> Result<Self::Session>;
}

/// An authenticated cluster session.
///
/// After [`Session::disconnect`] every other operation fails with
/// `SessionClosed`.
pub trait Session: Send + Sync {
    /// Bucket handle type opened by this session
    type Bucket: BucketHandle;

    /// Whether the cluster has finished initialising this session.
    fn is_ready(&self) -> bool;

    /// Whether the session is still connected.
    fn is_connected(&self) -> bool;

    /// Fetch cluster information, waiting at most `timeout`.
    fn cluster_info(&self, timeout: Duration) -> Result<ClusterInfo>;

    /// Create a bucket. Fails with `BucketExists` if the name is taken.
    fn insert_bucket(&self, settings: &BucketSettings) -> Result<()>;

    /// Check whether a bucket exists.
    fn bucket_exists(&self, name: &str) -> Result<bool>;

    /// Remove a bucket and everything in it.
    fn remove_bucket(&self, name: &str) -> Result<()>;

    /// Delete every document in a bucket. Requires flush to be enabled.
    fn flush_bucket(&self, name: &str) -> Result<()>;

    /// Open a bucket for document operations.
    fn open_bucket(&self, name: &str) -> Result<Self::Bucket>;

    /// Disconnect. Calling this on a closed session is a no-op.
    fn disconnect(&self) -> Result<()>;
}

/// Document and query operations on one bucket.
pub trait BucketHandle: Send + Sync {
    /// Bucket name.
    fn name(&self) -> &str;

    /// Fetch a document.
    fn get(&self, id: &str) -> Result<Option<Document>>;

    /// Check whether a document exists.
    fn exists(&self, id: &str) -> Result<bool>;

    /// Create a document. Fails with `DocumentExists` if present.
    fn insert(&self, id: &str, content: JsonObject, options: WriteOptions) -> Result<Document>;

    /// Create or overwrite a document.
    fn upsert(&self, id: &str, content: JsonObject, options: WriteOptions) -> Result<Document>;

    /// Overwrite an existing document. Fails with `DocumentNotFound` if absent.
    fn replace(&self, id: &str, content: JsonObject, options: WriteOptions) -> Result<Document>;

    /// Remove a document. Fails with `DocumentNotFound` if absent.
    fn remove(&self, id: &str, options: WriteOptions) -> Result<MutationResult>;

    /// Create the primary index.
    ///
    /// With `ignore_if_exists` an existing index is not an error. With `defer`
    /// the index is created but not built until
    /// [`BucketHandle::build_deferred_indexes`] is called.
    fn create_primary_index(&self, ignore_if_exists: bool, defer: bool) -> Result<()>;

    /// Build indexes created with `defer`.
    fn build_deferred_indexes(&self) -> Result<()>;

    /// Run a query statement.
    fn query(&self, statement: &str, options: &QueryOptions) -> Result<QueryResult>;
}
