//! Core types for docfixture
//!
//! This crate defines the vocabulary shared by every other docfixture crate:
//!
//! - [`Error`]: the error taxonomy for store and fixture operations
//! - [`Endpoint`] / [`Credentials`]: connection strings
//! - [`BucketSettings`]: ephemeral bucket configuration
//! - [`Document`], [`DocumentSnapshot`], [`MutationToken`]: documents and metadata
//! - [`QueryOptions`], [`QueryResult`], [`ScanConsistency`]: queries
//! - [`ServerVersion`], [`ClusterInfo`]: capability information
//! - [`Connector`], [`Session`], [`BucketHandle`]: the store seam

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bucket;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod query;
pub mod traits;
pub mod version;

pub use bucket::{BucketSettings, BucketSettingsBuilder, BucketType, MAX_REPLICAS, MIN_QUOTA_MB};
pub use document::{
    Document, DocumentSnapshot, JsonObject, MutationResult, MutationToken, WriteOptions,
};
pub use endpoint::{Credentials, Endpoint};
pub use error::{Error, Result};
pub use query::{QueryMetrics, QueryOptions, QueryResult, ScanConsistency};
pub use traits::{BucketHandle, Connector, Session};
pub use version::{ClusterInfo, ServerVersion};
