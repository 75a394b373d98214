//! Convenient imports for docfixture.
//!
//! ```
//! use docfixture::prelude::*;
//! ```

// Error handling
pub use docfix_core::{Error, Result};

// Store seam
pub use docfix_core::{BucketHandle, Connector, Session};

// Core types
pub use docfix_core::{
    BucketSettings, BucketType, Document, DocumentSnapshot, Endpoint, JsonObject, MutationToken,
    QueryOptions, QueryResult, ScanConsistency, ServerVersion, WriteOptions,
};

// Fixture
pub use docfix_fixture::assertions::{
    assert_document_content, assert_document_metadata, assert_record_content,
    assert_single_list_result, assert_single_stream_result,
};
pub use docfix_fixture::{
    init_test_logging, require_ready, DocumentProcedures, FixtureConfig, FixtureContext,
    QueryResultRecord, Readiness,
};

// Simulated cluster
pub use docfix_memstore::{MemoryNetwork, MemoryNode, NodeConfig};

// Re-export serde_json for convenience
pub use serde_json::json;
