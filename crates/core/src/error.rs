//! Error types for document-store operations.
//!
//! Every store, fixture and configuration failure is reported through the
//! single [`Error`] enum. The fixture layer classifies errors into three
//! groups when deciding what to do with them:
//!
//! | Group | Variants | Fixture behaviour |
//! |-------|----------|-------------------|
//! | Store unavailable | `Timeout`, `Protocol` | absorbed, readiness downgraded |
//! | Not found | `BucketNotFound`, `DocumentNotFound` | absorbed during teardown |
//! | Everything else | all other variants | propagated |

use std::time::Duration;
use thiserror::Error;

/// All document-store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The cluster could not be reached at all (unresolvable host, bad route)
    #[error("connection to {endpoint} failed: {reason}")]
    Connection {
        /// Host or endpoint that was contacted
        endpoint: String,
        /// Reason reported by the transport
        reason: String,
    },

    /// The host exists but is not accepting connections yet
    #[error("connection to {endpoint} refused")]
    ConnectionRefused {
        /// Host or endpoint that was contacted
        endpoint: String,
    },

    /// The cluster rejected the supplied credentials
    #[error("authentication failed for user {user}")]
    Authentication {
        /// User name that was rejected
        user: String,
    },

    /// A bounded wait expired
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// Operation that was waiting
        operation: String,
        /// How long the caller waited
        after: Duration,
    },

    /// A bucket with this name already exists
    #[error("bucket already exists: {name}")]
    BucketExists {
        /// Bucket name
        name: String,
    },

    /// Generic backend fault reported by the store
    #[error("store protocol error: {message}")]
    Protocol {
        /// Server-provided message
        message: String,
    },

    /// Bucket does not exist
    #[error("bucket not found: {name}")]
    BucketNotFound {
        /// Bucket name
        name: String,
    },

    /// Document does not exist
    #[error("document not found: {id}")]
    DocumentNotFound {
        /// Document id
        id: String,
    },

    /// Document already exists (insert)
    #[error("document already exists: {id}")]
    DocumentExists {
        /// Document id
        id: String,
    },

    /// Supplied CAS does not match the stored document
    #[error("cas mismatch on {id}: expected {expected}, found {actual}")]
    CasMismatch {
        /// Document id
        id: String,
        /// CAS supplied by the caller
        expected: u64,
        /// CAS currently stored
        actual: u64,
    },

    /// A query needed an index that does not exist
    #[error("no primary index on bucket {bucket}")]
    IndexNotFound {
        /// Bucket name
        bucket: String,
    },

    /// Endpoint string could not be parsed
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// Bucket settings rejected by the cluster
    #[error("invalid bucket settings: {0}")]
    InvalidSettings(String),

    /// Document body is not a JSON object
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Query statement or parameters rejected
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Bucket memory quota exhausted
    #[error("bucket {bucket} quota exceeded")]
    QuotaExceeded {
        /// Bucket name
        bucket: String,
    },

    /// Operation attempted on a disconnected session
    #[error("session is closed")]
    SessionClosed,

    /// Fixture configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for document-store operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a timeout error for `operation`.
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Build a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol {
            message: message.into(),
        }
    }

    /// Check if this error means "the store is not usable right now".
    ///
    /// Only timeouts and generic protocol faults qualify. Authentication
    /// failures and duplicate buckets are deliberate fail-fast conditions.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Protocol { .. })
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::BucketNotFound { .. } | Error::DocumentNotFound { .. }
        )
    }

    /// Check if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ConnectionRefused { .. } | Error::Timeout { .. } | Error::CasMismatch { .. }
        )
    }

    /// Short stable name of the error kind, used in logs and readiness reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Connection { .. } => "Connection",
            Error::ConnectionRefused { .. } => "ConnectionRefused",
            Error::Authentication { .. } => "Authentication",
            Error::Timeout { .. } => "Timeout",
            Error::BucketExists { .. } => "BucketExists",
            Error::Protocol { .. } => "Protocol",
            Error::BucketNotFound { .. } => "BucketNotFound",
            Error::DocumentNotFound { .. } => "DocumentNotFound",
            Error::DocumentExists { .. } => "DocumentExists",
            Error::CasMismatch { .. } => "CasMismatch",
            Error::IndexNotFound { .. } => "IndexNotFound",
            Error::InvalidEndpoint { .. } => "InvalidEndpoint",
            Error::InvalidSettings(_) => "InvalidSettings",
            Error::InvalidDocument(_) => "InvalidDocument",
            Error::InvalidQuery(_) => "InvalidQuery",
            Error::QuotaExceeded { .. } => "QuotaExceeded",
            Error::SessionClosed => "SessionClosed",
            Error::Config(_) => "Config",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidDocument(e.to_string())
    }
}
