//! Query request and result types.

use crate::document::JsonObject;
use serde_json::Value;
use std::time::Duration;

/// Read consistency requested for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanConsistency {
    /// Use whatever the index currently holds (may miss recent writes)
    #[default]
    NotBounded,
    /// Wait until the index covers every write completed before the request
    RequestPlus,
}

/// Options attached to a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Scan consistency
    pub scan_consistency: ScanConsistency,
    /// Positional parameters bound to `$1`, `$2`, ...
    pub positional: Vec<Value>,
    /// Named parameters bound to `$name`
    pub named: JsonObject,
}

impl QueryOptions {
    /// Default options (not bounded, no parameters).
    pub fn new() -> Self {
        Self::default()
    }

    /// Request read-your-writes consistency.
    pub fn request_plus() -> Self {
        Self::default().consistency(ScanConsistency::RequestPlus)
    }

    /// Set the scan consistency.
    pub fn consistency(mut self, consistency: ScanConsistency) -> Self {
        self.scan_consistency = consistency;
        self
    }

    /// Set positional parameters.
    pub fn positional(mut self, params: Vec<Value>) -> Self {
        self.positional = params;
        self
    }

    /// Set named parameters. Leading `$` on names is optional.
    pub fn named(mut self, params: JsonObject) -> Self {
        self.named = params
            .into_iter()
            .map(|(k, v)| (k.trim_start_matches('$').to_string(), v))
            .collect();
        self
    }
}

/// Execution metrics reported with a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryMetrics {
    /// Number of rows returned
    pub result_count: usize,
    /// Wall time spent executing
    pub elapsed: Duration,
}

/// Rows returned by a query.
///
/// For `SELECT *` every row is a single-entry map keyed by the bucket name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    /// Result rows
    pub rows: Vec<JsonObject>,
    /// Metrics
    pub metrics: QueryMetrics,
}

impl QueryResult {
    /// Number of rows, as reported by the server.
    pub fn result_count(&self) -> usize {
        self.metrics.result_count
    }
}
