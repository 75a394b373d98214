//! Document procedures.
//!
//! The operations a host exposes as callable procedures, built on a
//! [`BucketHandle`]. Document bodies arrive as JSON text; results come back in
//! the shapes the assertion helpers consume.

use docfix_core::{
    BucketHandle, Document, Error, JsonObject, MutationResult, QueryOptions, Result,
    ScanConsistency, WriteOptions,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Key of the row list in [`QueryResultRecord::to_map`].
pub const QUERY_RESULT_KEY: &str = "queryResult";

/// A document as returned by the procedures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResult {
    /// Document key
    pub id: String,
    /// Expiry in seconds, 0 for none
    pub expiry: u32,
    /// CAS of this version
    pub cas: u64,
    /// Mutation token as a string-keyed map; empty if the store reports none
    pub mutation_token: JsonObject,
    /// Document body; empty after a remove
    pub content: JsonObject,
}

impl DocumentResult {
    fn removed(id: &str, result: MutationResult) -> Self {
        Self {
            id: id.to_string(),
            expiry: 0,
            cas: result.cas,
            mutation_token: result
                .mutation_token
                .map(|t| t.to_map())
                .unwrap_or_default(),
            content: JsonObject::new(),
        }
    }

    /// The result as a single map.
    pub fn to_map(&self) -> JsonObject {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => JsonObject::new(),
        }
    }
}

impl From<Document> for DocumentResult {
    fn from(doc: Document) -> Self {
        Self {
            mutation_token: doc
                .mutation_token
                .as_ref()
                .map(|t| t.to_map())
                .unwrap_or_default(),
            id: doc.id,
            expiry: doc.expiry,
            cas: doc.cas,
            content: doc.content,
        }
    }
}

/// Rows of one query execution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryResultRecord {
    /// One map per row, keyed by bucket name
    pub query_result: Vec<JsonObject>,
}

impl QueryResultRecord {
    /// `{"queryResult": [row, ...]}`
    pub fn to_map(&self) -> JsonObject {
        let rows = self.query_result.iter().cloned().map(Value::Object).collect();
        let mut map = JsonObject::new();
        map.insert(QUERY_RESULT_KEY.to_string(), Value::Array(rows));
        map
    }
}

/// Single-pass stream of query records.
///
/// A query with rows yields one record; a query without rows yields nothing.
#[derive(Debug)]
pub struct QueryStream {
    pending: Option<Vec<JsonObject>>,
}

impl QueryStream {
    fn new(rows: Vec<JsonObject>) -> Self {
        Self {
            pending: (!rows.is_empty()).then_some(rows),
        }
    }
}

impl Iterator for QueryStream {
    type Item = QueryResultRecord;

    fn next(&mut self) -> Option<QueryResultRecord> {
        self.pending
            .take()
            .map(|query_result| QueryResultRecord { query_result })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::from(self.pending.is_some());
        (n, Some(n))
    }
}

/// Procedures over one bucket.
#[derive(Debug, Clone)]
pub struct DocumentProcedures<'a, B: BucketHandle> {
    bucket: &'a B,
    consistency: ScanConsistency,
}

impl<'a, B: BucketHandle> DocumentProcedures<'a, B> {
    /// Procedures over `bucket`. Queries use `NotBounded` consistency.
    pub fn new(bucket: &'a B) -> Self {
        Self {
            bucket,
            consistency: ScanConsistency::NotBounded,
        }
    }

    /// Use `consistency` for queries.
    pub fn with_consistency(mut self, consistency: ScanConsistency) -> Self {
        self.consistency = consistency;
        self
    }

    /// Fetch a document.
    pub fn get(&self, id: &str) -> Result<Option<DocumentResult>> {
        Ok(self.bucket.get(id)?.map(DocumentResult::from))
    }

    /// Whether a document exists.
    pub fn exists(&self, id: &str) -> Result<bool> {
        self.bucket.exists(id)
    }

    /// Create a document from JSON text.
    pub fn insert(&self, id: &str, json: &str) -> Result<DocumentResult> {
        let content = parse_object(json)?;
        Ok(self.bucket.insert(id, content, WriteOptions::default())?.into())
    }

    /// Create or overwrite a document from JSON text.
    pub fn upsert(&self, id: &str, json: &str) -> Result<DocumentResult> {
        let content = parse_object(json)?;
        Ok(self.bucket.upsert(id, content, WriteOptions::default())?.into())
    }

    /// Overwrite an existing document with JSON text.
    pub fn replace(&self, id: &str, json: &str) -> Result<DocumentResult> {
        let content = parse_object(json)?;
        Ok(self.bucket.replace(id, content, WriteOptions::default())?.into())
    }

    /// Remove a document.
    pub fn remove(&self, id: &str) -> Result<DocumentResult> {
        let result = self.bucket.remove(id, WriteOptions::default())?;
        Ok(DocumentResult::removed(id, result))
    }

    /// Run a statement.
    pub fn query(&self, statement: &str) -> Result<QueryStream> {
        self.run(statement, QueryOptions::new())
    }

    /// Run a statement with `$1`, `$2`, ... parameters.
    pub fn query_with_positional_params(
        &self,
        statement: &str,
        params: Vec<Value>,
    ) -> Result<QueryStream> {
        self.run(statement, QueryOptions::new().positional(params))
    }

    /// Run a statement with `$name` parameters.
    pub fn query_with_named_params(
        &self,
        statement: &str,
        params: JsonObject,
    ) -> Result<QueryStream> {
        self.run(statement, QueryOptions::new().named(params))
    }

    fn run(&self, statement: &str, options: QueryOptions) -> Result<QueryStream> {
        let options = options.consistency(self.consistency);
        let result = self.bucket.query(statement, &options)?;
        debug!(statement, rows = result.result_count(), "procedure query");
        Ok(QueryStream::new(result.rows))
    }
}

fn parse_object(json: &str) -> Result<JsonObject> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidDocument(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}
