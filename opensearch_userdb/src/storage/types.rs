use async_trait::async_trait;
use serde_json::{Map, Value};

use super::errors::StorageError;
use super::query::Query;

/// A stored document: its key and its `_source` body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub source: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, source: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// When a write becomes visible to search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refresh {
    /// Visible after the next periodic refresh
    #[default]
    False,
    /// Force a refresh of the affected shards
    True,
    /// Block until a refresh makes the write visible
    WaitFor,
}

impl Refresh {
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::False => "false",
            Self::True => "true",
            Self::WaitFor => "wait_for",
        }
    }
}

/// How `index` treats an existing document with the same id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpType {
    /// Overwrite
    #[default]
    Index,
    /// Fail with [`StorageError::Conflict`]
    Create,
}

/// Operations the user store needs from a document-search engine.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Create an index with the given mappings. Returns false if it already existed.
    async fn create_index(&self, index: &str, mappings: Value) -> Result<bool, StorageError>;

    /// Fetch a document by id. A missing document is [`StorageError::NotFound`].
    async fn get(&self, index: &str, id: &str) -> Result<Document, StorageError>;

    /// Run a query and return at most `size` hits.
    async fn search(
        &self,
        index: &str,
        query: &Query,
        size: usize,
    ) -> Result<Vec<Document>, StorageError>;

    async fn index(
        &self,
        index: &str,
        document: Document,
        op_type: OpType,
        refresh: Refresh,
    ) -> Result<(), StorageError>;

    /// Merge `partial` into the top-level fields of an existing document.
    async fn update(
        &self,
        index: &str,
        id: &str,
        partial: Map<String, Value>,
        refresh: Refresh,
    ) -> Result<(), StorageError>;

    async fn delete(&self, index: &str, id: &str, refresh: Refresh) -> Result<(), StorageError>;

    /// Delete every matching document and return how many were removed.
    async fn delete_by_query(
        &self,
        index: &str,
        query: &Query,
        refresh: Refresh,
    ) -> Result<u64, StorageError>;

    /// Index all documents in a single request. An empty batch is a no-op.
    async fn bulk_index(
        &self,
        index: &str,
        documents: Vec<Document>,
        refresh: Refresh,
    ) -> Result<(), StorageError>;
}
