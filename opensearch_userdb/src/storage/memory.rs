use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::errors::StorageError;
use super::query::Query;
use super::types::{Document, DocumentStore, OpType, Refresh};

type Index = BTreeMap<String, Map<String, Value>>;

/// Document store kept in process memory.
///
/// Writes are visible immediately whatever [`Refresh`] is requested. Like the
/// search engine, indexing into an unknown index creates it, while reading,
/// updating or deleting from one is an `index_not_found_exception`.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    indices: RwLock<HashMap<String, Index>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory document store");
        Self::default()
    }

    fn index_not_found(index: &str) -> StorageError {
        StorageError::Status {
            status: 404,
            error_type: "index_not_found_exception".to_string(),
            reason: format!("no such index [{index}]"),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_index(&self, index: &str, _mappings: Value) -> Result<bool, StorageError> {
        let mut indices = self.indices.write().await;
        if indices.contains_key(index) {
            return Ok(false);
        }
        indices.insert(index.to_string(), Index::new());
        Ok(true)
    }

    async fn get(&self, index: &str, id: &str) -> Result<Document, StorageError> {
        let indices = self.indices.read().await;
        let docs = indices
            .get(index)
            .ok_or_else(|| Self::index_not_found(index))?;
        docs.get(id)
            .map(|source| Document::new(id, source.clone()))
            .ok_or_else(|| StorageError::not_found(index, id))
    }

    async fn search(
        &self,
        index: &str,
        query: &Query,
        size: usize,
    ) -> Result<Vec<Document>, StorageError> {
        let indices = self.indices.read().await;
        let docs = indices
            .get(index)
            .ok_or_else(|| Self::index_not_found(index))?;
        Ok(docs
            .iter()
            .filter(|(_, source)| query.matches(source))
            .take(size)
            .map(|(id, source)| Document::new(id.clone(), source.clone()))
            .collect())
    }

    async fn index(
        &self,
        index: &str,
        document: Document,
        op_type: OpType,
        _refresh: Refresh,
    ) -> Result<(), StorageError> {
        let mut indices = self.indices.write().await;
        let docs = indices.entry(index.to_string()).or_default();
        if op_type == OpType::Create && docs.contains_key(&document.id) {
            return Err(StorageError::conflict(index, &document.id));
        }
        docs.insert(document.id, document.source);
        Ok(())
    }

    async fn update(
        &self,
        index: &str,
        id: &str,
        partial: Map<String, Value>,
        _refresh: Refresh,
    ) -> Result<(), StorageError> {
        let mut indices = self.indices.write().await;
        let source = indices
            .get_mut(index)
            .ok_or_else(|| Self::index_not_found(index))?
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(index, id))?;
        source.extend(partial);
        Ok(())
    }

    async fn delete(&self, index: &str, id: &str, _refresh: Refresh) -> Result<(), StorageError> {
        let mut indices = self.indices.write().await;
        indices
            .get_mut(index)
            .ok_or_else(|| Self::index_not_found(index))?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(index, id))
    }

    async fn delete_by_query(
        &self,
        index: &str,
        query: &Query,
        _refresh: Refresh,
    ) -> Result<u64, StorageError> {
        let mut indices = self.indices.write().await;
        let docs = indices
            .get_mut(index)
            .ok_or_else(|| Self::index_not_found(index))?;
        let before = docs.len();
        docs.retain(|_, source| !query.matches(source));
        Ok((before - docs.len()) as u64)
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: Vec<Document>,
        _refresh: Refresh,
    ) -> Result<(), StorageError> {
        if documents.is_empty() {
            return Ok(());
        }
        let mut indices = self.indices.write().await;
        let docs = indices.entry(index.to_string()).or_default();
        for document in documents {
            docs.insert(document.id, document.source);
        }
        Ok(())
    }
}
