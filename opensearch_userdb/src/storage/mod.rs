mod config;
mod errors;
mod memory;
mod opensearch;
mod query;
mod types;

pub use config::OpenSearchConfig;
pub use errors::StorageError;
pub use memory::InMemoryDocumentStore;
pub use opensearch::OpenSearchStore;
pub use query::Query;
pub use types::{Document, DocumentStore, OpType, Refresh};
