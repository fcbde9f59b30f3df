//! opensearch_userdb - User storage for authentication frameworks on OpenSearch
//!
//! Users and their linked OAuth accounts are kept in two indices and
//! reassembled on read. [`UserStore`] implements the [`UserDatabase`]
//! contract on top of any [`DocumentStore`]; [`OpenSearchStore`] talks to a
//! cluster over HTTP and [`InMemoryDocumentStore`] keeps everything in process.

mod storage;
mod userdb;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

pub use storage::{
    Document, DocumentStore, InMemoryDocumentStore, OpType, OpenSearchConfig, OpenSearchStore,
    Query, Refresh, StorageError,
};
pub use userdb::{OAuthAccount, User, UserDatabase, UserError, UserStore, UserStoreConfig};

/// Build a [`UserStore`] against the cluster described by the environment
/// (`.env` is loaded first) and make sure its indices exist.
pub async fn init() -> Result<UserStore, UserError> {
    dotenvy::dotenv().ok();

    let store = OpenSearchStore::new(OpenSearchConfig::from_env()?)?;
    let users = UserStore::new(Arc::new(store), UserStoreConfig::from_env());
    users.init().await?;

    Ok(users)
}
