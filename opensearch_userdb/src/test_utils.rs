//! Test utilities shared across unit test modules
//!
//! Every test gets its own in-memory document store, so tests do not need
//! to be serialised or clean up after themselves.

use std::sync::Arc;

use crate::storage::InMemoryDocumentStore;
use crate::userdb::{OAuthAccount, User, UserStore, UserStoreConfig};

/// A user store over a fresh in-memory backend with both indices created.
///
/// The backend is returned too so tests can inspect raw documents.
pub(crate) async fn memory_user_store(
    config: UserStoreConfig,
) -> (UserStore, Arc<InMemoryDocumentStore>) {
    let backend = Arc::new(InMemoryDocumentStore::new());
    let users = UserStore::new(backend.clone(), config);
    users
        .init()
        .await
        .expect("Failed to initialize in-memory user store");
    (users, backend)
}

/// Helper function to create a test user with a unique email
pub(crate) fn create_test_user(suffix: &str) -> User {
    let unique = uuid::Uuid::new_v4().simple().to_string();
    User::new(
        format!("user-{suffix}-{}@example.com", &unique[..8]),
        format!("hashed-password-{suffix}"),
    )
}

pub(crate) fn create_test_oauth_account(oauth_name: &str, account_id: &str) -> OAuthAccount {
    let mut account = OAuthAccount::new(
        oauth_name,
        format!("access-token-{account_id}"),
        account_id,
        format!("{account_id}@{oauth_name}.example.com"),
    );
    account.expires_at = Some(1_700_000_000);
    account.refresh_token = Some(format!("refresh-token-{account_id}"));
    account
}
