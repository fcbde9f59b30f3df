//! Test data shared by the integration tests

use opensearch_userdb::{OAuthAccount, OpenSearchConfig, OpenSearchStore, User};

pub fn test_user(name: &str) -> User {
    let unique = uuid::Uuid::new_v4().simple().to_string();
    User::new(
        format!("{name}-{}@Camelot.example", &unique[..8]),
        format!("hashed-{name}"),
    )
}

pub fn test_oauth_account(oauth_name: &str, account_id: &str) -> OAuthAccount {
    let mut account = OAuthAccount::new(
        oauth_name,
        format!("access-{account_id}"),
        account_id,
        format!("{account_id}@{oauth_name}.example"),
    );
    account.refresh_token = Some(format!("refresh-{account_id}"));
    account
}

pub fn http_store(base_url: &str) -> OpenSearchStore {
    let config = OpenSearchConfig::new(base_url).expect("Mock server URL should be valid");
    OpenSearchStore::new(config).expect("Failed to build OpenSearch store")
}
