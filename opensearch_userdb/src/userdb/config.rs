use std::{env, sync::LazyLock};

/// Index holding one document per user. Default: "user"
pub(crate) static USERDB_USER_INDEX: LazyLock<String> =
    LazyLock::new(|| env::var("USERDB_USER_INDEX").unwrap_or_else(|_| "user".to_string()));

/// Index holding one document per linked account. Default: "oauth_account"
pub(crate) static USERDB_OAUTH_ACCOUNT_INDEX: LazyLock<String> = LazyLock::new(|| {
    env::var("USERDB_OAUTH_ACCOUNT_INDEX").unwrap_or_else(|_| "oauth_account".to_string())
});

/// Maximum number of linked accounts loaded per user. Default: 100
pub(crate) static USERDB_OAUTH_ACCOUNTS_LIMIT: LazyLock<usize> = LazyLock::new(|| {
    parse_accounts_limit(env::var("USERDB_OAUTH_ACCOUNTS_LIMIT").ok().as_deref())
});

/// Whether deleting a user also deletes its linked accounts. Default: false
pub(crate) static USERDB_CASCADE_DELETE: LazyLock<bool> = LazyLock::new(|| {
    env::var("USERDB_CASCADE_DELETE")
        .map(|v| parse_bool(&v))
        .unwrap_or(false)
});

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Zero and unparsable values fall back to the default; a limit of zero
/// would never load any linked account.
fn parse_accounts_limit(value: Option<&str>) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&limit| limit > 0)
        .unwrap_or(100)
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserStoreConfig {
    pub user_index: String,
    pub oauth_account_index: String,
    pub oauth_accounts_limit: usize,
    pub cascade_delete: bool,
}

impl Default for UserStoreConfig {
    fn default() -> Self {
        Self {
            user_index: "user".to_string(),
            oauth_account_index: "oauth_account".to_string(),
            oauth_accounts_limit: 100,
            cascade_delete: false,
        }
    }
}

impl UserStoreConfig {
    pub fn from_env() -> Self {
        Self {
            user_index: USERDB_USER_INDEX.clone(),
            oauth_account_index: USERDB_OAUTH_ACCOUNT_INDEX.clone(),
            oauth_accounts_limit: *USERDB_OAUTH_ACCOUNTS_LIMIT,
            cascade_delete: *USERDB_CASCADE_DELETE,
        }
    }
}
