use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::UserError;
use crate::storage::Document;

/// Field on linked-account documents that points back at the owning user
pub(crate) const USER_ID_FIELD: &str = "user_id";

/// Represents a user record as the authentication framework sees it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique user identifier, also the document key
    pub id: String,
    pub email: String,
    pub hashed_password: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_verified: bool,
    /// Linked third-party logins.
    ///
    /// `None` means the record carries no linked-account information at all;
    /// `Some(vec![])` means it explicitly has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_accounts: Option<Vec<OAuthAccount>>,
    /// Framework-defined fields stored alongside the built-in ones
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl User {
    /// Create a new active, unverified user with a fresh identifier
    pub fn new(email: impl Into<String>, hashed_password: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            hashed_password: hashed_password.into(),
            is_active: true,
            is_superuser: false,
            is_verified: false,
            oauth_accounts: None,
            extra: Map::new(),
        }
    }

    pub fn with_oauth_accounts(mut self, accounts: Vec<OAuthAccount>) -> Self {
        self.oauth_accounts = Some(accounts);
        self
    }

    /// Body of the user document: every field except the key and the linked
    /// accounts, with the email lowercased for lookups.
    pub(crate) fn to_source(&self) -> Result<Map<String, Value>, UserError> {
        let mut source = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            other => {
                return Err(UserError::InvalidData(format!(
                    "User serialized to {other} instead of an object"
                )));
            }
        };
        source.remove("id");
        source.remove("oauth_accounts");
        source.insert("email".to_string(), Value::String(self.email.to_lowercase()));
        Ok(source)
    }
}

/// A third-party login linked to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthAccount {
    pub id: String,
    /// Provider name, e.g. "google"
    pub oauth_name: String,
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Account id at the provider
    pub account_id: String,
    pub account_email: String,
}

impl OAuthAccount {
    pub fn new(
        oauth_name: impl Into<String>,
        access_token: impl Into<String>,
        account_id: impl Into<String>,
        account_email: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            oauth_name: oauth_name.into(),
            access_token: access_token.into(),
            expires_at: None,
            refresh_token: None,
            account_id: account_id.into(),
            account_email: account_email.into(),
        }
    }

    /// Standalone document for this account, keyed by its own id and
    /// pointing back at `user_id`.
    pub(crate) fn to_document(&self, user_id: &str) -> Result<Document, UserError> {
        let mut source = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            other => {
                return Err(UserError::InvalidData(format!(
                    "OAuth account serialized to {other} instead of an object"
                )));
            }
        };
        source.remove("id");
        source.insert(USER_ID_FIELD.to_string(), Value::String(user_id.to_string()));
        Ok(Document::new(self.id.clone(), source))
    }
}

/// The persistence contract an authentication framework needs for its users.
///
/// Lookups that find nothing return `Ok(None)`; every other failure is an error.
#[async_trait]
pub trait UserDatabase: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<User>, UserError>;

    /// Case-insensitive lookup by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserError>;

    async fn get_by_oauth_account(
        &self,
        oauth_name: &str,
        account_id: &str,
    ) -> Result<Option<User>, UserError>;

    /// Persist a new user and its linked accounts, returning the input unchanged
    async fn create(&self, user: User) -> Result<User, UserError>;

    /// Persist changes to an existing user, returning the input unchanged
    async fn update(&self, user: User) -> Result<User, UserError>;

    async fn delete(&self, user: &User) -> Result<(), UserError>;
}
