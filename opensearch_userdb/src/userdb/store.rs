use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::storage::{Document, DocumentStore, OpType, Query, Refresh, StorageError};
use crate::userdb::{
    config::UserStoreConfig,
    email_lock::EmailLocks,
    errors::UserError,
    types::{OAuthAccount, USER_ID_FIELD, User, UserDatabase},
};

/// Stores users and their linked accounts in two document-search indices.
///
/// Users live in the user index keyed by id. Linked accounts live in their own
/// index, keyed by account id and tied to the user only through a `user_id`
/// field, so they are looked up with a query whenever a user is assembled.
pub struct UserStore {
    store: Arc<dyn DocumentStore>,
    user_index: String,
    oauth_account_index: String,
    oauth_accounts_limit: usize,
    cascade_delete: bool,
    email_locks: EmailLocks,
}

fn keyword_text() -> Value {
    json!({
        "type": "text",
        "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
    })
}

impl UserStore {
    pub fn new(store: Arc<dyn DocumentStore>, config: UserStoreConfig) -> Self {
        Self {
            store,
            user_index: config.user_index,
            oauth_account_index: config.oauth_account_index,
            oauth_accounts_limit: config.oauth_accounts_limit.max(1),
            cascade_delete: config.cascade_delete,
            email_locks: EmailLocks::default(),
        }
    }

    /// Create both indices with keyword sub-fields on every queried field.
    /// Existing indices are left as they are.
    pub async fn init(&self) -> Result<(), UserError> {
        let user_mappings = json!({
            "properties": { "email": keyword_text() }
        });
        let oauth_mappings = json!({
            "properties": {
                (USER_ID_FIELD): keyword_text(),
                "oauth_name": keyword_text(),
                "account_id": keyword_text(),
            }
        });

        let created = self
            .store
            .create_index(&self.user_index, user_mappings)
            .await?;
        tracing::info!(index = %self.user_index, created, "User index ready");

        let created = self
            .store
            .create_index(&self.oauth_account_index, oauth_mappings)
            .await?;
        tracing::info!(index = %self.oauth_account_index, created, "OAuth account index ready");

        Ok(())
    }

    /// Raw user document for an already lowercased email
    async fn find_by_email(&self, email: &str) -> Result<Option<Document>, UserError> {
        let hits = self
            .store
            .search(&self.user_index, &Query::keyword("email", email), 2)
            .await?;

        if hits.len() > 1 {
            tracing::warn!(
                user_ids = ?hits.iter().map(|h| &h.id).collect::<Vec<_>>(),
                "Several users share one email, using the first"
            );
        }
        Ok(hits.into_iter().next())
    }

    /// Assemble a user from its document and the linked accounts pointing at it.
    ///
    /// When no linked accounts exist the `oauth_accounts` field stays absent
    /// rather than becoming an empty list.
    #[tracing::instrument(skip(self, source))]
    async fn make_user(
        &self,
        id: &str,
        mut source: Map<String, Value>,
    ) -> Result<User, UserError> {
        source.insert("id".to_string(), Value::String(id.to_string()));

        let hits = self
            .store
            .search(
                &self.oauth_account_index,
                &Query::keyword(USER_ID_FIELD, id),
                self.oauth_accounts_limit,
            )
            .await?;

        if hits.len() == self.oauth_accounts_limit {
            tracing::warn!(
                limit = self.oauth_accounts_limit,
                "Linked account list may be truncated"
            );
        }

        if !hits.is_empty() {
            let accounts = hits
                .into_iter()
                .map(|hit| {
                    let mut account = hit.source;
                    account.insert("id".to_string(), Value::String(hit.id));
                    Value::Object(account)
                })
                .collect();
            source.insert("oauth_accounts".to_string(), Value::Array(accounts));
        }

        Ok(serde_json::from_value(Value::Object(source))?)
    }

    fn oauth_documents(
        user_id: &str,
        accounts: &[OAuthAccount],
    ) -> Result<Vec<Document>, UserError> {
        accounts
            .iter()
            .map(|account| account.to_document(user_id))
            .collect()
    }
}

#[async_trait]
impl UserDatabase for UserStore {
    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn get(&self, id: &str) -> Result<Option<User>, UserError> {
        let document = match self.store.get(&self.user_index, id).await {
            Ok(document) => document,
            Err(StorageError::NotFound { .. }) => {
                tracing::info!(found = false, "User lookup completed - not found");
                return Ok(None);
            }
            Err(e) => {
                tracing::error!(error = %e, "User lookup failed");
                return Err(e.into());
            }
        };

        let user = self.make_user(&document.id, document.source).await?;
        tracing::info!(found = true, "User lookup completed");
        Ok(Some(user))
    }

    #[tracing::instrument(skip(self, email))]
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let email = email.to_lowercase();
        tracing::debug!(%email, "Looking up user by email");

        match self.find_by_email(&email).await? {
            Some(document) => {
                tracing::info!(user_id = %document.id, "User found by email");
                Ok(Some(self.make_user(&document.id, document.source).await?))
            }
            None => {
                tracing::info!(found = false, "No user with this email");
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_oauth_account(
        &self,
        oauth_name: &str,
        account_id: &str,
    ) -> Result<Option<User>, UserError> {
        let query = Query::must([
            Query::keyword("oauth_name", oauth_name),
            Query::keyword("account_id", account_id),
        ]);
        let hits = self
            .store
            .search(&self.oauth_account_index, &query, 2)
            .await?;

        if hits.len() > 1 {
            tracing::warn!("Several linked accounts share one provider account, using the first");
        }
        let Some(hit) = hits.into_iter().next() else {
            tracing::info!(found = false, "No linked account matches");
            return Ok(None);
        };

        let user_id = hit.source.get(USER_ID_FIELD).and_then(Value::as_str).ok_or_else(|| {
            UserError::InvalidData(format!("Linked account {} has no {USER_ID_FIELD}", hit.id))
        })?;

        let user = self.get(user_id).await?;
        if user.is_none() {
            tracing::warn!(
                account = %hit.id,
                %user_id,
                "Linked account points at a user that does not exist"
            );
        }
        Ok(user)
    }

    /// The email check and the write are serialised per email inside this
    /// process only; concurrent creates from other processes can still race.
    /// The user document is written before its linked accounts, so a failed
    /// account write leaves the user stored without them and a retry reports
    /// [`UserError::DuplicateEmail`].
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create(&self, user: User) -> Result<User, UserError> {
        let email = user.email.to_lowercase();
        let _guard = self.email_locks.lock(&email).await;

        if let Some(existing) = self.find_by_email(&email).await? {
            tracing::warn!(existing_user_id = %existing.id, "Email already registered");
            return Err(UserError::DuplicateEmail(email));
        }

        let document = Document::new(user.id.clone(), user.to_source()?);
        self.store
            .index(&self.user_index, document, OpType::Create, Refresh::WaitFor)
            .await?;

        if let Some(accounts) = &user.oauth_accounts {
            let documents = Self::oauth_documents(&user.id, accounts)?;
            self.store
                .bulk_index(&self.oauth_account_index, documents, Refresh::WaitFor)
                .await?;
        }

        tracing::info!(
            oauth_accounts = user.oauth_accounts.as_ref().map(Vec::len),
            "User created"
        );
        Ok(user)
    }

    /// Linked accounts are replaced in two steps: every existing one is deleted,
    /// then the new set is written. There is no transaction around the pair, so
    /// a failure in between leaves the user with no linked accounts until the
    /// update is retried. Accounts are only touched when `oauth_accounts` is
    /// `Some`; the user fields are then merged into the stored document.
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: User) -> Result<User, UserError> {
        if let Some(accounts) = &user.oauth_accounts {
            let removed = self
                .store
                .delete_by_query(
                    &self.oauth_account_index,
                    &Query::keyword(USER_ID_FIELD, &user.id),
                    Refresh::WaitFor,
                )
                .await?;
            tracing::debug!(removed, "Removed previous linked accounts");

            let documents = Self::oauth_documents(&user.id, accounts)?;
            self.store
                .bulk_index(&self.oauth_account_index, documents, Refresh::WaitFor)
                .await?;
        }

        self.store
            .update(&self.user_index, &user.id, user.to_source()?, Refresh::WaitFor)
            .await?;

        tracing::info!("User updated");
        Ok(user)
    }

    /// Linked accounts are left in place unless cascading deletes are enabled.
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn delete(&self, user: &User) -> Result<(), UserError> {
        self.store
            .delete(&self.user_index, &user.id, Refresh::WaitFor)
            .await?;

        if self.cascade_delete {
            let removed = self
                .store
                .delete_by_query(
                    &self.oauth_account_index,
                    &Query::keyword(USER_ID_FIELD, &user.id),
                    Refresh::WaitFor,
                )
                .await?;
            tracing::info!(removed, "User and linked accounts deleted");
        } else {
            tracing::info!("User deleted, linked accounts kept");
        }
        Ok(())
    }
}
