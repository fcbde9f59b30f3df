use thiserror::Error;

use crate::storage::StorageError;

#[derive(Clone, Error, Debug)]
pub enum UserError {
    #[error("User with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Failure reported by the document store, passed through untouched
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<serde_json::Error> for UserError {
    fn from(err: serde_json::Error) -> Self {
        UserError::InvalidData(err.to_string())
    }
}
