use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("Document not found: {index}/{id}")]
    NotFound { index: String, id: String },

    #[error("Document already exists: {index}/{id}")]
    Conflict { index: String, id: String },

    #[error("Search engine returned {status} ({error_type}): {reason}")]
    Status {
        status: u16,
        error_type: String,
        reason: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Bulk write failed for {failed} of {total} documents: {reason}")]
    Bulk {
        failed: usize,
        total: usize,
        reason: String,
    },

    #[error("Json conversion(Serde) error: {0}")]
    Serde(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StorageError {
    pub(crate) fn not_found(index: &str, id: &str) -> Self {
        Self::NotFound {
            index: index.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(index: &str, id: &str) -> Self {
        Self::Conflict {
            index: index.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}
