//! Connection settings for the OpenSearch cluster

use std::{env, sync::LazyLock, time::Duration};
use url::Url;

use super::errors::StorageError;

/// Base URL of the cluster. Default: "http://localhost:9200"
pub(crate) static OPENSEARCH_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("OPENSEARCH_URL").unwrap_or_else(|_| "http://localhost:9200".to_string())
});

pub(crate) static OPENSEARCH_USERNAME: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("OPENSEARCH_USERNAME").ok());

pub(crate) static OPENSEARCH_PASSWORD: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("OPENSEARCH_PASSWORD").ok());

/// Per-request timeout in seconds. Default: 30
pub(crate) static OPENSEARCH_TIMEOUT_SECS: LazyLock<u64> = LazyLock::new(|| {
    parse_timeout_secs(env::var("OPENSEARCH_TIMEOUT_SECS").ok().as_deref())
});

fn parse_timeout_secs(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(30)
}

#[derive(Debug, Clone)]
pub struct OpenSearchConfig {
    pub url: Url,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl OpenSearchConfig {
    /// Build a configuration for `url` with no credentials and the default timeout.
    pub fn new(url: &str) -> Result<Self, StorageError> {
        Ok(Self {
            url: parse_base_url(url)?,
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
        })
    }

    pub fn from_env() -> Result<Self, StorageError> {
        Ok(Self {
            url: parse_base_url(&OPENSEARCH_URL)?,
            username: OPENSEARCH_USERNAME.clone(),
            password: OPENSEARCH_PASSWORD.clone(),
            timeout: Duration::from_secs(*OPENSEARCH_TIMEOUT_SECS),
        })
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }
}

fn parse_base_url(raw: &str) -> Result<Url, StorageError> {
    let url = Url::parse(raw)
        .map_err(|e| StorageError::Config(format!("Invalid OPENSEARCH_URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(StorageError::Config(format!(
            "Unsupported scheme '{scheme}' in OPENSEARCH_URL, expected http or https"
        ))),
    }
}
