use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, header::CONTENT_TYPE};
use serde_json::{Map, Value, json};
use url::Url;

use super::config::OpenSearchConfig;
use super::errors::StorageError;
use super::query::Query;
use super::types::{Document, DocumentStore, OpType, Refresh};

/// [`DocumentStore`] backed by the OpenSearch REST API.
///
/// Connection pooling, TLS and timeouts are whatever the underlying
/// `reqwest::Client` is configured with; no retries are attempted here.
#[derive(Debug, Clone)]
pub struct OpenSearchStore {
    client: reqwest::Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl OpenSearchStore {
    pub fn new(config: OpenSearchConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        tracing::info!(url = %config.url, "Creating OpenSearch document store");

        Ok(Self {
            client,
            base_url: config.url,
            username: config.username,
            password: config.password,
        })
    }

    fn url(&self, segments: &[&str], refresh: Option<&str>) -> Result<Url, StorageError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StorageError::Config(format!("Cannot use {} as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        if let Some(refresh) = refresh {
            url.query_pairs_mut().append_pair("refresh", refresh);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.username {
            Some(username) => builder.basic_auth(username, self.password.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, Value), StorageError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok((status, body))
    }
}

/// Map a failed response to a [`StorageError`].
///
/// A 404 only means "document missing" when the body says so; a missing index
/// is also a 404 and must surface as a status error.
pub(crate) fn classify_error(
    status: StatusCode,
    body: &Value,
    index: &str,
    id: Option<&str>,
) -> StorageError {
    let error_type = body["error"]["type"].as_str().unwrap_or_default();

    if let Some(id) = id {
        let document_missing = body["found"] == Value::Bool(false)
            || body["result"] == "not_found"
            || error_type == "document_missing_exception";
        if status == StatusCode::NOT_FOUND && document_missing {
            return StorageError::not_found(index, id);
        }
        if status == StatusCode::CONFLICT {
            return StorageError::conflict(index, id);
        }
    }

    let reason = body["error"]["reason"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| match body {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

    StorageError::Status {
        status: status.as_u16(),
        error_type: if error_type.is_empty() {
            "unknown".to_string()
        } else {
            error_type.to_string()
        },
        reason,
    }
}

pub(crate) fn parse_hits(body: &Value) -> Result<Vec<Document>, StorageError> {
    let hits = body["hits"]["hits"]
        .as_array()
        .ok_or_else(|| StorageError::Serde("Search response has no hits.hits array".to_string()))?;

    hits.iter()
        .map(|hit| {
            let id = hit["_id"]
                .as_str()
                .ok_or_else(|| StorageError::Serde("Search hit has no _id".to_string()))?;
            let source = hit["_source"].as_object().cloned().unwrap_or_default();
            Ok(Document::new(id, source))
        })
        .collect()
}

pub(crate) fn bulk_body(index: &str, documents: &[Document]) -> Result<String, StorageError> {
    let mut body = String::new();
    for document in documents {
        let action = json!({ "index": { "_index": index, "_id": document.id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&document.source)?);
        body.push('\n');
    }
    Ok(body)
}

/// Collect per-item failures from a bulk response.
pub(crate) fn check_bulk_response(body: &Value, total: usize) -> Result<(), StorageError> {
    if body["errors"] != Value::Bool(true) {
        return Ok(());
    }

    let failures: Vec<String> = body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let result = item.as_object()?.values().next()?;
                    let error = result.get("error")?;
                    Some(format!(
                        "{}: {}",
                        result["_id"].as_str().unwrap_or("?"),
                        error["reason"].as_str().unwrap_or("unknown error")
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    Err(StorageError::Bulk {
        failed: failures.len(),
        total,
        reason: failures.join("; "),
    })
}

#[async_trait]
impl DocumentStore for OpenSearchStore {
    #[tracing::instrument(skip(self, mappings))]
    async fn create_index(&self, index: &str, mappings: Value) -> Result<bool, StorageError> {
        let url = self.url(&[index], None)?;
        let (status, body) = self
            .send(
                self.request(Method::PUT, url)
                    .json(&json!({ "mappings": mappings })),
            )
            .await?;

        if status.is_success() {
            tracing::info!("Created index");
            return Ok(true);
        }
        if body["error"]["type"] == "resource_already_exists_exception" {
            tracing::debug!("Index already exists");
            return Ok(false);
        }
        Err(classify_error(status, &body, index, None))
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, index: &str, id: &str) -> Result<Document, StorageError> {
        let url = self.url(&[index, "_doc", id], None)?;
        let (status, body) = self.send(self.request(Method::GET, url)).await?;

        if !status.is_success() {
            return Err(classify_error(status, &body, index, Some(id)));
        }
        let source = body["_source"].as_object().cloned().unwrap_or_default();
        Ok(Document::new(id, source))
    }

    #[tracing::instrument(skip(self, query))]
    async fn search(
        &self,
        index: &str,
        query: &Query,
        size: usize,
    ) -> Result<Vec<Document>, StorageError> {
        let url = self.url(&[index, "_search"], None)?;
        let request = json!({ "query": query.to_json(), "size": size });
        tracing::debug!(%request, "Searching");

        let (status, body) = self
            .send(self.request(Method::POST, url).json(&request))
            .await?;

        if !status.is_success() {
            return Err(classify_error(status, &body, index, None));
        }
        parse_hits(&body)
    }

    #[tracing::instrument(skip(self, document), fields(id = %document.id))]
    async fn index(
        &self,
        index: &str,
        document: Document,
        op_type: OpType,
        refresh: Refresh,
    ) -> Result<(), StorageError> {
        let endpoint = match op_type {
            OpType::Index => "_doc",
            OpType::Create => "_create",
        };
        let url = self.url(&[index, endpoint, &document.id], Some(refresh.as_param()))?;
        let (status, body) = self
            .send(self.request(Method::PUT, url).json(&document.source))
            .await?;

        if !status.is_success() {
            return Err(classify_error(status, &body, index, Some(&document.id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, partial))]
    async fn update(
        &self,
        index: &str,
        id: &str,
        partial: Map<String, Value>,
        refresh: Refresh,
    ) -> Result<(), StorageError> {
        let url = self.url(&[index, "_update", id], Some(refresh.as_param()))?;
        let (status, body) = self
            .send(
                self.request(Method::POST, url)
                    .json(&json!({ "doc": partial })),
            )
            .await?;

        if !status.is_success() {
            return Err(classify_error(status, &body, index, Some(id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, index: &str, id: &str, refresh: Refresh) -> Result<(), StorageError> {
        let url = self.url(&[index, "_doc", id], Some(refresh.as_param()))?;
        let (status, body) = self.send(self.request(Method::DELETE, url)).await?;

        if !status.is_success() {
            return Err(classify_error(status, &body, index, Some(id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, query))]
    async fn delete_by_query(
        &self,
        index: &str,
        query: &Query,
        refresh: Refresh,
    ) -> Result<u64, StorageError> {
        // _delete_by_query only understands a boolean refresh
        let refresh = match refresh {
            Refresh::False => "false",
            Refresh::True | Refresh::WaitFor => "true",
        };
        let url = self.url(&[index, "_delete_by_query"], Some(refresh))?;
        let (status, body) = self
            .send(
                self.request(Method::POST, url)
                    .json(&json!({ "query": query.to_json() })),
            )
            .await?;

        if !status.is_success() {
            return Err(classify_error(status, &body, index, None));
        }

        let deleted = body["deleted"].as_u64().unwrap_or_default();
        if let Some(failures) = body["failures"].as_array().filter(|f| !f.is_empty()) {
            return Err(StorageError::Bulk {
                failed: failures.len(),
                total: body["total"].as_u64().unwrap_or_default() as usize,
                reason: Value::Array(failures.clone()).to_string(),
            });
        }

        tracing::debug!(deleted, "Deleted by query");
        Ok(deleted)
    }

    #[tracing::instrument(skip(self, documents), fields(count = documents.len()))]
    async fn bulk_index(
        &self,
        index: &str,
        documents: Vec<Document>,
        refresh: Refresh,
    ) -> Result<(), StorageError> {
        if documents.is_empty() {
            return Ok(());
        }

        let url = self.url(&["_bulk"], Some(refresh.as_param()))?;
        let payload = bulk_body(index, &documents)?;
        let (status, body) = self
            .send(
                self.request(Method::POST, url)
                    .header(CONTENT_TYPE, "application/x-ndjson")
                    .body(payload),
            )
            .await?;

        if !status.is_success() {
            return Err(classify_error(status, &body, index, None));
        }
        check_bulk_response(&body, documents.len())
    }
}
