use opensearch_userdb::{
    Document, DocumentStore, OpType, OpenSearchConfig, OpenSearchStore, Query, Refresh,
    StorageError,
};
use serde_json::{Value, json};

use crate::common::{MockOpenSearch, http_store};

fn doc(id: &str, value: Value) -> Document {
    Document::new(id, value.as_object().cloned().expect("Test source must be an object"))
}

#[tokio::test]
async fn test_create_index_reports_existing_index() {
    let server = MockOpenSearch::start().await;
    let store = http_store(&server.base_url);

    let first = store.create_index("user", json!({})).await;
    let second = store.create_index("user", json!({})).await;

    assert_eq!(first, Ok(true));
    assert_eq!(second, Ok(false));
}

#[tokio::test]
async fn test_get_missing_document_and_missing_index() {
    let server = MockOpenSearch::start().await;
    let store = http_store(&server.base_url);

    // Missing index is not a missing document
    match store.get("user", "1").await {
        Err(StorageError::Status {
            status, error_type, ..
        }) => {
            assert_eq!(status, 404);
            assert_eq!(error_type, "index_not_found_exception");
        }
        other => panic!("Expected Status error, got {other:?}"),
    }

    store.create_index("user", json!({})).await.unwrap();
    assert!(matches!(
        store.get("user", "1").await,
        Err(StorageError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_index_get_update_delete_over_http() {
    let server = MockOpenSearch::start().await;
    let store = http_store(&server.base_url);

    store
        .index(
            "user",
            doc("u/1", json!({ "email": "a@b.com", "is_active": true })),
            OpType::Index,
            Refresh::WaitFor,
        )
        .await
        .unwrap();

    let partial = json!({ "is_active": false }).as_object().cloned().unwrap();
    store
        .update("user", "u/1", partial, Refresh::WaitFor)
        .await
        .unwrap();

    let fetched = store.get("user", "u/1").await.unwrap();
    assert_eq!(fetched.id, "u/1");
    assert_eq!(fetched.source["email"], "a@b.com");
    assert_eq!(fetched.source["is_active"], false);

    store.delete("user", "u/1", Refresh::WaitFor).await.unwrap();
    assert!(matches!(
        store.delete("user", "u/1", Refresh::WaitFor).await,
        Err(StorageError::NotFound { .. })
    ));

    // Ids are sent as a single escaped path segment
    let writes = server.requests_to("/_doc/u%2F1");
    assert!(!writes.is_empty());
    assert!(
        writes
            .iter()
            .filter(|r| r.method == "PUT" || r.method == "DELETE")
            .all(|r| r.query.as_deref() == Some("refresh=wait_for"))
    );
}

#[tokio::test]
async fn test_update_missing_document_is_not_found() {
    let server = MockOpenSearch::start().await;
    let store = http_store(&server.base_url);
    store.create_index("user", json!({})).await.unwrap();

    let result = store
        .update("user", "ghost", Default::default(), Refresh::False)
        .await;

    assert!(matches!(result, Err(StorageError::NotFound { .. })));
}

#[tokio::test]
async fn test_create_op_type_conflict() {
    let server = MockOpenSearch::start().await;
    let store = http_store(&server.base_url);
    let document = doc("1", json!({ "email": "a@b.com" }));

    store
        .index("user", document.clone(), OpType::Create, Refresh::WaitFor)
        .await
        .unwrap();
    let result = store
        .index("user", document, OpType::Create, Refresh::WaitFor)
        .await;

    assert!(matches!(result, Err(StorageError::Conflict { .. })));
    assert_eq!(server.requests_to("/user/_create/1").len(), 2);
}

#[tokio::test]
async fn test_bulk_search_and_delete_by_query() {
    let server = MockOpenSearch::start().await;
    let store = http_store(&server.base_url);

    store
        .bulk_index(
            "oauth_account",
            vec![
                doc("a", json!({ "user_id": "u1", "oauth_name": "google", "account_id": "1" })),
                doc("b", json!({ "user_id": "u1", "oauth_name": "github", "account_id": "2" })),
                doc("c", json!({ "user_id": "u2", "oauth_name": "google", "account_id": "3" })),
            ],
            Refresh::WaitFor,
        )
        .await
        .unwrap();

    let hits = store
        .search(
            "oauth_account",
            &Query::must([
                Query::keyword("oauth_name", "google"),
                Query::keyword("account_id", "3"),
            ]),
            10,
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "c");

    let deleted = store
        .delete_by_query(
            "oauth_account",
            &Query::keyword("user_id", "u1"),
            Refresh::WaitFor,
        )
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    // delete_by_query only accepts a boolean refresh
    let requests = server.requests_to("/_delete_by_query");
    assert_eq!(requests[0].query.as_deref(), Some("refresh=true"));

    let bulk = server.requests_to("/_bulk");
    assert_eq!(bulk.len(), 1);
    assert_eq!(bulk[0].query.as_deref(), Some("refresh=wait_for"));
}

#[tokio::test]
async fn test_empty_bulk_sends_no_request() {
    let server = MockOpenSearch::start().await;
    let store = http_store(&server.base_url);

    store
        .bulk_index("oauth_account", vec![], Refresh::WaitFor)
        .await
        .unwrap();

    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_bulk_item_failures_are_reported() {
    let server = MockOpenSearch::start().await;
    let store = http_store(&server.base_url);

    let result = store
        .bulk_index(
            "oauth_account",
            vec![
                doc("ok", json!({ "user_id": "u1" })),
                doc("bad", json!({ "user_id": "u1", "reject": true })),
            ],
            Refresh::WaitFor,
        )
        .await;

    match result {
        Err(StorageError::Bulk {
            failed,
            total,
            reason,
        }) => {
            assert_eq!(failed, 1);
            assert_eq!(total, 2);
            assert!(reason.contains("bad"));
        }
        other => panic!("Expected Bulk error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let server = MockOpenSearch::start().await;
    let config = OpenSearchConfig::new(&server.base_url)
        .unwrap()
        .with_credentials("admin", "admin");
    let store = OpenSearchStore::new(config).unwrap();

    store.create_index("user", json!({})).await.unwrap();

    let requests = server.requests();
    // base64("admin:admin")
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("Basic YWRtaW46YWRtaW4=")
    );
}

#[tokio::test]
async fn test_unreachable_cluster_is_http_error() {
    // Bind then drop a listener to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let store = http_store(&format!("http://{addr}"));

    let result = store.get("user", "1").await;

    assert!(matches!(result, Err(StorageError::Http(_))));
}
