//! Integration tests for the HTTP API
//!
//! Requests go straight through the router with `tower::ServiceExt::oneshot`,
//! backed by a SQLite store in a temporary directory.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use quotebook::server::build_router;
use quotebook::storage::{open_store, NewQuote, QuoteRecord, QuoteStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    _dir: TempDir,
    store: Arc<dyn QuoteStore>,
    router: Router,
}

fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn QuoteStore> =
        Arc::new(open_store(&dir.path().join("api.db"), Duration::from_secs(5)).unwrap());
    let router = build_router(store.clone(), Duration::from_secs(10));
    TestApp {
        _dir: dir,
        store,
        router,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_list_empty_store() {
    let app = test_app();
    let (status, body) = send(&app.router, Method::GET, "/quotes", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_create_then_list() {
    let app = test_app();

    let (status, created) = send(
        &app.router,
        Method::POST,
        "/quotes",
        Some(json!({"text": "A", "author": "B", "tags": "x,y"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let created: QuoteRecord = serde_json::from_value(created).unwrap();
    assert_eq!(created.text, "A");
    assert_eq!(created.tags, "x,y");

    let (status, list) = send(&app.router, Method::GET, "/quotes", None).await;
    assert_eq!(status, StatusCode::OK);
    let list: Vec<QuoteRecord> = serde_json::from_value(list).unwrap();
    assert_eq!(list, vec![created]);
}

#[tokio::test]
async fn test_get_single_quote() {
    let app = test_app();
    let id = app.store.insert_quote(&NewQuote::new("T", "A", "")).unwrap();

    let (status, body) = send(&app.router, Method::GET, &format!("/quotes/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(id));
    assert_eq!(body["text"], json!("T"));

    let (status, body) = send(&app.router, Method::GET, "/quotes/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Quote 999 not found"}));
}

#[tokio::test]
async fn test_update_example() {
    let app = test_app();
    let id = app.store.insert_quote(&NewQuote::new("A", "B", "x,y")).unwrap();

    let (status, body) = send(
        &app.router,
        Method::PUT,
        &format!("/quotes/{}", id),
        Some(json!({"text": "A2", "author": "B", "tags": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"id": id, "text": "A2", "author": "B", "tags": "x"})
    );

    let (_, list) = send(&app.router, Method::GET, "/quotes", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["text"], json!("A2"));
}

#[tokio::test]
async fn test_update_missing_is_404() {
    let app = test_app();
    app.store.insert_quote(&NewQuote::new("A", "B", "")).unwrap();

    let (status, body) = send(
        &app.router,
        Method::PUT,
        "/quotes/42",
        Some(json!({"text": "x", "author": "y", "tags": ""})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Quote 42 not found"}));
    assert_eq!(app.store.list_quotes().unwrap()[0].text, "A");
}

#[tokio::test]
async fn test_delete_then_delete_again() {
    let app = test_app();
    let id = app.store.insert_quote(&NewQuote::new("A", "B", "")).unwrap();
    let uri = format!("/quotes/{}", id);

    let (status, body) = send(&app.router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "deleted"}));
    assert_eq!(app.store.count_quotes().unwrap(), 0);

    let (status, body) = send(&app.router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": format!("Quote {} not found", id)}));
}

#[tokio::test]
async fn test_missing_field_is_rejected() {
    let app = test_app();

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/quotes",
        Some(json!({"text": "no author"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.count_quotes().unwrap(), 0);
}

#[tokio::test]
async fn test_empty_strings_are_accepted() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/quotes",
        Some(json!({"text": "", "author": "", "tags": ""})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], json!(""));
}

#[tokio::test]
async fn test_non_numeric_id_is_rejected() {
    let app = test_app();
    let (status, _) = send(&app.router, Method::GET, "/quotes/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    app.store.insert_quote(&NewQuote::new("A", "B", "")).unwrap();

    let (status, body) = send(&app.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "quotes": 1}));
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_ids() {
    let app = test_app();

    let mut handles = Vec::new();
    for i in 0..20 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            send(
                &router,
                Method::POST,
                "/quotes",
                Some(json!({"text": format!("q{}", i), "author": "a", "tags": ""})),
            )
            .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        ids.push(body["id"].as_i64().unwrap());
    }

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(app.store.count_quotes().unwrap(), 20);
}
