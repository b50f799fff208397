//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tiered_cache::{
    api::create_router,
    cache::{CacheManager, Payload},
    config::{Config, PersistentLocation},
    error::NetworkError,
    fetch::{FetchRequest, Transport},
    AppState,
};
use tower::ServiceExt;

// == Helper Functions ==

/// Answers every request with the same body.
struct EchoTransport;

#[async_trait]
impl Transport for EchoTransport {
    async fn send(&self, request: &FetchRequest) -> Result<Payload, NetworkError> {
        Ok(json!({ "url": request.url }))
    }
}

async fn create_test_app() -> Router {
    let config = Config {
        persistent: PersistentLocation::InMemory,
        ..Config::default()
    };
    let cache = CacheManager::init(&config).await.unwrap();
    create_router(AppState::new(Arc::new(cache), Arc::new(EchoTransport)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app().await;

    let response = app
        .oneshot(put_json("/cache/api/k1", r#"{"a":1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["accepted"], true);
    assert_eq!(json["store"], "api");
}

#[tokio::test]
async fn test_set_endpoint_oversized_payload_not_accepted() {
    let app = create_test_app().await;
    let blob = serde_json::to_string(&"x".repeat(1024 * 1024 + 512 * 1024)).unwrap();

    let response = app
        .oneshot(put_json("/cache/api/big", &blob))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["accepted"], false);
}

#[tokio::test]
async fn test_set_endpoint_unknown_store() {
    let app = create_test_app().await;

    let response = app
        .oneshot(put_json("/cache/videos/v1", "1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("videos"));
}

#[tokio::test]
async fn test_set_endpoint_invalid_json() {
    let app = create_test_app().await;

    let response = app
        .oneshot(put_json("/cache/api/k1", "{not json"))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_after_set() {
    let app = create_test_app().await;

    app.clone()
        .oneshot(put_json("/cache/chapters/c1", r#"{"title":"Intro"}"#))
        .await
        .unwrap();

    let response = app.oneshot(empty("GET", "/cache/chapters/c1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], json!({"title": "Intro"}));
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app().await;

    let response = app.oneshot(empty("GET", "/cache/api/missing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_get_endpoint_key_too_long() {
    let app = create_test_app().await;
    let uri = format!("/cache/api/{}", "k".repeat(300));

    let response = app.oneshot(empty("GET", &uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint() {
    let app = create_test_app().await;

    app.clone()
        .oneshot(put_json("/cache/cases/c1", r#""case""#))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty("DELETE", "/cache/cases/c1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(empty("GET", "/cache/cases/c1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_key_is_ok() {
    let app = create_test_app().await;

    let response = app
        .oneshot(empty("DELETE", "/cache/cases/never"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_clear_endpoint() {
    let app = create_test_app().await;

    for uri in ["/cache/api/a", "/cache/images/b"] {
        app.clone().oneshot(put_json(uri, "1")).await.unwrap();
    }

    let response = app.clone().oneshot(empty("DELETE", "/cache")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(empty("GET", "/storage")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total_bytes"], 0);
}

// == STORAGE Endpoint Tests ==

#[tokio::test]
async fn test_storage_endpoint() {
    let app = create_test_app().await;

    app.clone()
        .oneshot(put_json("/cache/api/k1", r#"{"a":1}"#))
        .await
        .unwrap();

    let response = app.oneshot(empty("GET", "/storage")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["persistent_bytes"], 7);
    assert_eq!(json["quota_bytes"], 50 * 1024 * 1024);
    assert!(json["total_formatted"].is_string());
    assert!(json["quota_usage_percent"].is_string());
}

// == FETCH Endpoint Tests ==

#[tokio::test]
async fn test_fetch_endpoint_caches_response() {
    let app = create_test_app().await;
    let body = r#"{"url":"https://example.com/data"}"#;

    let fetch = || {
        Request::builder()
            .method("POST")
            .uri("/fetch")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    };

    let first = app.clone().oneshot(fetch()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let json = body_to_json(first.into_body()).await;
    assert_eq!(json["source"], "network");
    assert_eq!(json["payload"]["url"], "https://example.com/data");

    let second = app.oneshot(fetch()).await.unwrap();
    let json = body_to_json(second.into_body()).await;
    assert_eq!(json["source"], "cache");
}

#[tokio::test]
async fn test_fetch_endpoint_rejects_non_http_url() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/fetch")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"url":"file:///etc/passwd"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;

    let response = app.oneshot(empty("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["persistent_tier"], true);
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = create_test_app().await;

    let response = app.oneshot(empty("GET", "/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
