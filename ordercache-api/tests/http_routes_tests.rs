//! HTTP read surface tests, driven through the full router.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use ordercache_api::ingest::{ConsumerConfig, StreamConsumer};
use ordercache_api::{create_router, AppState, ServerConfig, SharedStore};
use ordercache_test_utils::{
    order, sample_order, sample_order_json, NoopReportSink, OrderService, ScriptedStore,
};
use tower::ServiceExt;

const BODY_LIMIT: usize = 1024 * 1024;

async fn warmed_app(store: ScriptedStore) -> Router {
    let shared: SharedStore = Arc::new(store);
    let service = Arc::new(OrderService::new(shared));
    service.init(Duration::from_secs(5)).await.unwrap();
    create_router(AppState::new(service), &ServerConfig::default())
}

fn cold_app(store: ScriptedStore) -> Router {
    let shared: SharedStore = Arc::new(store);
    let service = Arc::new(OrderService::new(shared));
    create_router(AppState::new(service), &ServerConfig::default())
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
    (status, content_type, body.to_vec())
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

// ============================================================================
// ORDER LOOKUP
// ============================================================================

#[tokio::test]
async fn test_hit_returns_payload_verbatim() {
    let app = warmed_app(ScriptedStore::with_orders([sample_order("b563feb7b2b84b6test")])).await;

    let (status, content_type, body) = get(app.clone(), "/order?uid=b563feb7b2b84b6test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, sample_order_json("b563feb7b2b84b6test").into_bytes());

    let (status, _, path_body) = get(app, "/order/b563feb7b2b84b6test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(path_body, body);
}

#[tokio::test]
async fn test_hit_does_not_reformat_payload() {
    let raw = "{ \"order_uid\" : \"spaced\",\n  \"z\":1, \"a\":2 }";
    let app = warmed_app(ScriptedStore::with_orders([order("spaced", raw)])).await;

    let (status, _, body) = get(app, "/order/spaced").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, raw.as_bytes());
}

#[tokio::test]
async fn test_miss_is_404_without_echoing_uid() {
    let app = warmed_app(ScriptedStore::new()).await;

    let (status, _, body) = get(app, "/order?uid=secret-uid-123").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error = json(&body);
    assert_eq!(error["code"], "ORDER_NOT_FOUND");
    assert!(!String::from_utf8_lossy(&body).contains("secret-uid-123"));
}

#[tokio::test]
async fn test_uid_whitespace_is_part_of_the_key() {
    let shared: SharedStore = Arc::new(ScriptedStore::new());
    let service = Arc::new(OrderService::new(shared));
    service.init(Duration::from_secs(5)).await.unwrap();
    let consumer = StreamConsumer::new(
        Arc::clone(&service),
        Arc::new(NoopReportSink),
        ConsumerConfig::default(),
    );

    let spaced = r#"{"order_uid":" a","who":"space-a"}"#;
    let plain = r#"{"order_uid":"a","who":"plain-a"}"#;
    for payload in [spaced, plain] {
        consumer
            .handle(payload.as_bytes().to_vec(), Duration::from_secs(5))
            .await
            .unwrap();
    }
    let app = create_router(AppState::new(service), &ServerConfig::default());

    let (status, _, body) = get(app.clone(), "/order?uid=%20a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, spaced.as_bytes());

    let (status, _, body) = get(app.clone(), "/order/%20a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, spaced.as_bytes());

    let (status, _, body) = get(app.clone(), "/order?uid=a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, plain.as_bytes());

    let (status, _, _) = get(app, "/order?uid=a%20").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_uid_is_400() {
    let app = warmed_app(ScriptedStore::new()).await;

    let (status, _, body) = get(app, "/order").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = json(&body);
    assert_eq!(error["code"], "MISSING_FIELD");
    assert_eq!(error["details"]["field"], "uid");
}

#[tokio::test]
async fn test_blank_uid_is_400() {
    let app = warmed_app(ScriptedStore::new()).await;

    let (status, _, body) = get(app.clone(), "/order?uid=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["code"], "INVALID_INPUT");

    let (status, _, _) = get(app, "/order/%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lookup_never_touches_store() {
    let store = ScriptedStore::with_orders([sample_order("a")]);
    let app = warmed_app(store.clone()).await;
    store.fail_load(true);

    let (status, _, _) = get(app, "/order/a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.load_calls(), 1);
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn test_liveness() {
    let (status, _, body) = get(cold_app(ScriptedStore::new()), "/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "healthy");

    let (status, _, body) = get(cold_app(ScriptedStore::new()), "/health/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");
}

#[tokio::test]
async fn test_ready_after_warmup() {
    let app = warmed_app(ScriptedStore::with_orders([sample_order("a"), sample_order("b")])).await;

    let (status, _, body) = get(app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    let health = json(&body);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["details"]["warmed_up"], true);
    assert_eq!(health["details"]["cached_orders"], 2);
}

#[tokio::test]
async fn test_not_ready_before_warmup() {
    let (status, _, body) = get(cold_app(ScriptedStore::new()), "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["details"]["warmed_up"], false);
}

#[tokio::test]
async fn test_not_ready_when_store_unreachable() {
    let store = ScriptedStore::new();
    let app = warmed_app(store.clone()).await;
    store.fail_load(true);

    let (status, _, body) = get(app, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["details"]["durable_store"]["status"], "unhealthy");
}

// ============================================================================
// METRICS
// ============================================================================

#[tokio::test]
async fn test_metrics_exposes_cache_gauge() {
    let app = warmed_app(ScriptedStore::with_orders([sample_order("m")])).await;

    // Generate at least one recorded request first.
    let _ = get(app.clone(), "/order/m").await;
    let (status, _, body) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("ordercache_cached_orders"));
    assert!(text.contains("ordercache_http_requests_total"));
}
