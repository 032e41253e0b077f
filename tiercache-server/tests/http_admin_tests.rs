// Admin REST surface tests
// Drives the router in-process with tower::ServiceExt::oneshot

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tiercache_server::{AppState, CacheConfig, L2CacheConfig, TieredCache, create_router};
use tower::ServiceExt;

fn memory_cache() -> Arc<TieredCache> {
    Arc::new(TieredCache::new(CacheConfig {
        l1_max_entries: 10,
        l2: L2CacheConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }))
}

async fn send(app: axum::Router, method: &str, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("x-admin-token", token);
    }
    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(AppState::new(memory_cache(), None));
    let (status, body) = send(app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "tiercache");
}

#[tokio::test]
async fn test_stats_and_keys() {
    let cache = memory_cache();
    cache.set("user:1", vec![1], None);
    cache.set("user:2", vec![2], None);
    cache.get("user:1");

    let app = create_router(AppState::new(Arc::clone(&cache), None));

    let (status, stats) = send(app.clone(), "GET", "/cache/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["l1"]["size"], 2);
    assert_eq!(stats["l1"]["hits"], 1);
    assert!(stats["l2"].is_null());

    let (_, keys) = send(app, "GET", "/cache/keys", None).await;
    assert_eq!(keys["count"], 2);
    assert_eq!(keys["keys"], serde_json::json!(["user:1", "user:2"]));
}

#[tokio::test]
async fn test_health_route_reports_status() {
    let cache = memory_cache();
    for i in 0..10 {
        cache.set(&format!("k{}", i), vec![0], None);
    }
    let app = create_router(AppState::new(cache, None));

    let (status, health) = send(app, "GET", "/cache/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["l1_status"], "full");
    assert_eq!(health["l2_status"], "disabled");
}

#[tokio::test]
async fn test_delete_key_and_pattern() {
    let cache = memory_cache();
    cache.set("user:1", vec![1], None);
    cache.set("user:2", vec![2], None);
    cache.set("order:1", vec![3], None);
    let app = create_router(AppState::new(Arc::clone(&cache), None));

    let (status, body) = send(app.clone(), "DELETE", "/cache/keys/order:1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, body) = send(app, "DELETE", "/cache/pattern/user:*", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);
    assert!(cache.keys().is_empty());
}

#[tokio::test]
async fn test_clear_and_warm() {
    let cache = memory_cache();
    cache.set("stale", vec![1], None);
    let app = create_router(AppState::new(Arc::clone(&cache), None));

    let (status, _) = send(app.clone(), "DELETE", "/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cache.keys().is_empty());

    let (status, body) = send(app, "POST", "/cache/warm", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warmed"].as_array().unwrap().len(), 3);
    assert!(cache.keys().contains(&"system:version".to_string()));
}

#[tokio::test]
async fn test_admin_token_required_when_configured() {
    let app = create_router(AppState::new(memory_cache(), Some("s3cret".to_string())));

    let (status, body) = send(app.clone(), "GET", "/cache/stats", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);

    let (status, _) = send(app.clone(), "GET", "/cache/stats", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(app.clone(), "GET", "/cache/stats", Some("s3creT")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(app.clone(), "GET", "/cache/stats", Some("s3cret")).await;
    assert_eq!(status, StatusCode::OK);

    // Liveness stays open
    let (status, _) = send(app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let cache = memory_cache();
    cache.get("nothing");
    let app = create_router(AppState::new(cache, None));

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(text.to_vec()).unwrap();
    assert!(text.contains("tiercache_operations_total"));
}
