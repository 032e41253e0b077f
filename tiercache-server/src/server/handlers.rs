use crate::cache::{self, CacheHealth, CacheStats, TieredCache};
use crate::core::CacheError;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TieredCache>,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(cache: Arc<TieredCache>, admin_token: Option<String>) -> Self {
        Self {
            cache,
            admin_token: admin_token.map(Arc::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KeysResponse {
    pub count: usize,
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct PatternDeleteResponse {
    pub pattern: String,
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
pub struct WarmResponse {
    pub warmed: Vec<String>,
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "tiercache",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    debug!("REST CACHE STATS");
    Json(state.cache.stats())
}

/// GET /cache/health
pub async fn cache_health(State(state): State<AppState>) -> Json<CacheHealth> {
    debug!("REST CACHE HEALTH");
    Json(state.cache.health())
}

/// GET /cache/keys
pub async fn cache_keys(State(state): State<AppState>) -> Json<KeysResponse> {
    let keys = state.cache.keys();
    Json(KeysResponse {
        count: keys.len(),
        keys,
    })
}

/// DELETE /cache/keys/{key}
pub async fn cache_delete(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    debug!("REST CACHE DELETE key={}", key);
    let deleted = state.cache.delete(&key);
    Json(DeleteResponse { deleted, key })
}

/// DELETE /cache/pattern/{pattern}
pub async fn cache_delete_pattern(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Result<Json<PatternDeleteResponse>, CacheError> {
    let deleted = state.cache.delete_pattern(&pattern)?;
    Ok(Json(PatternDeleteResponse { pattern, deleted }))
}

/// DELETE /cache
pub async fn cache_clear(State(state): State<AppState>) -> Json<serde_json::Value> {
    info!("REST CACHE CLEAR");
    state.cache.clear();
    Json(serde_json::json!({ "cleared": true }))
}

/// POST /cache/warm
pub async fn cache_warm(State(state): State<AppState>) -> Json<WarmResponse> {
    let warmed = cache::warm(&state.cache);
    Json(WarmResponse { warmed })
}
