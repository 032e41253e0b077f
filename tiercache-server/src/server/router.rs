use super::admin_auth::require_admin;
use super::handlers::{self, AppState};
use super::metrics_handler::metrics_handler;
use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the Axum router with all endpoints
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Cache administration, guarded by the admin token
    let admin = Router::new()
        .route("/cache", delete(handlers::cache_clear))
        .route("/cache/stats", get(handlers::cache_stats))
        .route("/cache/health", get(handlers::cache_health))
        .route("/cache/keys", get(handlers::cache_keys))
        .route("/cache/keys/{key}", delete(handlers::cache_delete))
        .route(
            "/cache/pattern/{pattern}",
            delete(handlers::cache_delete_pattern),
        )
        .route("/cache/warm", post(handlers::cache_warm))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(metrics_handler))
        .merge(admin)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
