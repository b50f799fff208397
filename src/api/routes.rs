//! API Routes
//!
//! Configures the Axum router with all cache endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, fetch_handler, get_handler, health_handler, set_handler,
    storage_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /cache/:store/:key` - Read a cached value
/// - `PUT /cache/:store/:key` - Store a JSON value
/// - `DELETE /cache/:store/:key` - Remove a value from both tiers
/// - `DELETE /cache` - Clear every store
/// - `GET /storage` - Usage report against the global quota
/// - `POST /fetch` - Cache-aside upstream request
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/cache/:store/:key",
            get(get_handler).put(set_handler).delete(delete_handler),
        )
        .route("/cache", delete(clear_handler))
        .route("/storage", get(storage_handler))
        .route("/fetch", post(fetch_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
