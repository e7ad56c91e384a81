//! API Routes
//!
//! Configures the Axum router with all proxy endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_clear_handler, cache_stats_handler, health_handler, roads_handler, roads_info_handler,
    warmup_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/roads` - Endpoint description
/// - `POST /api/roads` - Cached Overpass query
/// - `GET /api/roads/cache/stats` - Cache statistics
/// - `POST /api/roads/cache/clear` - Drop every cached region
/// - `POST /api/roads/warmup` - Pre-load regions
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin, the map mini-app is served elsewhere
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .route("/api/roads", get(roads_info_handler).post(roads_handler))
        .route("/api/roads/cache/stats", get(cache_stats_handler))
        .route("/api/roads/cache/clear", post(cache_clear_handler))
        .route("/api/roads/warmup", post(warmup_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
