use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Interview queries
        .route("/interview/status", get(handlers::get_status))
        .route("/interview/log", get(handlers::get_log))
        // Operator controls
        .route("/interview/override/:action", post(handlers::post_override))
        .route("/interview/abandon", post(handlers::post_abandon))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
