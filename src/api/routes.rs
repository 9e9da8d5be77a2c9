//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Chat endpoints
        .route("/chat", post(handlers::chat))
        .route("/chat/stream", post(handlers::chat_stream))
        // Location
        .route("/geocode", post(handlers::geocode))
        // Raw retrieval
        .route("/search", post(handlers::search))
        .with_state(state)
}
