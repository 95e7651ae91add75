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
        // Observation
        .route("/session", get(handlers::get_session))
        // Mode control
        .route("/detection/toggle", post(handlers::toggle_detection))
        .route("/recording", post(handlers::start_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        // Conversation
        .route("/chat", post(handlers::send_chat))
        .route("/history/toggle", post(handlers::toggle_history))
        .route("/audio/play", post(handlers::play_audio))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
