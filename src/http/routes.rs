use super::handlers;
use super::state::AppState;
use super::ws;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Listen session control
        .route("/sessions/listen/start", post(handlers::start_listening))
        .route("/sessions/listen/stop", post(handlers::stop_listening))
        // Ask-mode questions
        .route("/sessions/ask", post(handlers::ask_question))
        // Session queries
        .route("/sessions/:session_id", get(handlers::get_session))
        .route(
            "/sessions/:session_id/transcript",
            get(handlers::get_transcript),
        )
        .route("/sessions/:session_id/summary", get(handlers::get_summary))
        // Notes document
        .route("/notes/:session_id", get(handlers::get_notes))
        .route("/notes/:session_id", put(handlers::put_notes))
        // Recognizer sidecar push
        .route("/stt/events", post(handlers::push_stt_event))
        // Realtime observer channel
        .route("/ws", get(ws::ws_handler))
        // Middleware: request logging + permissive CORS for the local web UI
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
