//! HTTP API + WebSocket boundary
//!
//! This module exposes the core over REST and a realtime observer socket:
//! - POST /sessions/listen/start | /sessions/listen/stop - session control
//! - POST /sessions/ask - ask-mode questions
//! - GET /sessions/:id, /transcript, /summary - session queries
//! - GET/PUT /notes/:id - notes document read + debounced human edits
//! - POST /stt/events - recognizer sidecar push
//! - GET /ws - realtime events (listen-data, notes-update, summary-update, ...)
//! - GET /health - health check

mod handlers;
mod routes;
mod state;
mod ws;

pub use routes::create_router;
pub use state::AppState;
