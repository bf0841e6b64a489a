use super::state::AppState;
use crate::error::CopilotError;
use crate::providers::SpeechEvent;
use crate::session::LifecycleState;
use crate::store::SessionType;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ListenStateResponse {
    pub state: LifecycleState,
    pub session_id: Option<String>,
    pub changed: bool,
}

#[derive(Debug, Deserialize)]
pub struct NotesUpdateRequest {
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateAck {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SttEventAck {
    pub accepted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_status(err: &CopilotError) -> StatusCode {
    match err {
        CopilotError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/listen/start
/// Start a listen session. `changed` is false when one was already running.
pub async fn start_listening(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.start().await {
        Ok(changed) => {
            let response = ListenStateResponse {
                state: state.controller.state().await,
                session_id: state.controller.current_session_id().await,
                changed,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            error!("failed to start listening: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("failed to start listening: {err}"),
                }),
            )
                .into_response()
        }
    }
}

/// POST /sessions/listen/stop
pub async fn stop_listening(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.stop().await {
        Ok(changed) => {
            let response = ListenStateResponse {
                state: state.controller.state().await,
                session_id: None,
                changed,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            error!("failed to stop listening: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("failed to stop listening: {err}"),
                }),
            )
                .into_response()
        }
    }
}

/// GET /sessions/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_by_id(&session_id).await {
        Ok(Some(session)) => (StatusCode::OK, Json(session)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("session {session_id} not found"),
            }),
        )
            .into_response(),
        Err(err) => (
            error_status(&err),
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /sessions/:session_id/transcript
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.store.transcript_turns(&session_id).await {
        Ok(turns) => (StatusCode::OK, Json(turns)).into_response(),
        Err(err) => (
            error_status(&err),
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /sessions/:session_id/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.store.summary(&session_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no summary for session {session_id}"),
            }),
        )
            .into_response(),
        Err(err) => (
            error_status(&err),
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /notes/:session_id
pub async fn get_notes(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_by_id(&session_id).await {
        Ok(Some(session)) => (
            StatusCode::OK,
            Json(NotesResponse {
                notes: session.notes,
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Session not found".to_string(),
            }),
        )
            .into_response(),
        Err(err) => (
            error_status(&err),
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// PUT /notes/:session_id
/// Queue a human edit. Acks immediately (optimistic); the commit happens
/// when the debounce window closes, still subject to the merge policy.
pub async fn put_notes(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<NotesUpdateRequest>,
) -> impl IntoResponse {
    match Arc::clone(&state.notes)
        .submit_edit(&session_id, request.notes)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(UpdateAck {
                success: true,
                message: "Notes updated".to_string(),
            }),
        )
            .into_response(),
        Err(err) => (
            error_status(&err),
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /sessions/ask
/// Ask a question against the session context. Resolves to the active
/// listen session when none is given, else an ask session.
pub async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> impl IntoResponse {
    let session_id = match resolve_ask_session(&state, request.session_id).await {
        Ok(id) => id,
        Err(err) => {
            return (
                error_status(&err),
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    };

    match state
        .assistant
        .handle_question(&session_id, &request.question)
        .await
    {
        Ok(message) => (StatusCode::OK, Json(AskResponse { message })).into_response(),
        Err(err) => (
            error_status(&err),
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

pub(super) async fn resolve_ask_session(
    state: &AppState,
    requested: Option<String>,
) -> Result<String, CopilotError> {
    if let Some(id) = requested {
        return Ok(id);
    }
    if let Some(id) = state.controller.current_session_id().await {
        return Ok(id);
    }
    let session = state
        .store
        .get_or_create_active(&state.owner_id, SessionType::Ask)
        .await?;
    Ok(session.id)
}

/// POST /stt/events
/// Recognizer sidecar pushes partial/final speech events here.
pub async fn push_stt_event(
    State(state): State<AppState>,
    Json(event): Json<SpeechEvent>,
) -> impl IntoResponse {
    let Some(injector) = &state.stt_injector else {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "configured backend does not accept pushed events".to_string(),
            }),
        )
            .into_response();
    };

    match injector.inject(event).await {
        Ok(accepted) => {
            if !accepted {
                info!("dropped recognizer event: no active session");
            }
            (StatusCode::OK, Json(SttEventAck { accepted })).into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
