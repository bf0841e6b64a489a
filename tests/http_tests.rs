// Integration tests for the HTTP boundary
//
// These tests drive the axum router directly with `tower::ServiceExt` and
// verify the session control, notes, and recognizer-push routes.

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use copilot_meetings::providers::testing::CannedSummarizer;
use copilot_meetings::providers::{PushTranscriptionBackend, SummarizationProvider};
use copilot_meetings::{AppState, Config, CopilotRuntime, MemorySessionStore, SessionType};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct Fixture {
    router: Router,
    runtime: CopilotRuntime,
    config: Config,
}

fn fixture() -> Fixture {
    let mut config = Config::default();
    config.session.stt_init_max_attempts = 2;
    config.session.stt_init_retry_delay_ms = 10;
    config.notes.debounce_ms = 40;

    let provider: Arc<dyn SummarizationProvider> = Arc::new(CannedSummarizer::new(vec![
        "**Topic:** T\n- p\n".to_string(),
    ]));
    let store = Arc::new(MemorySessionStore::new());
    let backend = PushTranscriptionBackend::new();
    let injector = backend.injector();

    let runtime = CopilotRuntime::build(&config, store, Box::new(backend), provider);
    let state = AppState::new(&runtime, Some(injector), config.session.owner_id.clone());
    let router = copilot_meetings::create_router(state);

    Fixture {
        router,
        runtime,
        config,
    }
}

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let fx = fixture();
    let response = fx.router.oneshot(empty_request("GET", "/health")).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_listen_start_stop_roundtrip() -> Result<()> {
    let fx = fixture();

    let response = fx
        .router
        .clone()
        .oneshot(empty_request("POST", "/sessions/listen/start"))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["changed"], json!(true));
    assert_eq!(body["state"], json!("active"));
    let session_id = body["session_id"].as_str().unwrap().to_string();

    // Second start is a no-op
    let response = fx
        .router
        .clone()
        .oneshot(empty_request("POST", "/sessions/listen/start"))
        .await?;
    let body = body_json(response).await?;
    assert_eq!(body["changed"], json!(false));

    // Push a final recognizer event through the sidecar route
    let response = fx
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/stt/events",
            json!({"speaker": "other", "text": "hello from sidecar", "isFinal": true}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["accepted"], json!(true));

    // Give the pipeline task a moment to process
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = fx
        .router
        .clone()
        .oneshot(empty_request(
            "GET",
            &format!("/sessions/{session_id}/transcript"),
        ))
        .await?;
    let body = body_json(response).await?;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["text"], json!("hello from sidecar"));

    let response = fx
        .router
        .clone()
        .oneshot(empty_request("POST", "/sessions/listen/stop"))
        .await?;
    let body = body_json(response).await?;
    assert_eq!(body["changed"], json!(true));
    assert_eq!(body["state"], json!("idle"));

    Ok(())
}

#[tokio::test]
async fn test_stt_event_dropped_without_session() -> Result<()> {
    let fx = fixture();

    let response = fx
        .router
        .oneshot(json_request(
            "POST",
            "/stt/events",
            json!({"speaker": "user", "text": "nobody listening", "isFinal": true}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["accepted"], json!(false));

    Ok(())
}

#[tokio::test]
async fn test_notes_get_and_put() -> Result<()> {
    let fx = fixture();
    let session = fx
        .runtime
        .store
        .get_or_create_active(&fx.config.session.owner_id, SessionType::Listen)
        .await?;

    let response = fx
        .router
        .clone()
        .oneshot(empty_request("GET", &format!("/notes/{}", session.id)))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["notes"], json!(""));

    // The PUT acks optimistically before the debounce commit
    let response = fx
        .router
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/notes/{}", session.id),
            json!({"notes": "# My Notes\n\nhand-written"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["success"], json!(true));

    tokio::time::sleep(Duration::from_millis(150)).await;

    let response = fx
        .router
        .clone()
        .oneshot(empty_request("GET", &format!("/notes/{}", session.id)))
        .await?;
    let body = body_json(response).await?;
    assert_eq!(body["notes"], json!("# My Notes\n\nhand-written"));

    Ok(())
}

#[tokio::test]
async fn test_notes_routes_reject_unknown_session() -> Result<()> {
    let fx = fixture();

    let response = fx
        .router
        .clone()
        .oneshot(empty_request("GET", "/notes/nope"))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = fx
        .router
        .clone()
        .oneshot(json_request("PUT", "/notes/nope", json!({"notes": "x"})))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A non-string notes field is a bad request, handled by extraction
    let session = fx
        .runtime
        .store
        .get_or_create_active(&fx.config.session.owner_id, SessionType::Listen)
        .await?;
    let response = fx
        .router
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/notes/{}", session.id),
            json!({"notes": 42}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}

#[tokio::test]
async fn test_ask_creates_session_and_answers() -> Result<()> {
    let fx = fixture();

    let response = fx
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/sessions/ask",
            json!({"question": "what was decided?"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    // The canned provider's reply comes straight back
    assert_eq!(body["message"], json!("**Topic:** T\n- p\n"));

    Ok(())
}
