// Integration tests for the session lifecycle state machine
//
// These tests verify the at-most-one-active-session invariant, the bounded
// backend initialization retry, and the stop/shutdown cleanup paths.

use anyhow::Result;
use copilot_meetings::providers::testing::{
    CannedSummarizer, FailingTranscriptionBackend, ScriptedTranscriptionBackend,
};
use copilot_meetings::providers::SummarizationProvider;
use copilot_meetings::{
    Config, CopilotRuntime, LifecycleState, MemorySessionStore, Speaker, SpeechEvent,
    TranscriptionBackend,
};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> Config {
    let mut config = Config::default();
    config.session.stt_init_max_attempts = 3;
    config.session.stt_init_retry_delay_ms = 10;
    config.notes.debounce_ms = 50;
    config
}

fn build_runtime(config: &Config, backend: Box<dyn TranscriptionBackend>) -> CopilotRuntime {
    let provider: Arc<dyn SummarizationProvider> = Arc::new(CannedSummarizer::new(vec![
        "**Topic:** Test\n- a point\n".to_string(),
    ]));
    CopilotRuntime::build(config, Arc::new(MemorySessionStore::new()), backend, provider)
}

fn final_turn(speaker: Speaker, text: &str) -> SpeechEvent {
    SpeechEvent {
        speaker,
        text: text.to_string(),
        is_final: true,
    }
}

#[tokio::test]
async fn test_start_then_stop_walks_the_state_machine() -> Result<()> {
    let config = fast_config();
    let backend = ScriptedTranscriptionBackend::new(vec![]);
    let runtime = build_runtime(&config, Box::new(backend));

    assert_eq!(runtime.controller.state().await, LifecycleState::Idle);

    assert!(runtime.controller.start().await?);
    assert_eq!(runtime.controller.state().await, LifecycleState::Active);
    let session_id = runtime.controller.current_session_id().await.unwrap();

    assert!(runtime.controller.stop().await?);
    assert_eq!(runtime.controller.state().await, LifecycleState::Idle);
    assert!(runtime.controller.current_session_id().await.is_none());

    // The session row is marked ended
    let session = runtime.store.get_by_id(&session_id).await?.unwrap();
    assert!(session.ended_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_start_is_noop_while_already_running() -> Result<()> {
    let config = fast_config();
    let backend = ScriptedTranscriptionBackend::new(vec![]);
    let runtime = build_runtime(&config, Box::new(backend));

    assert!(runtime.controller.start().await?);
    // Second start must not create a second session
    assert!(!runtime.controller.start().await?);

    runtime.controller.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_starts_collapse_to_one() -> Result<()> {
    let config = fast_config();
    let backend = ScriptedTranscriptionBackend::new(vec![]);
    let runtime = Arc::new(build_runtime(&config, Box::new(backend)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let runtime = Arc::clone(&runtime);
        handles.push(tokio::spawn(
            async move { runtime.controller.start().await },
        ));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await?? {
            successes += 1;
        }
    }
    assert_eq!(successes, 1, "exactly one start call wins");

    // Exactly one unended row exists for the owner
    let active = runtime
        .store
        .end_all_active(&config.session.owner_id)
        .await?;
    assert_eq!(active, 1);

    Ok(())
}

#[tokio::test]
async fn test_stop_without_session_is_noop() -> Result<()> {
    let config = fast_config();
    let backend = ScriptedTranscriptionBackend::new(vec![]);
    let runtime = build_runtime(&config, Box::new(backend));

    assert!(!runtime.controller.stop().await?);
    Ok(())
}

#[tokio::test]
async fn test_init_retries_until_first_success() -> Result<()> {
    let config = fast_config();
    // Two failures, then success: within the 3-attempt budget
    let backend = ScriptedTranscriptionBackend::new(vec![]).failing_first(2);
    let runtime = build_runtime(&config, Box::new(backend));

    assert!(runtime.controller.start().await?);
    assert_eq!(runtime.controller.state().await, LifecycleState::Active);

    runtime.controller.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_init_exhaustion_reverts_to_idle() -> Result<()> {
    let config = fast_config();
    let backend = FailingTranscriptionBackend::new();
    let runtime = build_runtime(&config, Box::new(backend));

    let result = runtime.controller.start().await;
    assert!(result.is_err(), "exhausted init surfaces the error");
    assert_eq!(runtime.controller.state().await, LifecycleState::Idle);

    // The machine is reusable after the failure
    assert!(!runtime.controller.stop().await?);
    Ok(())
}

#[tokio::test]
async fn test_session_row_reused_across_restarts() -> Result<()> {
    let config = fast_config();
    let backend = ScriptedTranscriptionBackend::new(vec![]);
    let runtime = build_runtime(&config, Box::new(backend));

    // Seed an unended row for the owner; start() must adopt it instead of
    // creating a second active session.
    let seeded = runtime
        .store
        .get_or_create_active(&config.session.owner_id, copilot_meetings::SessionType::Listen)
        .await?;

    assert!(runtime.controller.start().await?);
    assert_eq!(
        runtime.controller.current_session_id().await.as_deref(),
        Some(seeded.id.as_str())
    );

    runtime.controller.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_final_turns_flow_into_store_and_notes() -> Result<()> {
    let config = fast_config();
    let backend = ScriptedTranscriptionBackend::new(vec![
        final_turn(Speaker::User, "hi"),
        final_turn(Speaker::Other, "hello"),
        final_turn(Speaker::User, "what's the agenda?"),
    ]);
    let runtime = build_runtime(&config, Box::new(backend));

    runtime.controller.start().await?;
    let session_id = runtime.controller.current_session_id().await.unwrap();

    // Let the script drain and the triggered analysis land
    tokio::time::sleep(Duration::from_millis(300)).await;
    runtime.controller.stop().await?;

    let turns = runtime.store.transcript_turns(&session_id).await?;
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0].text, "hi");
    assert_eq!(turns[2].text, "what's the agenda?");

    // The example scenario: title, one summary section, transcript in order
    let session = runtime.store.get_by_id(&session_id).await?.unwrap();
    let notes = &session.notes;
    assert!(notes.starts_with("# Live Notes"));
    assert_eq!(notes.matches("## Summary").count(), 1);
    let summary_pos = notes.find("## Summary").unwrap();
    let transcript_pos = notes.find("## Transcript").unwrap();
    assert!(summary_pos < transcript_pos);
    let hi = notes.find("**Me:** hi").unwrap();
    let hello = notes.find("**Them:** hello").unwrap();
    let agenda = notes.find("**Me:** what's the agenda?").unwrap();
    assert!(hi < hello && hello < agenda);

    // The summary was also persisted
    let summary = runtime.store.summary(&session_id).await?.unwrap();
    assert_eq!(summary.tldr, "Test");

    Ok(())
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_ends_rows() -> Result<()> {
    let config = fast_config();
    let backend = ScriptedTranscriptionBackend::new(vec![]);
    let runtime = build_runtime(&config, Box::new(backend));

    runtime.controller.start().await?;
    let session_id = runtime.controller.current_session_id().await.unwrap();

    runtime.controller.shutdown().await?;
    assert_eq!(runtime.controller.state().await, LifecycleState::Idle);
    let session = runtime.store.get_by_id(&session_id).await?.unwrap();
    assert!(session.ended_at.is_some());

    // Re-entrant shutdown is a no-op, not a hang or a panic
    runtime.controller.shutdown().await?;
    Ok(())
}
