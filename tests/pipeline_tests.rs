// Integration tests for the transcription event pipeline
//
// These tests verify the partial/final split, the ordering guarantee for
// persisted turns, and the at-least-once acceptance of duplicates.

use anyhow::Result;
use copilot_meetings::providers::testing::CannedSummarizer;
use copilot_meetings::providers::SummarizationProvider;
use copilot_meetings::{
    BroadcastHub, Config, IncrementalSummarizer, MemorySessionStore, NotesSynchronizer,
    OutboundEvent, SessionStore, SessionType, Speaker, SpeechEvent, SummarizerConfig,
    TranscriptionEventPipeline,
};
use copilot_meetings::session::FixedDelayBackoff;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Fixture {
    store: Arc<MemorySessionStore>,
    hub: Arc<BroadcastHub>,
    pipeline: Arc<TranscriptionEventPipeline>,
    session_id: String,
}

async fn fixture() -> Result<Fixture> {
    let config = Config::default();
    let store = Arc::new(MemorySessionStore::new());
    let hub = Arc::new(BroadcastHub::new(Duration::from_secs(30)));
    let notes = Arc::new(NotesSynchronizer::new(
        store.clone() as Arc<dyn SessionStore>,
        Arc::clone(&hub),
        Duration::from_millis(config.notes.debounce_ms),
        Arc::new(FixedDelayBackoff::new(2, Duration::from_millis(10))),
    ));
    let provider: Arc<dyn SummarizationProvider> =
        Arc::new(CannedSummarizer::new(vec!["**Topic:** T\n- p\n".to_string()]));
    let summarizer = Arc::new(IncrementalSummarizer::new(
        provider,
        store.clone() as Arc<dyn SessionStore>,
        Arc::clone(&notes),
        Arc::clone(&hub),
        SummarizerConfig::default(),
    ));
    let pipeline = Arc::new(TranscriptionEventPipeline::new(
        store.clone() as Arc<dyn SessionStore>,
        Arc::clone(&summarizer),
        notes,
        Arc::clone(&hub),
    ));

    let session = store.get_or_create_active("tester", SessionType::Listen).await?;
    summarizer.begin_session(&session.id).await;

    Ok(Fixture {
        store,
        hub,
        pipeline,
        session_id: session.id,
    })
}

fn event(speaker: Speaker, text: &str, is_final: bool) -> SpeechEvent {
    SpeechEvent {
        speaker,
        text: text.to_string(),
        is_final,
    }
}

#[tokio::test]
async fn test_final_events_preserve_arrival_order() -> Result<()> {
    let fx = fixture().await?;

    for i in 0..10 {
        fx.pipeline
            .process(&fx.session_id, event(Speaker::User, &format!("turn {i}"), true))
            .await;
    }

    let turns = fx.store.transcript_turns(&fx.session_id).await?;
    assert_eq!(turns.len(), 10);
    for (i, turn) in turns.iter().enumerate() {
        assert_eq!(turn.text, format!("turn {i}"));
    }

    Ok(())
}

#[tokio::test]
async fn test_partial_events_broadcast_but_never_persist() -> Result<()> {
    let fx = fixture().await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    fx.hub.register(tx);
    // Drain the registration greeting
    let greeting = rx.recv().await.unwrap();
    assert!(matches!(greeting, OutboundEvent::Connection { .. }));

    fx.pipeline
        .process(&fx.session_id, event(Speaker::Other, "partial capt", false))
        .await;

    match rx.recv().await.unwrap() {
        OutboundEvent::ListenData(payload) => {
            assert_eq!(payload.text, "partial capt");
            assert!(!payload.is_final);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let turns = fx.store.transcript_turns(&fx.session_id).await?;
    assert!(turns.is_empty(), "partials must not be persisted");

    Ok(())
}

#[tokio::test]
async fn test_empty_final_text_is_dropped() -> Result<()> {
    let fx = fixture().await?;

    fx.pipeline
        .process(&fx.session_id, event(Speaker::User, "   ", true))
        .await;
    fx.pipeline
        .process(&fx.session_id, event(Speaker::User, "", true))
        .await;

    let turns = fx.store.transcript_turns(&fx.session_id).await?;
    assert!(turns.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_duplicate_finals_are_kept() -> Result<()> {
    // At-least-once delivery: the pipeline does not deduplicate
    let fx = fixture().await?;

    fx.pipeline
        .process(&fx.session_id, event(Speaker::User, "same line", true))
        .await;
    fx.pipeline
        .process(&fx.session_id, event(Speaker::User, "same line", true))
        .await;

    let turns = fx.store.transcript_turns(&fx.session_id).await?;
    assert_eq!(turns.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_final_event_lands_in_notes_and_broadcast() -> Result<()> {
    let fx = fixture().await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    fx.hub.register(tx);
    rx.recv().await.unwrap(); // greeting

    fx.pipeline
        .process(&fx.session_id, event(Speaker::Other, "hello there", true))
        .await;

    let session = fx.store.get_by_id(&fx.session_id).await?.unwrap();
    assert!(session.notes.contains("**Them:** hello there"));

    // notes-update lands before the finalized listen-data event
    let mut saw_notes_update = false;
    let mut saw_final_caption = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            OutboundEvent::NotesUpdate { notes, .. } => {
                assert!(notes.contains("hello there"));
                saw_notes_update = true;
            }
            OutboundEvent::ListenData(payload) if payload.is_final => {
                assert_eq!(payload.text, "hello there");
                saw_final_caption = true;
            }
            _ => {}
        }
    }
    assert!(saw_notes_update);
    assert!(saw_final_caption);

    Ok(())
}
