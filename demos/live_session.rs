// Live Session Example: scripted end-to-end run of the co-pilot core
//
// This example demonstrates the complete pipeline without a recognizer or a
// completion endpoint:
// 1. A scripted transcription backend replays a short conversation
// 2. The pipeline persists turns and appends them to the notes document
// 3. The canned provider answers the periodic analysis request
// 4. The summary section is spliced into the notes, and every step fans out
//    to a registered observer
//
// Usage: cargo run --example live_session

use anyhow::Result;
use copilot_meetings::providers::testing::{CannedSummarizer, ScriptedTranscriptionBackend};
use copilot_meetings::{
    Config, CopilotRuntime, MemorySessionStore, Speaker, SpeechEvent, SummarizationProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

fn turn(speaker: Speaker, text: &str) -> SpeechEvent {
    SpeechEvent {
        speaker,
        text: text.to_string(),
        is_final: true,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::default();

    let script = vec![
        SpeechEvent {
            speaker: Speaker::User,
            text: "hi eve".to_string(),
            is_final: false,
        },
        turn(Speaker::User, "hi everyone"),
        turn(Speaker::Other, "hello, good morning"),
        turn(Speaker::User, "what's on the agenda today?"),
    ];

    let provider: Arc<dyn SummarizationProvider> = Arc::new(CannedSummarizer::new(vec![
        "**Topic:** Meeting kickoff\n\n- Greetings exchanged.\n- Agenda requested.\n- [ ] Share the agenda\n"
            .to_string(),
    ]));

    let store = Arc::new(MemorySessionStore::new());
    let backend = ScriptedTranscriptionBackend::new(script);
    let runtime = CopilotRuntime::build(&config, store, Box::new(backend), provider);

    // Watch everything the core broadcasts
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    runtime.hub.register(events_tx);
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            info!("event: {}", serde_json::to_string(&event)?);
        }
        Ok::<_, serde_json::Error>(())
    });

    let started = runtime.controller.start().await?;
    info!("session started: {started}");

    // Let the script drain and the analysis land
    tokio::time::sleep(Duration::from_millis(500)).await;

    let session_id = runtime
        .controller
        .current_session_id()
        .await
        .expect("session is active");

    runtime.controller.stop().await?;

    let session = runtime
        .store
        .get_by_id(&session_id)
        .await?
        .expect("session row exists");

    println!("\n===== notes document =====\n{}", session.notes);

    Ok(())
}
