//! Transcription event pipeline.
//!
//! One sequential task per session consumes the backend's speech events.
//! Partials are ephemeral captions; finals are persisted, accumulated for
//! analysis, appended to the notes document, and broadcast — in arrival
//! order, with no reordering or deduplication (at-least-once delivery from
//! the backend is accepted).

use crate::hub::{BroadcastHub, OutboundEvent, TranscriptPayload};
use crate::notes::NotesSynchronizer;
use crate::providers::{Speaker, SpeechEvent};
use crate::store::{SessionStore, TranscriptTurn};
use crate::summary::IncrementalSummarizer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub struct TranscriptionEventPipeline {
    store: Arc<dyn SessionStore>,
    summarizer: Arc<IncrementalSummarizer>,
    notes: Arc<NotesSynchronizer>,
    hub: Arc<BroadcastHub>,
}

impl TranscriptionEventPipeline {
    pub fn new(
        store: Arc<dyn SessionStore>,
        summarizer: Arc<IncrementalSummarizer>,
        notes: Arc<NotesSynchronizer>,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        Self {
            store,
            summarizer,
            notes,
            hub,
        }
    }

    /// Spawn the consuming task for a session. The task ends when the
    /// backend closes its sender (session teardown).
    pub fn spawn(
        self: Arc<Self>,
        session_id: String,
        mut events: mpsc::Receiver<SpeechEvent>,
    ) -> JoinHandle<()> {
        let pipeline = self;
        tokio::spawn(async move {
            info!("transcription pipeline started for session {session_id}");
            while let Some(event) = events.recv().await {
                pipeline.process(&session_id, event).await;
            }
            info!("transcription pipeline stopped for session {session_id}");
        })
    }

    /// Handle one speech event. Finals complete their persistence and
    /// fan-out before the caller reads the next event, preserving turn
    /// order.
    pub async fn process(&self, session_id: &str, event: SpeechEvent) {
        if !event.is_final {
            self.hub
                .broadcast(OutboundEvent::ListenData(TranscriptPayload::transcript(
                    event.speaker,
                    event.text,
                    false,
                )));
            return;
        }

        self.handle_final(session_id, event.speaker, &event.text)
            .await;
    }

    async fn handle_final(&self, session_id: &str, speaker: Speaker, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        if let Err(err) = self.store.touch(session_id).await {
            error!("failed to touch session {session_id}: {err}");
        }

        let turn = TranscriptTurn::new(session_id, speaker, text);
        if let Err(err) = self.store.append_transcript_turn(turn).await {
            error!("failed to persist transcript turn for {session_id}: {err}");
            self.hub.broadcast(OutboundEvent::ListenError {
                error: format!("failed to save transcript: {err}"),
            });
        }

        Arc::clone(&self.summarizer).add_turn(speaker, text).await;

        if let Err(err) = self.notes.append_turn(session_id, speaker, text).await {
            error!("failed to append turn to notes for {session_id}: {err}");
        }

        self.hub
            .broadcast(OutboundEvent::ListenData(TranscriptPayload::transcript(
                speaker, text, true,
            )));
    }
}
