use crate::error::CopilotError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Speaker attribution for a speech event or transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The local user (microphone side).
    User,
    /// Everyone else in the meeting (system audio side).
    Other,
}

impl Speaker {
    /// Label used for transcript lines in the notes document.
    pub fn display_label(&self) -> &'static str {
        match self {
            Speaker::User => "Me",
            Speaker::Other => "Them",
        }
    }

    /// Lowercase label used when formatting conversation history for prompts.
    pub fn prompt_label(&self) -> &'static str {
        match self {
            Speaker::User => "me",
            Speaker::Other => "them",
        }
    }
}

/// A single speech event from the transcription backend.
///
/// Partial events (`is_final == false`) are ephemeral captions; final events
/// become durable transcript turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechEvent {
    pub speaker: Speaker,
    pub text: String,
    pub is_final: bool,
}

/// Options for bringing up a transcription session.
#[derive(Debug, Clone)]
pub struct SttOptions {
    /// BCP-47-ish language hint passed to the recognizer
    pub language: String,
    /// Sample rate the recognizer expects (16kHz for Whisper-class models)
    pub sample_rate: u32,
    /// Number of audio channels (1 = mono)
    pub channels: u16,
}

impl Default for SttOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Streaming speech-to-text backend.
///
/// Implementations may be remote recognizer sidecars, vendor SDKs, or
/// scripted test backends. `initialize` may fail transiently and is retried
/// by the session controller under a backoff policy.
#[async_trait::async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Bring up a recognition session.
    ///
    /// Returns a channel receiver that will deliver speech events until the
    /// backend is closed.
    async fn initialize(
        &mut self,
        options: &SttOptions,
    ) -> Result<mpsc::Receiver<SpeechEvent>, CopilotError>;

    /// Feed one encoded audio chunk to the recognizer.
    async fn feed_audio(&self, chunk: &[u8], mime_type: &str) -> Result<(), CopilotError>;

    /// Tear down the recognition session. Closing drops the event sender so
    /// the receiver returned by `initialize` terminates.
    async fn close(&mut self) -> Result<(), CopilotError>;
}
