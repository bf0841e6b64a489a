//! Test and demo doubles for the provider seams.
//!
//! Shipped in-crate (like a file-based audio source) so integration tests
//! and the demo binary can drive full sessions without a recognizer or a
//! completion endpoint.

use super::llm::{ChatMessage, Completion, SummarizationProvider};
use super::stt::{SpeechEvent, SttOptions, TranscriptionBackend};
use crate::error::CopilotError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

/// Backend that replays a fixed script of speech events after initialize.
pub struct ScriptedTranscriptionBackend {
    script: Vec<SpeechEvent>,
    sender: Option<mpsc::Sender<SpeechEvent>>,
    /// Initialization failures to simulate before the first success.
    fail_attempts: u32,
    attempts_seen: AtomicU32,
}

impl ScriptedTranscriptionBackend {
    pub fn new(script: Vec<SpeechEvent>) -> Self {
        Self {
            script,
            sender: None,
            fail_attempts: 0,
            attempts_seen: AtomicU32::new(0),
        }
    }

    /// Fail the first `attempts` initialize calls before succeeding.
    pub fn failing_first(mut self, attempts: u32) -> Self {
        self.fail_attempts = attempts;
        self
    }

    pub fn attempts_seen(&self) -> u32 {
        self.attempts_seen.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TranscriptionBackend for ScriptedTranscriptionBackend {
    async fn initialize(
        &mut self,
        _options: &SttOptions,
    ) -> Result<mpsc::Receiver<SpeechEvent>, CopilotError> {
        let attempt = self.attempts_seen.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_attempts {
            return Err(CopilotError::Backend(format!(
                "scripted init failure {attempt}"
            )));
        }

        let (tx, rx) = mpsc::channel(64);
        let script = self.script.clone();
        let feeder = tx.clone();
        self.sender = Some(tx);

        tokio::spawn(async move {
            for event in script {
                if feeder.send(event).await.is_err() {
                    break;
                }
            }
        });

        info!("scripted transcription backend initialized");
        Ok(rx)
    }

    async fn feed_audio(&self, _chunk: &[u8], _mime_type: &str) -> Result<(), CopilotError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CopilotError> {
        self.sender = None;
        Ok(())
    }
}

/// Backend whose initialize always fails. Exercises retry exhaustion.
pub struct FailingTranscriptionBackend {
    attempts_seen: AtomicU32,
}

impl FailingTranscriptionBackend {
    pub fn new() -> Self {
        Self {
            attempts_seen: AtomicU32::new(0),
        }
    }

    pub fn attempts_seen(&self) -> u32 {
        self.attempts_seen.load(Ordering::SeqCst)
    }
}

impl Default for FailingTranscriptionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TranscriptionBackend for FailingTranscriptionBackend {
    async fn initialize(
        &mut self,
        _options: &SttOptions,
    ) -> Result<mpsc::Receiver<SpeechEvent>, CopilotError> {
        let attempt = self.attempts_seen.fetch_add(1, Ordering::SeqCst) + 1;
        Err(CopilotError::Backend(format!(
            "recognizer unavailable (attempt {attempt})"
        )))
    }

    async fn feed_audio(&self, _chunk: &[u8], _mime_type: &str) -> Result<(), CopilotError> {
        Err(CopilotError::Backend("recognizer unavailable".to_string()))
    }

    async fn close(&mut self) -> Result<(), CopilotError> {
        Ok(())
    }
}

/// Completion provider that replays canned responses and records requests.
pub struct CannedSummarizer {
    responses: Mutex<Vec<String>>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    /// When the canned list runs dry, either repeat the last response or fail.
    fail_when_empty: bool,
    last: Mutex<Option<String>>,
}

impl CannedSummarizer {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Arc::new(Mutex::new(Vec::new())),
            fail_when_empty: false,
            last: Mutex::new(None),
        }
    }

    /// A provider that always fails, for degradation tests.
    pub fn always_failing() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
            fail_when_empty: true,
            last: Mutex::new(None),
        }
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl SummarizationProvider for CannedSummarizer {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, CopilotError> {
        self.requests.lock().await.push(messages.to_vec());

        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            if self.fail_when_empty {
                return Err(CopilotError::Provider("canned provider out of responses".to_string()));
            }
            let last = self.last.lock().await;
            return match last.as_ref() {
                Some(content) => Ok(Completion {
                    content: content.clone(),
                }),
                None => Err(CopilotError::Provider("no canned responses".to_string())),
            };
        }

        let content = responses.remove(0);
        *self.last.lock().await = Some(content.clone());
        Ok(Completion { content })
    }
}
