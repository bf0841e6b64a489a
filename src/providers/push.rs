use super::stt::{SpeechEvent, SttOptions, TranscriptionBackend};
use crate::error::CopilotError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// Transcription backend fed by an external recognizer sidecar.
///
/// The recognizer runs next to the audio capture (on the client device) and
/// pushes partial/final speech events through the HTTP boundary
/// (`POST /stt/events`). This backend just carries those events into the
/// session's pipeline channel, the same shape as a bus-subscribed recognizer.
pub struct PushTranscriptionBackend {
    sender: Arc<Mutex<Option<mpsc::Sender<SpeechEvent>>>>,
    audio_bytes_received: Arc<AtomicUsize>,
    channel_capacity: usize,
}

/// Handle used by the HTTP boundary to inject recognizer events.
#[derive(Clone)]
pub struct SpeechEventInjector {
    sender: Arc<Mutex<Option<mpsc::Sender<SpeechEvent>>>>,
}

impl SpeechEventInjector {
    /// Push one recognizer event into the active session, if any.
    ///
    /// Returns false when no recognition session is up (event dropped).
    pub async fn inject(&self, event: SpeechEvent) -> Result<bool, CopilotError> {
        let guard = self.sender.lock().await;
        match guard.as_ref() {
            Some(tx) => {
                tx.send(event)
                    .await
                    .map_err(|_| CopilotError::Backend("event channel closed".to_string()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl PushTranscriptionBackend {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(Mutex::new(None)),
            audio_bytes_received: Arc::new(AtomicUsize::new(0)),
            channel_capacity: 256,
        }
    }

    pub fn injector(&self) -> SpeechEventInjector {
        SpeechEventInjector {
            sender: Arc::clone(&self.sender),
        }
    }

    /// Total audio bytes accepted since startup (the sidecar captures audio
    /// locally; bytes fed here are only accounted, not forwarded).
    pub fn audio_bytes_received(&self) -> usize {
        self.audio_bytes_received.load(Ordering::Relaxed)
    }
}

impl Default for PushTranscriptionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TranscriptionBackend for PushTranscriptionBackend {
    async fn initialize(
        &mut self,
        options: &SttOptions,
    ) -> Result<mpsc::Receiver<SpeechEvent>, CopilotError> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let mut guard = self.sender.lock().await;
        *guard = Some(tx);

        info!(
            "push transcription backend ready (language={}, {} Hz, {} ch)",
            options.language, options.sample_rate, options.channels
        );

        Ok(rx)
    }

    async fn feed_audio(&self, chunk: &[u8], mime_type: &str) -> Result<(), CopilotError> {
        self.audio_bytes_received
            .fetch_add(chunk.len(), Ordering::Relaxed);
        debug!("accepted {} audio bytes ({})", chunk.len(), mime_type);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CopilotError> {
        let mut guard = self.sender.lock().await;
        if guard.take().is_some() {
            info!("push transcription backend closed");
        }
        Ok(())
    }
}
