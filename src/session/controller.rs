use super::retry::BackoffPolicy;
use crate::error::CopilotError;
use crate::hub::{BroadcastHub, OutboundEvent};
use crate::notes::NotesSynchronizer;
use crate::pipeline::TranscriptionEventPipeline;
use crate::providers::{SttOptions, TranscriptionBackend};
use crate::store::{SessionStore, SessionType};
use crate::summary::IncrementalSummarizer;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Where the session lifecycle currently is.
///
/// Owned exclusively by the controller and never persisted; storage only
/// knows whether the session row is unended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Idle,
    Initializing,
    Active,
    Closing,
}

struct ControllerState {
    lifecycle: LifecycleState,
    session_id: Option<String>,
    pipeline_task: Option<JoinHandle<()>>,
}

/// Owns the session lifecycle state machine.
///
/// Guarantees at most one active session for its owner: overlapping
/// `start` calls collapse to one attempt, and `start`/`stop`/`shutdown`
/// are serialized by a single-flight transition gate.
pub struct SessionController {
    store: Arc<dyn SessionStore>,
    backend: Mutex<Box<dyn TranscriptionBackend>>,
    pipeline: Arc<TranscriptionEventPipeline>,
    summarizer: Arc<IncrementalSummarizer>,
    notes: Arc<NotesSynchronizer>,
    hub: Arc<BroadcastHub>,
    backoff: Box<dyn BackoffPolicy>,
    owner_id: String,
    stt_options: SttOptions,
    /// Serializes whole start/stop/shutdown transitions.
    transition: Mutex<()>,
    state: Mutex<ControllerState>,
    shutting_down: AtomicBool,
}

impl SessionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Box<dyn TranscriptionBackend>,
        pipeline: Arc<TranscriptionEventPipeline>,
        summarizer: Arc<IncrementalSummarizer>,
        notes: Arc<NotesSynchronizer>,
        hub: Arc<BroadcastHub>,
        backoff: Box<dyn BackoffPolicy>,
        owner_id: String,
        stt_options: SttOptions,
    ) -> Self {
        Self {
            store,
            backend: Mutex::new(backend),
            pipeline,
            summarizer,
            notes,
            hub,
            backoff,
            owner_id,
            stt_options,
            transition: Mutex::new(()),
            state: Mutex::new(ControllerState {
                lifecycle: LifecycleState::Idle,
                session_id: None,
                pipeline_task: None,
            }),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub async fn state(&self) -> LifecycleState {
        self.state.lock().await.lifecycle
    }

    pub async fn current_session_id(&self) -> Option<String> {
        self.state.lock().await.session_id.clone()
    }

    /// Start a listen session.
    ///
    /// Returns `Ok(false)` as a no-op when a session is already starting or
    /// running. On backend initialization exhaustion the state machine
    /// reverts to idle and the error is returned.
    pub async fn start(&self) -> Result<bool> {
        let _flight = self.transition.lock().await;

        {
            let mut state = self.state.lock().await;
            if state.lifecycle != LifecycleState::Idle {
                info!(
                    "start ignored: session already {:?}",
                    state.lifecycle
                );
                return Ok(false);
            }
            state.lifecycle = LifecycleState::Initializing;
        }

        match self.bring_up().await {
            Ok((session_id, task)) => {
                {
                    let mut state = self.state.lock().await;
                    state.lifecycle = LifecycleState::Active;
                    state.session_id = Some(session_id.clone());
                    state.pipeline_task = Some(task);
                }
                self.hub
                    .broadcast(OutboundEvent::ListenStatus { is_listening: true });
                info!("listen session {session_id} active");
                Ok(true)
            }
            Err(err) => {
                {
                    let mut state = self.state.lock().await;
                    state.lifecycle = LifecycleState::Idle;
                    state.session_id = None;
                    state.pipeline_task = None;
                }
                self.hub.broadcast(OutboundEvent::ListenError {
                    error: format!("failed to start listening: {err}"),
                });
                Err(err)
            }
        }
    }

    /// Obtain the session row and bring the backend up under the backoff
    /// policy.
    async fn bring_up(&self) -> Result<(String, JoinHandle<()>)> {
        let session = self
            .store
            .get_or_create_active(&self.owner_id, SessionType::Listen)
            .await
            .context("failed to obtain active session row")?;

        self.summarizer.begin_session(&session.id).await;

        let mut backend = self.backend.lock().await;
        let mut failures = 0u32;
        let events = loop {
            match backend.initialize(&self.stt_options).await {
                Ok(events) => break events,
                Err(err) => {
                    failures += 1;
                    warn!(
                        "transcription backend init attempt {failures} failed: {err}"
                    );
                    match self.backoff.next_delay(failures) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            return Err(err).context(format!(
                                "transcription backend failed to initialize after {failures} attempts"
                            ));
                        }
                    }
                }
            }
        };
        drop(backend);

        let task = Arc::clone(&self.pipeline).spawn(session.id.clone(), events);
        Ok((session.id, task))
    }

    /// Stop the current session.
    ///
    /// Returns `Ok(false)` as a no-op when nothing is starting or running.
    /// Backend teardown failures are logged, never fatal; a store failure
    /// while ending the row is surfaced only after cleanup completes.
    pub async fn stop(&self) -> Result<bool> {
        let _flight = self.transition.lock().await;
        self.stop_locked().await
    }

    async fn stop_locked(&self) -> Result<bool> {
        let session_id = {
            let mut state = self.state.lock().await;
            match state.lifecycle {
                LifecycleState::Active | LifecycleState::Initializing => {}
                _ => {
                    info!("stop ignored: no session in progress");
                    return Ok(false);
                }
            }
            state.lifecycle = LifecycleState::Closing;
            state.session_id.clone()
        };

        // Teardown is best-effort: the session must close either way.
        if let Err(err) = self.backend.lock().await.close().await {
            warn!("transcription backend teardown failed: {err}");
        }

        let task = self.state.lock().await.pipeline_task.take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                error!("transcription pipeline task panicked: {err}");
            }
        }

        let mut end_result: Result<(), CopilotError> = Ok(());
        if let Some(id) = session_id.as_deref() {
            // Flush, not drop: the user's last edit should survive the stop.
            self.notes.flush_pending(id).await;

            if let Err(err) = self.store.end(id).await {
                error!("failed to mark session {id} ended: {err}");
                end_result = Err(err);
            } else {
                info!("session {id} ended");
            }
        }

        self.summarizer.end_session().await;

        {
            let mut state = self.state.lock().await;
            state.lifecycle = LifecycleState::Idle;
            state.session_id = None;
        }
        self.hub
            .broadcast(OutboundEvent::ListenStatus { is_listening: false });

        end_result.map(|_| true).map_err(Into::into)
    }

    /// Process-level shutdown: force-stop whatever is running and end all
    /// of the owner's unended rows. Idempotent; a re-entrant call is a
    /// no-op so quit paths cannot recurse.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            info!("shutdown already in progress");
            return Ok(());
        }

        info!("shutting down session controller");
        let _flight = self.transition.lock().await;

        if let Err(err) = self.stop_locked().await {
            warn!("stop during shutdown failed: {err}");
        }

        match self.store.end_all_active(&self.owner_id).await {
            Ok(0) => {}
            Ok(count) => info!("force-ended {count} active session(s)"),
            Err(err) => {
                // The store may already be closed this late; cleanup still
                // completes.
                warn!("could not end active sessions during shutdown: {err}");
            }
        }

        Ok(())
    }

    /// Forward one audio chunk to the backend while a session is up.
    pub async fn feed_audio(&self, chunk: &[u8], mime_type: &str) -> Result<(), CopilotError> {
        match self.state.lock().await.lifecycle {
            LifecycleState::Active | LifecycleState::Initializing => {}
            _ => return Ok(()), // no session; chunk dropped
        }
        self.backend.lock().await.feed_audio(chunk, mime_type).await
    }
}
