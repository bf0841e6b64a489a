use crate::assistant::AssistantService;
use crate::hub::BroadcastHub;
use crate::notes::NotesSynchronizer;
use crate::providers::SpeechEventInjector;
use crate::runtime::CopilotRuntime;
use crate::session::SessionController;
use crate::store::SessionStore;
use std::sync::Arc;

/// Shared application state for HTTP/WS handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub hub: Arc<BroadcastHub>,
    pub notes: Arc<NotesSynchronizer>,
    pub controller: Arc<SessionController>,
    pub assistant: Arc<AssistantService>,
    /// Push path for an external recognizer sidecar; absent when the
    /// configured backend accepts audio directly.
    pub stt_injector: Option<SpeechEventInjector>,
    pub owner_id: String,
}

impl AppState {
    pub fn new(
        runtime: &CopilotRuntime,
        stt_injector: Option<SpeechEventInjector>,
        owner_id: String,
    ) -> Self {
        Self {
            store: Arc::clone(&runtime.store),
            hub: Arc::clone(&runtime.hub),
            notes: Arc::clone(&runtime.notes),
            controller: Arc::clone(&runtime.controller),
            assistant: Arc::clone(&runtime.assistant),
            stt_injector,
            owner_id,
        }
    }
}
