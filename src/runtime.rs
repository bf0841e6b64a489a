//! One-stop construction of the core services.
//!
//! Every service is an explicit context-held instance built once at startup
//! and shared by reference; there is no module-level mutable state. The
//! at-most-one-active-session invariant lives in the single controller
//! instance per owner.

use crate::assistant::AssistantService;
use crate::config::Config;
use crate::hub::BroadcastHub;
use crate::notes::NotesSynchronizer;
use crate::pipeline::TranscriptionEventPipeline;
use crate::providers::{SttOptions, SummarizationProvider, TranscriptionBackend};
use crate::session::{FixedDelayBackoff, SessionController};
use crate::store::SessionStore;
use crate::summary::{IncrementalSummarizer, SummarizerConfig};
use std::sync::Arc;

pub struct CopilotRuntime {
    pub store: Arc<dyn SessionStore>,
    pub hub: Arc<BroadcastHub>,
    pub notes: Arc<NotesSynchronizer>,
    pub summarizer: Arc<IncrementalSummarizer>,
    pub pipeline: Arc<TranscriptionEventPipeline>,
    pub controller: Arc<SessionController>,
    pub assistant: Arc<AssistantService>,
}

impl CopilotRuntime {
    pub fn build(
        config: &Config,
        store: Arc<dyn SessionStore>,
        backend: Box<dyn TranscriptionBackend>,
        provider: Arc<dyn SummarizationProvider>,
    ) -> Self {
        let hub = Arc::new(BroadcastHub::new(config.heartbeat()));

        let commit_backoff = Arc::new(FixedDelayBackoff::new(
            config.session.stt_init_max_attempts,
            config.stt_retry_delay(),
        ));
        let notes = Arc::new(NotesSynchronizer::new(
            Arc::clone(&store),
            Arc::clone(&hub),
            config.debounce(),
            commit_backoff,
        ));

        let summarizer = Arc::new(IncrementalSummarizer::new(
            Arc::clone(&provider),
            Arc::clone(&store),
            Arc::clone(&notes),
            Arc::clone(&hub),
            SummarizerConfig {
                trigger_every: config.summarizer.trigger_every,
                max_prompt_turns: config.summarizer.max_prompt_turns,
                history_capacity: config.summarizer.history_capacity,
            },
        ));

        let pipeline = Arc::new(TranscriptionEventPipeline::new(
            Arc::clone(&store),
            Arc::clone(&summarizer),
            Arc::clone(&notes),
            Arc::clone(&hub),
        ));

        let controller = Arc::new(SessionController::new(
            Arc::clone(&store),
            backend,
            Arc::clone(&pipeline),
            Arc::clone(&summarizer),
            Arc::clone(&notes),
            Arc::clone(&hub),
            Box::new(FixedDelayBackoff::new(
                config.session.stt_init_max_attempts,
                config.stt_retry_delay(),
            )),
            config.session.owner_id.clone(),
            SttOptions {
                language: config.session.language.clone(),
                ..SttOptions::default()
            },
        ));

        let assistant = Arc::new(AssistantService::new(
            provider,
            Arc::clone(&store),
            Arc::clone(&notes),
            Arc::clone(&hub),
        ));

        Self {
            store,
            hub,
            notes,
            summarizer,
            pipeline,
            controller,
            assistant,
        }
    }
}
