pub mod assistant;
pub mod config;
pub mod error;
pub mod hub;
pub mod http;
pub mod notes;
pub mod pipeline;
pub mod providers;
pub mod runtime;
pub mod session;
pub mod store;
pub mod summary;

pub use assistant::AssistantService;
pub use config::Config;
pub use error::CopilotError;
pub use hub::{BroadcastHub, InboundCommand, ObserverId, OutboundEvent, TranscriptPayload};
pub use http::{create_router, AppState};
pub use notes::{merge_server_update, NotesSynchronizer};
pub use pipeline::TranscriptionEventPipeline;
pub use providers::{
    ChatMessage, Completion, PushTranscriptionBackend, Speaker, SpeechEvent, SttOptions,
    SummarizationProvider, TranscriptionBackend,
};
pub use runtime::CopilotRuntime;
pub use session::{BackoffPolicy, FixedDelayBackoff, LifecycleState, SessionController};
pub use store::{
    MemorySessionStore, Session, SessionStore, SessionType, SummaryRecord, SyncState,
    TranscriptTurn,
};
pub use summary::{AnalysisResult, IncrementalSummarizer, SummarizerConfig};
