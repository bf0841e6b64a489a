//! Opaque provider seams: streaming speech-to-text and text completion.
//!
//! Vendor integrations live behind these traits; the core only depends on
//! the contracts (retryable initialization, non-fatal completion failures).

pub mod http_llm;
pub mod llm;
pub mod push;
pub mod stt;
pub mod testing;

pub use http_llm::{DisabledSummarizer, HttpCompletionProvider};
pub use llm::{ChatMessage, Completion, SummarizationProvider};
pub use push::{PushTranscriptionBackend, SpeechEventInjector};
pub use stt::{Speaker, SpeechEvent, SttOptions, TranscriptionBackend};
