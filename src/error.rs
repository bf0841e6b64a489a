use thiserror::Error;

/// Error taxonomy for the co-pilot core.
///
/// The variants map to the failure classes the session machinery has to
/// distinguish: persistence failures are surfaced to callers without
/// corrupting in-memory state, backend/provider failures are transient and
/// handled by retry or graceful degradation.
#[derive(Debug, Error)]
pub enum CopilotError {
    /// Session store failure (unavailable, row conflict, closed at shutdown).
    #[error("store error: {0}")]
    Store(String),

    /// Transcription backend failure. Initialization failures are retryable.
    #[error("transcription backend error: {0}")]
    Backend(String),

    /// Summarization/completion provider failure. Never fatal to a session.
    #[error("completion provider error: {0}")]
    Provider(String),

    /// Referenced session does not exist in the store.
    #[error("session {0} not found")]
    SessionNotFound(String),
}

impl CopilotError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }

    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn provider(err: impl std::fmt::Display) -> Self {
        Self::Provider(err.to_string())
    }
}
