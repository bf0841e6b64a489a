//! Session persistence contract.
//!
//! The core treats storage as a transactional key-row store keyed by session
//! id and owner id. `MemorySessionStore` is the reference implementation
//! backing local mode and the tests; a SQL-backed store implements the same
//! trait without touching the core.

mod memory;

pub use memory::MemorySessionStore;

use crate::error::CopilotError;
use crate::providers::Speaker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of episode a session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Ask,
    Listen,
}

/// Whether the notes column reflects every accepted edit.
///
/// `Dirty` while a human edit is queued behind the debounce window or a
/// commit has failed; only a successful `update_notes` returns it to `Clean`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Clean,
    Dirty,
}

/// One bounded episode of listening/asking, with its notes document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub owner_id: String,
    pub session_type: SessionType,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub sync_state: SyncState,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// One finalized speech utterance attributed to a speaker.
///
/// Immutable once persisted; the per-session sequence is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptTurn {
    pub id: String,
    pub session_id: String,
    pub speaker: Speaker,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl TranscriptTurn {
    pub fn new(session_id: impl Into<String>, speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            speaker,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Persisted form of an analysis result.
///
/// Keeps the raw provider response next to the parsed fields so a later
/// reparse or audit does not depend on the parser version that wrote it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub session_id: String,
    pub text: String,
    pub tldr: String,
    pub bullets: Vec<String>,
    pub actions: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Durable CRUD for sessions, transcript turns, and derived summaries.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>, CopilotError>;

    async fn create(
        &self,
        owner_id: &str,
        session_type: SessionType,
    ) -> Result<Session, CopilotError>;

    /// Return the owner's unended session, creating one if none exists.
    ///
    /// Reuses an existing unended row regardless of its type (retargeting
    /// the type), preserving the at-most-one-active-session invariant.
    async fn get_or_create_active(
        &self,
        owner_id: &str,
        session_type: SessionType,
    ) -> Result<Session, CopilotError>;

    /// Replace the notes text. A successful write marks the row `Clean`.
    async fn update_notes(&self, id: &str, notes: &str) -> Result<(), CopilotError>;

    /// Record that a human edit is pending for the row's notes.
    async fn mark_notes_dirty(&self, id: &str) -> Result<(), CopilotError>;

    /// Bump the row's `updated_at` without touching content.
    async fn touch(&self, id: &str) -> Result<(), CopilotError>;

    /// Mark the session ended (sets `ended_at`). Idempotent.
    async fn end(&self, id: &str) -> Result<(), CopilotError>;

    /// Force-end every unended session for the owner. Returns the count.
    async fn end_all_active(&self, owner_id: &str) -> Result<usize, CopilotError>;

    async fn append_transcript_turn(&self, turn: TranscriptTurn) -> Result<(), CopilotError>;

    async fn transcript_turns(&self, session_id: &str)
        -> Result<Vec<TranscriptTurn>, CopilotError>;

    /// Persist the latest summary for a session (superseding any prior one).
    async fn save_summary(&self, record: SummaryRecord) -> Result<(), CopilotError>;

    async fn summary(&self, session_id: &str) -> Result<Option<SummaryRecord>, CopilotError>;
}
