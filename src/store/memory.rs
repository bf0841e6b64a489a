use super::{Session, SessionStore, SessionType, SummaryRecord, SyncState, TranscriptTurn};
use crate::error::CopilotError;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Default)]
struct Tables {
    sessions: HashMap<String, Session>,
    turns: HashMap<String, Vec<TranscriptTurn>>,
    summaries: HashMap<String, SummaryRecord>,
}

/// In-memory session store.
///
/// Single-process reference implementation: all tables behind one async
/// mutex, so every call is atomic with respect to the others.
pub struct MemorySessionStore {
    tables: Mutex<Tables>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    fn new_session(owner_id: &str, session_type: SessionType) -> Session {
        let now = Utc::now();
        Session {
            id: format!("session-{}", uuid::Uuid::new_v4()),
            owner_id: owner_id.to_string(),
            session_type,
            started_at: now,
            ended_at: None,
            notes: String::new(),
            sync_state: SyncState::Clean,
            updated_at: now,
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>, CopilotError> {
        let tables = self.tables.lock().await;
        Ok(tables.sessions.get(id).cloned())
    }

    async fn create(
        &self,
        owner_id: &str,
        session_type: SessionType,
    ) -> Result<Session, CopilotError> {
        let mut tables = self.tables.lock().await;
        let session = Self::new_session(owner_id, session_type);
        tables.sessions.insert(session.id.clone(), session.clone());
        info!("created {:?} session {}", session_type, session.id);
        Ok(session)
    }

    async fn get_or_create_active(
        &self,
        owner_id: &str,
        session_type: SessionType,
    ) -> Result<Session, CopilotError> {
        let mut tables = self.tables.lock().await;

        let existing = tables
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id && s.is_active())
            .max_by_key(|s| s.started_at)
            .map(|s| s.id.clone());

        if let Some(session) = existing.and_then(|id| tables.sessions.get_mut(&id)) {
            if session.session_type != session_type {
                session.session_type = session_type;
                session.updated_at = Utc::now();
            }
            return Ok(session.clone());
        }

        let session = Self::new_session(owner_id, session_type);
        tables.sessions.insert(session.id.clone(), session.clone());
        info!("started new {:?} session {}", session_type, session.id);
        Ok(session)
    }

    async fn update_notes(&self, id: &str, notes: &str) -> Result<(), CopilotError> {
        let mut tables = self.tables.lock().await;
        let session = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| CopilotError::SessionNotFound(id.to_string()))?;
        session.notes = notes.to_string();
        session.sync_state = SyncState::Clean;
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_notes_dirty(&self, id: &str) -> Result<(), CopilotError> {
        let mut tables = self.tables.lock().await;
        let session = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| CopilotError::SessionNotFound(id.to_string()))?;
        session.sync_state = SyncState::Dirty;
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn touch(&self, id: &str) -> Result<(), CopilotError> {
        let mut tables = self.tables.lock().await;
        let session = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| CopilotError::SessionNotFound(id.to_string()))?;
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn end(&self, id: &str) -> Result<(), CopilotError> {
        let mut tables = self.tables.lock().await;
        let session = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| CopilotError::SessionNotFound(id.to_string()))?;
        if session.ended_at.is_none() {
            session.ended_at = Some(Utc::now());
            session.updated_at = Utc::now();
            info!("session {} ended", id);
        }
        Ok(())
    }

    async fn end_all_active(&self, owner_id: &str) -> Result<usize, CopilotError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let mut ended = 0;
        for session in tables.sessions.values_mut() {
            if session.owner_id == owner_id && session.ended_at.is_none() {
                session.ended_at = Some(now);
                session.updated_at = now;
                ended += 1;
            }
        }
        Ok(ended)
    }

    async fn append_transcript_turn(&self, turn: TranscriptTurn) -> Result<(), CopilotError> {
        let mut tables = self.tables.lock().await;
        if !tables.sessions.contains_key(&turn.session_id) {
            return Err(CopilotError::SessionNotFound(turn.session_id.clone()));
        }
        tables
            .turns
            .entry(turn.session_id.clone())
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn transcript_turns(
        &self,
        session_id: &str,
    ) -> Result<Vec<TranscriptTurn>, CopilotError> {
        let tables = self.tables.lock().await;
        Ok(tables.turns.get(session_id).cloned().unwrap_or_default())
    }

    async fn save_summary(&self, record: SummaryRecord) -> Result<(), CopilotError> {
        let mut tables = self.tables.lock().await;
        tables.summaries.insert(record.session_id.clone(), record);
        Ok(())
    }

    async fn summary(&self, session_id: &str) -> Result<Option<SummaryRecord>, CopilotError> {
        let tables = self.tables.lock().await;
        Ok(tables.summaries.get(session_id).cloned())
    }
}
