//! Canonical notes document ownership and merge policy.
//!
//! Three classes of writer mutate one markdown document per session: the
//! transcript appender, the summary rewriter, and the human editor. Every
//! mutation funnels through `NotesSynchronizer`, which serializes
//! read-modify-write cycles per session and applies the merge policy for
//! human edits.

pub mod document;

use crate::error::CopilotError;
use crate::hub::{BroadcastHub, OutboundEvent};
use crate::providers::Speaker;
use crate::session::retry::BackoffPolicy;
use crate::store::SessionStore;
use crate::summary::AnalysisResult;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Merge policy for a human edit racing a server-side update.
///
/// Accepts the server text only in the unambiguous case where it is a pure
/// extension of the local text (a transcript line landed while the user was
/// typing). In every other case the local edit wins; auto-merging anything
/// ambiguous risks destroying hand-written notes.
pub fn merge_server_update<'a>(local: &'a str, server: &'a str) -> &'a str {
    if server.len() > local.len() && server.starts_with(local) {
        server
    } else {
        local
    }
}

struct PendingEdit {
    seq: u64,
    text: String,
    timer: JoinHandle<()>,
}

/// Single authority for mutating a session's notes document.
pub struct NotesSynchronizer {
    store: Arc<dyn SessionStore>,
    hub: Arc<BroadcastHub>,
    debounce: Duration,
    commit_backoff: Arc<dyn BackoffPolicy>,
    /// Per-session document locks; every read-modify-write holds one.
    doc_locks: DashMap<String, Arc<Mutex<()>>>,
    /// At most one pending human edit per session.
    pending: Mutex<HashMap<String, PendingEdit>>,
    edit_seq: AtomicU64,
}

impl NotesSynchronizer {
    pub fn new(
        store: Arc<dyn SessionStore>,
        hub: Arc<BroadcastHub>,
        debounce: Duration,
        commit_backoff: Arc<dyn BackoffPolicy>,
    ) -> Self {
        Self {
            store,
            hub,
            debounce,
            commit_backoff,
            doc_locks: DashMap::new(),
            pending: Mutex::new(HashMap::new()),
            edit_seq: AtomicU64::new(0),
        }
    }

    fn doc_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.doc_locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load_notes(&self, session_id: &str) -> Result<String, CopilotError> {
        let session = self
            .store
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| CopilotError::SessionNotFound(session_id.to_string()))?;
        Ok(session.notes)
    }

    async fn commit(&self, session_id: &str, notes: &str) -> Result<(), CopilotError> {
        self.store.update_notes(session_id, notes).await?;
        self.hub.broadcast(OutboundEvent::NotesUpdate {
            session_id: session_id.to_string(),
            notes: notes.to_string(),
        });
        Ok(())
    }

    /// Append one finalized transcript turn to the document tail.
    ///
    /// Server-origin; only ever grows the tail, so it is always safe to
    /// apply immediately.
    pub async fn append_turn(
        &self,
        session_id: &str,
        speaker: Speaker,
        text: &str,
    ) -> Result<(), CopilotError> {
        let lock = self.doc_lock(session_id);
        let _guard = lock.lock().await;

        let current = self.load_notes(session_id).await?;
        let updated = document::append_turn_line(&current, speaker.display_label(), text);
        self.commit(session_id, &updated).await
    }

    /// Rewrite exactly the `## Summary` section for a new analysis result.
    pub async fn replace_summary(
        &self,
        session_id: &str,
        result: &AnalysisResult,
    ) -> Result<(), CopilotError> {
        let lock = self.doc_lock(session_id);
        let _guard = lock.lock().await;

        let current = self.load_notes(session_id).await?;
        let updated = document::upsert_summary(&current, result);
        self.commit(session_id, &updated).await
    }

    /// Append a free-text block (assistant tool-edit).
    pub async fn append_block(&self, session_id: &str, text: &str) -> Result<(), CopilotError> {
        let lock = self.doc_lock(session_id);
        let _guard = lock.lock().await;

        let current = self.load_notes(session_id).await?;
        let updated = if current.is_empty() {
            text.to_string()
        } else {
            format!("{current}\n\n{text}")
        };
        self.commit(session_id, &updated).await
    }

    /// Replace the whole document (assistant tool-edit, explicit request).
    pub async fn replace_all(&self, session_id: &str, text: &str) -> Result<(), CopilotError> {
        let lock = self.doc_lock(session_id);
        let _guard = lock.lock().await;
        self.commit(session_id, text).await
    }

    /// Queue a human edit behind the debounce window.
    ///
    /// Optimistic from the editor's point of view: the call acks
    /// immediately, the row is marked dirty, and the commit happens when
    /// the timer fires unmolested. A newer edit for the same session
    /// replaces the pending one and re-arms the timer.
    pub async fn submit_edit(
        self: Arc<Self>,
        session_id: &str,
        client_text: String,
    ) -> Result<(), CopilotError> {
        // The row must exist; a typo'd session id should not queue forever.
        if self.store.get_by_id(session_id).await?.is_none() {
            return Err(CopilotError::SessionNotFound(session_id.to_string()));
        }

        if let Err(err) = self.store.mark_notes_dirty(session_id).await {
            // The edit is still queued; dirtiness tracking is best-effort.
            warn!("failed to mark notes dirty for {session_id}: {err}");
        }

        let seq = self.edit_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let timer = {
            let sync = Arc::clone(&self);
            let id = session_id.to_string();
            let delay = self.debounce;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                sync.commit_pending(&id, Some(seq)).await;
            })
        };

        let mut pending = self.pending.lock().await;
        if let Some(stale) = pending.insert(
            session_id.to_string(),
            PendingEdit {
                seq,
                text: client_text,
                timer,
            },
        ) {
            stale.timer.abort();
            debug!("debounce re-armed for session {session_id}");
        }

        Ok(())
    }

    /// Commit any queued edit for the session immediately (used on stop, so
    /// the last human edit is flushed rather than dropped).
    pub async fn flush_pending(&self, session_id: &str) {
        self.commit_pending(session_id, None).await;
    }

    /// Returns true while a human edit is queued for the session.
    pub async fn has_pending_edit(&self, session_id: &str) -> bool {
        self.pending.lock().await.contains_key(session_id)
    }

    /// Take the pending edit (if `expected_seq` still matches) and commit it
    /// under the merge policy, retrying transient store failures.
    async fn commit_pending(&self, session_id: &str, expected_seq: Option<u64>) {
        let edit = {
            let mut pending = self.pending.lock().await;
            match pending.get(session_id) {
                Some(entry) if expected_seq.map_or(true, |seq| entry.seq == seq) => {
                    let entry = pending.remove(session_id).expect("entry checked above");
                    // Flush path only: the timer is a different task and must
                    // not fire later. When the timer itself is committing,
                    // aborting would cancel this very task.
                    if expected_seq.is_none() {
                        entry.timer.abort();
                    }
                    entry
                }
                _ => return, // superseded by a newer edit, or nothing queued
            }
        };

        let lock = self.doc_lock(session_id);
        let _guard = lock.lock().await;

        // Re-evaluate the merge against whatever the server committed while
        // the edit sat in the debounce window.
        let server = match self.load_notes(session_id).await {
            Ok(notes) => notes,
            Err(err) => {
                error!("cannot load notes for pending edit on {session_id}: {err}");
                String::new()
            }
        };
        let merged = merge_server_update(&edit.text, &server).to_string();

        let mut failures = 0u32;
        loop {
            match self.commit(session_id, &merged).await {
                Ok(()) => {
                    info!("committed debounced edit for session {session_id}");
                    return;
                }
                Err(err) => {
                    failures += 1;
                    match self.commit_backoff.next_delay(failures) {
                        Some(delay) => {
                            warn!(
                                "notes commit for {session_id} failed (attempt {failures}): {err}; retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            // Row stays dirty; the next edit or flush retries.
                            error!("giving up on notes commit for {session_id}: {err}");
                            return;
                        }
                    }
                }
            }
        }
    }
}
