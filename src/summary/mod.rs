//! Periodic conversation analysis.
//!
//! Accumulates finalized turns for the active session and re-summarizes the
//! recent window every few turns. Provider failures and unparseable
//! responses degrade to the previous analysis; a session's in-flight
//! analysis is discarded if the session stops before it lands.

mod parse;
pub mod prompt;

pub use parse::{parse_analysis, TOPIC_MARKER};

use crate::error::CopilotError;
use crate::hub::{BroadcastHub, OutboundEvent};
use crate::notes::NotesSynchronizer;
use crate::providers::{Speaker, SummarizationProvider};
use crate::store::{SessionStore, SummaryRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Structured digest of the conversation so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub topic_header: String,
    pub summary_bullets: Vec<String>,
    pub action_items: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Tuning for the summarizer.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Re-analyze every N accumulated turns.
    pub trigger_every: usize,
    /// How many recent turns enter the prompt window.
    pub max_prompt_turns: usize,
    /// Bounded ring of retained past analyses.
    pub history_capacity: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            trigger_every: 3,
            max_prompt_turns: 30,
            history_capacity: 10,
        }
    }
}

#[derive(Default)]
struct SummarizerState {
    session_id: Option<String>,
    /// Bumped on session begin/end; an analysis pass whose epoch no longer
    /// matches is stale and must not apply.
    epoch: u64,
    conversation: Vec<String>,
    previous: Option<AnalysisResult>,
    history: VecDeque<AnalysisResult>,
}

/// Accumulates turns and periodically recomputes the analysis.
pub struct IncrementalSummarizer {
    provider: Arc<dyn SummarizationProvider>,
    store: Arc<dyn SessionStore>,
    notes: Arc<NotesSynchronizer>,
    hub: Arc<BroadcastHub>,
    config: SummarizerConfig,
    state: Mutex<SummarizerState>,
    /// Serializes provider-call-plus-apply so two overlapping analysis
    /// passes cannot interleave their writes.
    apply_gate: Mutex<()>,
}

impl IncrementalSummarizer {
    pub fn new(
        provider: Arc<dyn SummarizationProvider>,
        store: Arc<dyn SessionStore>,
        notes: Arc<NotesSynchronizer>,
        hub: Arc<BroadcastHub>,
        config: SummarizerConfig,
    ) -> Self {
        Self {
            provider,
            store,
            notes,
            hub,
            config,
            state: Mutex::new(SummarizerState::default()),
            apply_gate: Mutex::new(()),
        }
    }

    /// Reset accumulation for a fresh session.
    pub async fn begin_session(&self, session_id: &str) {
        let mut state = self.state.lock().await;
        state.session_id = Some(session_id.to_string());
        state.epoch += 1;
        state.conversation.clear();
        state.previous = None;
        state.history.clear();
        debug!("summarizer reset for session {session_id}");
    }

    /// Clear accumulation and invalidate any in-flight analysis.
    pub async fn end_session(&self) {
        let mut state = self.state.lock().await;
        state.session_id = None;
        state.epoch += 1;
        state.conversation.clear();
        state.previous = None;
        state.history.clear();
        debug!("summarizer state cleared");
    }

    /// Record one finalized turn; spawns an analysis pass when the trigger
    /// predicate is met so turn accumulation is never blocked on the
    /// provider.
    pub async fn add_turn(self: Arc<Self>, speaker: Speaker, text: &str) {
        let should_trigger = {
            let mut state = self.state.lock().await;
            if state.session_id.is_none() {
                return;
            }
            state
                .conversation
                .push(format!("{}: {}", speaker.prompt_label(), text.trim()));
            let count = state.conversation.len();
            count >= self.config.trigger_every && count % self.config.trigger_every == 0
        };

        if should_trigger {
            tokio::spawn(async move {
                self.run_analysis().await;
            });
        }
    }

    /// One full analysis pass: snapshot, prompt, provider call, parse,
    /// persist, apply to notes, broadcast. Returns the analysis now in
    /// effect (previous on degradation, `None` when nothing applies).
    pub async fn run_analysis(&self) -> Option<AnalysisResult> {
        let _apply = self.apply_gate.lock().await;

        let (session_id, epoch, window, previous) = {
            let state = self.state.lock().await;
            let session_id = state.session_id.clone()?;
            let window =
                prompt::format_conversation_window(&state.conversation, self.config.max_prompt_turns);
            (session_id, state.epoch, window, state.previous.clone())
        };

        if window.is_empty() {
            return previous;
        }

        info!(
            "running conversation analysis for session {session_id} ({} chars of context)",
            window.len()
        );

        if let Err(err) = self.store.touch(&session_id).await {
            warn!("failed to touch session {session_id}: {err}");
        }

        let messages = prompt::build_analysis_messages(&window, previous.as_ref());
        let completion = match self.provider.complete(&messages).await {
            Ok(completion) => completion,
            Err(err) => {
                warn!("analysis request failed for session {session_id}: {err}");
                self.hub.broadcast(OutboundEvent::ListenError {
                    error: format!("summarization failed: {err}"),
                });
                return previous;
            }
        };

        let Some(result) = parse_analysis(&completion.content, previous.as_ref()) else {
            warn!("analysis response had no recognizable structure; keeping previous result");
            return previous;
        };

        // Apply: discard if the session stopped (or restarted) mid-flight.
        {
            let mut state = self.state.lock().await;
            if state.epoch != epoch || state.session_id.as_deref() != Some(session_id.as_str()) {
                info!("discarding stale analysis for session {session_id}");
                return None;
            }
            state.previous = Some(result.clone());
            state.history.push_back(result.clone());
            while state.history.len() > self.config.history_capacity {
                state.history.pop_front();
            }
        }

        let record = SummaryRecord {
            session_id: session_id.clone(),
            text: completion.content.clone(),
            tldr: result.topic_header.clone(),
            bullets: result.summary_bullets.clone(),
            actions: result.action_items.clone(),
            generated_at: result.generated_at,
        };
        if let Err(err) = self.store.save_summary(record).await {
            error!("failed to persist summary for session {session_id}: {err}");
        }

        if let Err(err) = self.notes.replace_summary(&session_id, &result).await {
            error!("failed to apply summary to notes for session {session_id}: {err}");
        }

        self.hub
            .broadcast(OutboundEvent::SummaryUpdate(result.clone()));

        Some(result)
    }

    /// Number of turns accumulated for the active session.
    pub async fn conversation_len(&self) -> usize {
        self.state.lock().await.conversation.len()
    }

    /// Latest analysis retained for fallback/continuity.
    pub async fn previous_analysis(&self) -> Option<AnalysisResult> {
        self.state.lock().await.previous.clone()
    }

    /// Number of retained past analyses (bounded by `history_capacity`).
    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }
}
