//! Ask-mode assistant.
//!
//! Answers user questions against the live context (transcript tail plus
//! the current notes) and can edit the notes document on request through a
//! JSON tool call in the model's reply. Provider failures surface as
//! dismissible chat errors and never touch the session.

use crate::error::CopilotError;
use crate::hub::{BroadcastHub, ChatStatePayload, OutboundEvent};
use crate::notes::NotesSynchronizer;
use crate::providers::{ChatMessage, SummarizationProvider};
use crate::store::SessionStore;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How much of the transcript tail enters the prompt.
const TRANSCRIPT_CONTEXT_BYTES: usize = 5000;
/// How many prior chat messages enter the prompt.
const CHAT_HISTORY_WINDOW: usize = 10;

/// Tool call the model may emit instead of a plain reply.
#[derive(Debug, Deserialize)]
struct NoteToolCall {
    tool: String,
    action: String,
    content: String,
}

pub struct AssistantService {
    provider: Arc<dyn SummarizationProvider>,
    store: Arc<dyn SessionStore>,
    notes: Arc<NotesSynchronizer>,
    hub: Arc<BroadcastHub>,
    /// Per-session chat history (role/content pairs).
    history: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl AssistantService {
    pub fn new(
        provider: Arc<dyn SummarizationProvider>,
        store: Arc<dyn SessionStore>,
        notes: Arc<NotesSynchronizer>,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        Self {
            provider,
            store,
            notes,
            hub,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Answer one question in the context of a session.
    pub async fn handle_question(
        &self,
        session_id: &str,
        question: &str,
    ) -> Result<String, CopilotError> {
        self.hub.broadcast(OutboundEvent::ChatState(ChatStatePayload {
            session_id: session_id.to_string(),
            state: "thinking".to_string(),
            message: None,
        }));

        match self.answer(session_id, question).await {
            Ok(answer) => {
                self.hub.broadcast(OutboundEvent::ChatState(ChatStatePayload {
                    session_id: session_id.to_string(),
                    state: "answer".to_string(),
                    message: Some(answer.clone()),
                }));
                Ok(answer)
            }
            Err(err) => {
                warn!("assistant request failed for session {session_id}: {err}");
                self.hub.broadcast(OutboundEvent::ChatError {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn answer(&self, session_id: &str, question: &str) -> Result<String, CopilotError> {
        let session = self
            .store
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| CopilotError::SessionNotFound(session_id.to_string()))?;

        let turns = self.store.transcript_turns(session_id).await?;
        let transcript: String = turns
            .iter()
            .map(|t| format!("{}: {}", t.speaker.prompt_label(), t.text))
            .collect::<Vec<_>>()
            .join("\n");

        let system = build_system_prompt(tail(&transcript, TRANSCRIPT_CONTEXT_BYTES), &session.notes);

        let mut messages = vec![ChatMessage::system(system)];
        {
            let history = self.history.lock().await;
            if let Some(prior) = history.get(session_id) {
                let start = prior.len().saturating_sub(CHAT_HISTORY_WINDOW);
                messages.extend(prior[start..].iter().cloned());
            }
        }
        messages.push(ChatMessage::user(question));

        let completion = self.provider.complete(&messages).await?;
        let reply = completion.content;

        let final_response = match self.apply_tool_call(session_id, &reply).await {
            Some(confirmation) => confirmation,
            None => reply,
        };

        let mut history = self.history.lock().await;
        let entry = history.entry(session_id.to_string()).or_default();
        entry.push(ChatMessage::user(question));
        entry.push(ChatMessage::assistant(final_response.clone()));

        Ok(final_response)
    }

    /// If the reply is an `update_notes` tool call, apply it and return the
    /// confirmation message. Anything unparseable is treated as plain chat.
    async fn apply_tool_call(&self, session_id: &str, reply: &str) -> Option<String> {
        let trimmed = reply.trim();
        if !trimmed.starts_with('{') {
            return None;
        }

        let call: NoteToolCall = match serde_json::from_str(trimmed) {
            Ok(call) => call,
            Err(err) => {
                debug!("assistant reply looked like JSON but did not parse: {err}");
                return None;
            }
        };
        if call.tool != "update_notes" {
            return None;
        }

        let applied = match call.action.as_str() {
            "append" => self
                .notes
                .append_block(session_id, &call.content)
                .await
                .map(|_| "I've updated the notes."),
            "replace" => self
                .notes
                .replace_all(session_id, &call.content)
                .await
                .map(|_| "I've rewritten the notes."),
            other => {
                debug!("unknown notes tool action: {other}");
                return None;
            }
        };

        match applied {
            Ok(confirmation) => {
                info!("assistant applied {} tool-edit to session {session_id}", call.action);
                Some(confirmation.to_string())
            }
            Err(err) => {
                warn!("assistant tool-edit failed for session {session_id}: {err}");
                Some(format!("I couldn't update the notes: {err}"))
            }
        }
    }
}

fn build_system_prompt(transcript_tail: &str, notes: &str) -> String {
    format!(
        "You are an intelligent live note-taking assistant helping a user who \
is currently in a meeting. You have access to the live transcript and the \
current notes.\n\n\
CONTEXT:\n---\nTRANSCRIPT:\n{transcript_tail}\n---\nCURRENT NOTES:\n{notes}\n---\n\n\
YOUR GOAL:\nHelp the user take better notes.\n\
- Answer questions about the conversation.\n\
- If the user asks you to modify the notes, output ONLY a JSON object of the \
form {{\"tool\": \"update_notes\", \"action\": \"append\" | \"replace\", \
\"content\": \"...\"}}.\n\
- \"append\" adds text to the end of the notes; \"replace\" replaces the \
entire notes content (only when asked to reformat everything).\n\
- Otherwise, just reply with text."
    )
}

/// Last `max` bytes of `s`, snapped forward to a char boundary.
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut idx = s.len() - max;
    while !s.is_char_boundary(idx) {
        idx += 1;
    }
    &s[idx..]
}
