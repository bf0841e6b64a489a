//! Wire envelopes for the realtime boundary.
//!
//! Everything crossing the observer channel is `{"type": ..., "data": ...}`
//! with kebab-case type tags, matching the web client's dispatcher.

use crate::providers::Speaker;
use crate::summary::AnalysisResult;
use serde::{Deserialize, Serialize};

/// Payload of a `listen-data` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptPayload {
    /// Discriminator inside the payload; currently always "transcript".
    #[serde(rename = "type")]
    pub kind: String,
    pub speaker: Speaker,
    pub text: String,
    pub is_final: bool,
}

impl TranscriptPayload {
    pub fn transcript(speaker: Speaker, text: impl Into<String>, is_final: bool) -> Self {
        Self {
            kind: "transcript".to_string(),
            speaker,
            text: text.into(),
            is_final,
        }
    }
}

/// Payload of a `chat-state` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatStatePayload {
    pub session_id: String,
    /// "thinking" while a question is in flight, "answer" when resolved.
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Events fanned out to connected observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum OutboundEvent {
    /// Greeting sent to a freshly registered observer.
    Connection { status: String },
    #[serde(rename_all = "camelCase")]
    ListenStatus { is_listening: bool },
    ListenData(TranscriptPayload),
    #[serde(rename_all = "camelCase")]
    NotesUpdate { session_id: String, notes: String },
    SummaryUpdate(AnalysisResult),
    ListenError { error: String },
    ChatState(ChatStatePayload),
    ChatError { error: String },
    /// Heartbeat probe; observers reply with a `pong` command.
    Ping,
}

/// Commands observers send inbound.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum InboundCommand {
    StartListening,
    StopListening,
    #[serde(rename_all = "camelCase")]
    AskQuestion {
        question: String,
        #[serde(default)]
        session_id: Option<String>,
    },
    /// Base64-encoded audio chunk from the client device.
    #[serde(rename_all = "camelCase")]
    MicAudio {
        data: String,
        #[serde(default = "default_mime_type")]
        mime_type: String,
    },
    /// Heartbeat acknowledgement.
    Pong,
}

fn default_mime_type() -> String {
    "audio/pcm".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_status_envelope_shape() {
        let json = serde_json::to_string(&OutboundEvent::ListenStatus { is_listening: true }).unwrap();
        assert_eq!(json, r#"{"type":"listen-status","data":{"isListening":true}}"#);
    }

    #[test]
    fn test_listen_data_envelope_shape() {
        let event = OutboundEvent::ListenData(TranscriptPayload::transcript(
            Speaker::Other,
            "hello",
            false,
        ));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.starts_with(r#"{"type":"listen-data","data":{"#));
        assert!(json.contains(r#""type":"transcript""#));
        assert!(json.contains(r#""speaker":"other""#));
        assert!(json.contains(r#""isFinal":false"#));
    }

    #[test]
    fn test_inbound_command_parsing() {
        let cmd: InboundCommand =
            serde_json::from_str(r#"{"type":"start-listening"}"#).unwrap();
        assert!(matches!(cmd, InboundCommand::StartListening));

        let cmd: InboundCommand = serde_json::from_str(
            r#"{"type":"ask-question","data":{"question":"what was decided?"}}"#,
        )
        .unwrap();
        match cmd {
            InboundCommand::AskQuestion {
                question,
                session_id,
            } => {
                assert_eq!(question, "what was decided?");
                assert!(session_id.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_mic_audio_defaults_mime_type() {
        let cmd: InboundCommand =
            serde_json::from_str(r#"{"type":"mic-audio","data":{"data":"AAAA"}}"#).unwrap();
        match cmd {
            InboundCommand::MicAudio { data, mime_type } => {
                assert_eq!(data, "AAAA");
                assert_eq!(mime_type, "audio/pcm");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
