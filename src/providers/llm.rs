use crate::error::CopilotError;
use serde::{Deserialize, Serialize};

/// One message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Response from a completion provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
}

/// Request/response text-completion capability.
///
/// Failures are non-fatal to callers: the summarizer falls back to its
/// previous analysis and the assistant surfaces a dismissible chat error.
#[async_trait::async_trait]
pub trait SummarizationProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, CopilotError>;
}
