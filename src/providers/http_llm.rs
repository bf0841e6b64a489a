use super::llm::{ChatMessage, Completion, SummarizationProvider};
use crate::error::CopilotError;
use serde::Deserialize;
use tracing::debug;

/// Completion provider speaking the OpenAI-compatible chat completions API.
///
/// Works against any endpoint exposing `POST {base_url}/chat/completions`
/// (hosted APIs, local inference servers). The API key is optional for
/// local servers.
pub struct HttpCompletionProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl HttpCompletionProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

#[async_trait::async_trait]
impl SummarizationProvider for HttpCompletionProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, CopilotError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("sending completion request to {} ({})", url, self.model);

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(CopilotError::provider)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CopilotError::Provider(format!(
                "completion endpoint returned {}",
                status
            )));
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(CopilotError::provider)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CopilotError::Provider("empty choices in response".to_string()))?;

        Ok(Completion { content })
    }
}

/// Placeholder provider used when no completion endpoint is configured.
///
/// Every call fails with a provider error, which callers already degrade
/// on (the summarizer keeps its previous analysis, the assistant emits a
/// chat error).
pub struct DisabledSummarizer;

#[async_trait::async_trait]
impl SummarizationProvider for DisabledSummarizer {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<Completion, CopilotError> {
        Err(CopilotError::Provider(
            "no completion provider configured".to_string(),
        ))
    }
}
