use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub session: SessionConfig,
    pub summarizer: SummarizerSettings,
    pub notes: NotesSettings,
    pub hub: HubSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Single local user; every session row belongs to this owner.
    pub owner_id: String,
    /// Language hint passed to the recognizer
    pub language: String,
    /// Bounded retry for transcription backend bring-up
    pub stt_init_max_attempts: u32,
    pub stt_init_retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerSettings {
    /// Re-analyze every N finalized turns
    pub trigger_every: usize,
    /// Recent turns included in the analysis prompt
    pub max_prompt_turns: usize,
    /// Retained past analyses
    pub history_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotesSettings {
    /// Human-edit debounce window in milliseconds
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    /// Observer heartbeat interval in seconds
    pub heartbeat_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible base URL; summarization is disabled when unset
    pub endpoint: Option<String>,
    pub model: String,
    /// Environment variable holding the API key, if the endpoint needs one
    pub api_key_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "copilot-meetings".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            owner_id: "default-user".to_string(),
            language: "en".to_string(),
            stt_init_max_attempts: 10,
            stt_init_retry_delay_ms: 300,
        }
    }
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            trigger_every: 3,
            max_prompt_turns: 30,
            history_capacity: 10,
        }
    }
}

impl Default for NotesSettings {
    fn default() -> Self {
        Self { debounce_ms: 2000 }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self { heartbeat_secs: 30 }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            api_key_env: "COPILOT_LLM_API_KEY".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.notes.debounce_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.hub.heartbeat_secs)
    }

    pub fn stt_retry_delay(&self) -> Duration {
        Duration::from_millis(self.session.stt_init_retry_delay_ms)
    }
}
