use serde::{Deserialize, Serialize};

/// Default OpenRouter chat-completions endpoint.
pub const DEFAULT_REMOTE_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model used for every remote categorization request.
pub const DEFAULT_REMOTE_MODEL: &str = "google/gemini-2.5-flash-lite";

/// Which model backend answers prompts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    #[serde(rename = "on-device")]
    OnDevice,
    #[serde(rename = "remote", alias = "openrouter")]
    Remote,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OnDevice => "on-device",
            Provider::Remote => "remote",
        }
    }
}

/// Persisted side panel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelSettings {
    pub provider: Provider,
    pub remote_api_key: String,
    #[serde(default = "default_remote_model")]
    pub remote_model: String,
    #[serde(default = "default_remote_endpoint")]
    pub remote_endpoint: String,
}

fn default_remote_model() -> String {
    DEFAULT_REMOTE_MODEL.to_string()
}

fn default_remote_endpoint() -> String {
    DEFAULT_REMOTE_ENDPOINT.to_string()
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            provider: Provider::OnDevice,
            remote_api_key: String::new(),
            remote_model: default_remote_model(),
            remote_endpoint: default_remote_endpoint(),
        }
    }
}
