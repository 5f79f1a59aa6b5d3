//! Remote chat-completion backend (OpenRouter-compatible).
//!
//! One non-streaming request with a single user message per prompt. The
//! remote model cannot be constrained by a schema, so formatting rules are
//! appended to the prompt and code fences are stripped from the reply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use zeroize::Zeroizing;

use crate::services::prompt_runner::PromptBackend;
use crate::services::response_parser::strip_markdown_fences;
use crate::types::errors::PromptError;
use crate::types::settings::Provider;

const REFERER: &str = "https://github.com/tabio-ai";
const APP_TITLE: &str = "Tabio AI - Tab Organizer";

const FORMAT_INSTRUCTIONS: &str = r#"

You MUST respond with valid JSON that is an ARRAY of objects. Each object should have:
- "category": string (the category name)
- "tabIds": array of numbers (the tab IDs in that category)

Example format:
[
  {"category": "Work", "tabIds": [123, 456]},
  {"category": "Shopping", "tabIds": [789]}
]

Respond ONLY with the JSON array, no markdown formatting, no explanation text."#;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct RemoteBackend {
    client: reqwest::Client,
    api_key: Zeroizing<String>,
    model: String,
    endpoint: String,
}

impl RemoteBackend {
    pub fn new(api_key: &str, model: &str, endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Zeroizing::new(api_key.trim().to_string()),
            model: model.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PromptBackend for RemoteBackend {
    fn provider(&self) -> Provider {
        Provider::Remote
    }

    fn check_available(&self) -> Result<(), PromptError> {
        if self.api_key.is_empty() {
            return Err(PromptError::Unavailable(
                "OpenRouter API key not set. Please add your API key in settings.".to_string(),
            ));
        }
        Ok(())
    }

    async fn run(
        &mut self,
        prompt: &str,
        schema: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<String, PromptError> {
        self.check_available()?;

        let mut content = prompt.to_string();
        if schema.is_some() {
            content.push_str(FORMAT_INSTRUCTIONS);
        }
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            stream: false,
        };

        debug!(model = %self.model, endpoint = %self.endpoint, "sending remote prompt");
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.as_str())
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PromptError::Aborted),
            sent = request => sent.map_err(|e| PromptError::Network(e.to_string()))?,
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(PromptError::Provider { status, message });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| PromptError::InvalidReply(e.to_string()))?;
        let text = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PromptError::InvalidReply("reply has no message content".to_string()))?;

        Ok(strip_markdown_fences(&text).to_string())
    }
}
