//! On-device inference backend.
//!
//! The browser's built-in language model is reached through
//! [`LanguageModelFactory`]. The backend creates one session lazily, reuses
//! it across prompts, and destroys it on reset or after an abort.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::services::prompt_runner::PromptBackend;
use crate::types::errors::PromptError;
use crate::types::settings::Provider;

/// Parameters used when creating a session.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionParams {
    pub temperature: f32,
    pub top_k: u32,
    pub input_languages: Vec<String>,
    pub output_languages: Vec<String>,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_k: 1,
            input_languages: vec!["en".to_string()],
            output_languages: vec!["en".to_string()],
        }
    }
}

/// Per-prompt options handed to the session.
#[derive(Debug, Clone)]
pub struct PromptOptions {
    pub response_constraint: Option<Value>,
    pub signal: CancellationToken,
}

/// A live on-device model session.
#[async_trait]
pub trait LanguageModelSession: Send + Sync {
    async fn prompt(&mut self, prompt: &str, options: PromptOptions) -> Result<String, PromptError>;

    /// Releases the model's resources.
    fn destroy(&mut self) {}
}

/// Entry point to the on-device model.
#[async_trait]
pub trait LanguageModelFactory: Send + Sync {
    /// Whether the model is present and usable at all.
    fn is_available(&self) -> bool;

    async fn create(&self, params: &SessionParams) -> Result<Box<dyn LanguageModelSession>, PromptError>;
}

pub struct OnDeviceBackend {
    factory: Arc<dyn LanguageModelFactory>,
    params: SessionParams,
    session: Option<Box<dyn LanguageModelSession>>,
    session_id: Option<Uuid>,
}

impl OnDeviceBackend {
    pub fn new(factory: Arc<dyn LanguageModelFactory>) -> Self {
        Self::with_params(factory, SessionParams::default())
    }

    pub fn with_params(factory: Arc<dyn LanguageModelFactory>, params: SessionParams) -> Self {
        Self {
            factory,
            params,
            session: None,
            session_id: None,
        }
    }

    /// Identifier of the live session, `None` until the first prompt or after a reset.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }
}

#[async_trait]
impl PromptBackend for OnDeviceBackend {
    fn provider(&self) -> Provider {
        Provider::OnDevice
    }

    fn check_available(&self) -> Result<(), PromptError> {
        if self.factory.is_available() {
            Ok(())
        } else {
            Err(PromptError::Unavailable(
                "AI Model not available. Please check Chrome flags and download the model."
                    .to_string(),
            ))
        }
    }

    async fn run(
        &mut self,
        prompt: &str,
        schema: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<String, PromptError> {
        self.check_available()?;

        if self.session.is_none() {
            let session = self.factory.create(&self.params).await?;
            let id = Uuid::new_v4();
            info!(session = %id, "created on-device model session");
            self.session = Some(session);
            self.session_id = Some(id);
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| PromptError::SessionCreation("session missing".to_string()))?;

        debug!(chars = prompt.len(), constrained = schema.is_some(), "prompting on-device model");
        session
            .prompt(
                prompt,
                PromptOptions {
                    response_constraint: schema.cloned(),
                    signal: cancel.clone(),
                },
            )
            .await
    }

    fn reset(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.destroy();
            info!(session = ?self.session_id, "destroyed on-device model session");
        }
        self.session_id = None;
    }
}
