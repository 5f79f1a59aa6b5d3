//! Prompt execution against the configured model backend.
//!
//! [`PromptRunner`] owns exactly one [`PromptBackend`], chosen from
//! [`PanelSettings::provider`], and turns every flavor of cancellation into
//! [`PromptError::Aborted`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::services::on_device::{LanguageModelFactory, OnDeviceBackend};
use crate::services::remote::RemoteBackend;
use crate::types::errors::PromptError;
use crate::types::settings::{PanelSettings, Provider};

/// Trait implemented by the interchangeable model backends.
#[async_trait]
pub trait PromptBackend: Send + Sync {
    fn provider(&self) -> Provider;

    /// Reports why the backend cannot run, if it cannot.
    fn check_available(&self) -> Result<(), PromptError>;

    /// Sends `prompt` and returns the raw reply text.
    ///
    /// `schema` is a structured-output hint; backends that cannot enforce it
    /// fall back to textual instructions.
    async fn run(
        &mut self,
        prompt: &str,
        schema: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<String, PromptError>;

    /// Discards any backend state that may be corrupt after an abort.
    fn reset(&mut self) {}
}

/// JSON schema for "array of {category: string, tabIds: number[]}".
pub fn categorization_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "category": { "type": "string" },
                "tabIds": {
                    "type": "array",
                    "items": { "type": "number" }
                }
            },
            "required": ["category", "tabIds"]
        }
    })
}

pub struct PromptRunner {
    backend: Box<dyn PromptBackend>,
}

impl PromptRunner {
    pub fn new(backend: Box<dyn PromptBackend>) -> Self {
        Self { backend }
    }

    /// Builds the runner for the provider selected in `settings`.
    pub fn from_settings(settings: &PanelSettings, factory: Arc<dyn LanguageModelFactory>) -> Self {
        let backend: Box<dyn PromptBackend> = match settings.provider {
            Provider::OnDevice => Box::new(OnDeviceBackend::new(factory)),
            Provider::Remote => Box::new(RemoteBackend::new(
                &settings.remote_api_key,
                &settings.remote_model,
                &settings.remote_endpoint,
            )),
        };
        Self::new(backend)
    }

    pub fn provider(&self) -> Provider {
        self.backend.provider()
    }

    pub fn check_available(&self) -> Result<(), PromptError> {
        self.backend.check_available()
    }

    /// Runs a prompt, racing it against `cancel`.
    ///
    /// Cancellation is recognized from the token itself, from
    /// [`PromptError::Aborted`], or from an error message mentioning an abort.
    /// In every case the backend is reset and `Aborted` is returned.
    pub async fn run(
        &mut self,
        prompt: &str,
        schema: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<String, PromptError> {
        let result = if cancel.is_cancelled() {
            Err(PromptError::Aborted)
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(PromptError::Aborted),
                reply = self.backend.run(prompt, schema, cancel) => reply,
            }
        };

        match result {
            Ok(_) if cancel.is_cancelled() => self.aborted(),
            Ok(text) => Ok(text),
            Err(e) if e.is_abort() || cancel.is_cancelled() => self.aborted(),
            Err(e) => {
                error!(provider = self.provider().as_str(), error = %e, "prompt failed");
                Err(e)
            }
        }
    }

    fn aborted(&mut self) -> Result<String, PromptError> {
        info!("prompt was aborted by user");
        self.backend.reset();
        Err(PromptError::Aborted)
    }

    /// Drops backend state; the on-device session is recreated on next use.
    pub fn reset(&mut self) {
        self.backend.reset();
    }
}
