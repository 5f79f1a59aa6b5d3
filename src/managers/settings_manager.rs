// Tabio Settings Manager
// Loads and saves the panel settings and the custom prompt instruction through the key-value store.
// The remote API key is sealed with the install's sealing key before it is written.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::database::KeyValueStore;
use crate::services::crypto_service::SealingKey;
use crate::types::credential::SealedSecret;
use crate::types::errors::SettingsError;
use crate::types::settings::{PanelSettings, Provider};

/// Store key of the selected provider.
pub const PROVIDER_KEY: &str = "aiProvider";

/// Store key of the sealed remote API key.
pub const API_KEY_KEY: &str = "openRouterApiKey";

/// Store key of the user's extra prompt instruction.
pub const CUSTOM_INSTRUCTION_KEY: &str = "customInstruction";

/// Trait defining the settings manager interface.
pub trait SettingsManagerTrait {
    fn load(&mut self) -> Result<PanelSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &PanelSettings;
    fn set_provider(&mut self, provider: Provider) -> Result<(), SettingsError>;
    fn set_api_key(&mut self, api_key: &str) -> Result<(), SettingsError>;
    fn custom_instruction(&self) -> &str;
    fn set_custom_instruction(&mut self, instruction: &str) -> Result<(), SettingsError>;
}

/// Settings manager persisting through a [`KeyValueStore`].
pub struct SettingsManager {
    store: Arc<dyn KeyValueStore>,
    sealing_key: SealingKey,
    settings: PanelSettings,
    custom_instruction: String,
}

impl SettingsManager {
    pub fn new(store: Arc<dyn KeyValueStore>, sealing_key: SealingKey) -> Self {
        Self {
            store,
            sealing_key,
            settings: PanelSettings::default(),
            custom_instruction: String::new(),
        }
    }

    fn seal_api_key(&self, api_key: &str) -> Result<Value, SettingsError> {
        if api_key.is_empty() {
            return Ok(Value::Null);
        }
        let sealed = self.sealing_key.seal(api_key)?;
        serde_json::to_value(sealed).map_err(|e| SettingsError::InvalidValue(e.to_string()))
    }

    /// Accepts the sealed form, or a bare string written by older versions.
    fn open_api_key(&self, value: Value) -> Result<String, SettingsError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::String(plain) => Ok(plain.trim().to_string()),
            sealed => {
                let sealed: SealedSecret = serde_json::from_value(sealed).map_err(|e| {
                    SettingsError::InvalidValue(format!("{}: {}", API_KEY_KEY, e))
                })?;
                let opened = self.sealing_key.open(&sealed)?;
                Ok(opened.as_str().to_string())
            }
        }
    }

    fn read_provider(&self) -> Result<Option<Provider>, SettingsError> {
        match self.store.get(PROVIDER_KEY)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| SettingsError::InvalidValue(format!("{}: {}", PROVIDER_KEY, e))),
            None => Ok(None),
        }
    }

    fn read_api_key(&self) -> Result<String, SettingsError> {
        match self.store.get(API_KEY_KEY)? {
            Some(value) => self.open_api_key(value),
            None => Ok(String::new()),
        }
    }

    fn read_custom_instruction(&self) -> Result<String, SettingsError> {
        Ok(match self.store.get(CUSTOM_INSTRUCTION_KEY)? {
            Some(Value::String(text)) => text,
            Some(other) => {
                warn!(value = %other, "ignoring non-text custom instruction");
                String::new()
            }
            None => String::new(),
        })
    }
}

impl SettingsManagerTrait for SettingsManager {
    /// Loads settings from the store. Each entry is read on its own: absent
    /// or unreadable entries keep their defaults, and the first provider or
    /// instruction error is returned after everything readable was applied.
    /// An API key that cannot be opened is logged and left empty.
    fn load(&mut self) -> Result<PanelSettings, SettingsError> {
        let mut settings = PanelSettings::default();
        let mut first_error = None;

        match self.read_provider() {
            Ok(Some(provider)) => settings.provider = provider,
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "stored provider is unreadable, using default");
                first_error.get_or_insert(e);
            }
        }

        match self.read_api_key() {
            Ok(api_key) => settings.remote_api_key = api_key,
            Err(e) => warn!(error = %e, "stored API key is unreadable, leaving it empty"),
        }

        self.custom_instruction = match self.read_custom_instruction() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "stored custom instruction is unreadable");
                first_error.get_or_insert(e);
                String::new()
            }
        };

        info!(provider = settings.provider.as_str(), "loaded settings");
        self.settings = settings;
        match first_error {
            Some(e) => Err(e),
            None => Ok(self.settings.clone()),
        }
    }

    /// Writes provider and API key in one store call.
    fn save(&self) -> Result<(), SettingsError> {
        let provider = serde_json::to_value(self.settings.provider)
            .map_err(|e| SettingsError::InvalidValue(e.to_string()))?;
        let api_key = self.seal_api_key(&self.settings.remote_api_key)?;
        self.store
            .set_many(&[(PROVIDER_KEY, provider), (API_KEY_KEY, api_key)])?;
        Ok(())
    }

    fn get_settings(&self) -> &PanelSettings {
        &self.settings
    }

    fn set_provider(&mut self, provider: Provider) -> Result<(), SettingsError> {
        self.settings.provider = provider;
        self.save()
    }

    /// Stores the API key, trimmed.
    fn set_api_key(&mut self, api_key: &str) -> Result<(), SettingsError> {
        self.settings.remote_api_key = api_key.trim().to_string();
        self.save()
    }

    fn custom_instruction(&self) -> &str {
        &self.custom_instruction
    }

    fn set_custom_instruction(&mut self, instruction: &str) -> Result<(), SettingsError> {
        self.store
            .set(CUSTOM_INSTRUCTION_KEY, Value::String(instruction.to_string()))?;
        self.custom_instruction = instruction.to_string();
        Ok(())
    }
}
