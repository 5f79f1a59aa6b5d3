use std::fmt;

use super::tab::{GroupId, TabId};

// === OrganizeError ===

/// Outcomes that end an organize run without grouping tabs.
#[derive(Debug, Clone, PartialEq)]
pub enum OrganizeError {
    /// The model's text is not a JSON array (or an object wrapping one under `items`).
    MalformedResponse(String),
    /// Normalization left nothing to group.
    NoUsableCategories,
    /// The user stopped the run while the model was working.
    AbortedByUser,
    /// The window has no tabs at all.
    NoTabs,
    /// The window only holds browser-internal pages.
    NoRegularTabs,
    /// Every group creation in the batch failed.
    NoGroupsCreated,
    /// The prompt backend failed for a reason other than cancellation.
    Backend(String),
    /// The host browser could not be queried.
    Host(String),
}

impl OrganizeError {
    /// Short text for the panel's status area.
    pub fn user_message(&self) -> String {
        match self {
            OrganizeError::MalformedResponse(_) => {
                "AI returned invalid format. Please try again.".to_string()
            }
            OrganizeError::NoUsableCategories => {
                "AI returned no usable categories. Please try again.".to_string()
            }
            OrganizeError::AbortedByUser => "Stopped by user".to_string(),
            OrganizeError::NoTabs => "No tabs found to organize.".to_string(),
            OrganizeError::NoRegularTabs => {
                "No regular tabs found to organize (only Chrome internal pages).".to_string()
            }
            OrganizeError::NoGroupsCreated => {
                "Failed to create any tab groups. Please try again.".to_string()
            }
            OrganizeError::Backend(msg) | OrganizeError::Host(msg) => format!("Error: {}", msg),
        }
    }
}

impl fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizeError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            OrganizeError::NoUsableCategories => write!(f, "No usable categories"),
            OrganizeError::AbortedByUser => write!(f, "Stopped by user"),
            OrganizeError::NoTabs => write!(f, "No tabs to organize"),
            OrganizeError::NoRegularTabs => write!(f, "No regular tabs to organize"),
            OrganizeError::NoGroupsCreated => write!(f, "No tab groups created"),
            OrganizeError::Backend(msg) => write!(f, "Prompt backend error: {}", msg),
            OrganizeError::Host(msg) => write!(f, "Tab host error: {}", msg),
        }
    }
}

impl std::error::Error for OrganizeError {}

// === PromptError ===

/// Errors raised while running a prompt against a model backend.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptError {
    /// The call was cancelled.
    Aborted,
    /// The selected backend cannot run (missing API key, model not downloaded).
    Unavailable(String),
    /// The on-device session could not be created.
    SessionCreation(String),
    /// A network error occurred while talking to the remote backend.
    Network(String),
    /// The remote backend answered with a non-success status.
    Provider { status: u16, message: String },
    /// The backend answered with an unexpected body.
    InvalidReply(String),
    /// The on-device model failed.
    Model(String),
}

impl PromptError {
    /// True when this error is (or reads like) a cancellation.
    pub fn is_abort(&self) -> bool {
        match self {
            PromptError::Aborted => true,
            other => other.to_string().to_lowercase().contains("abort"),
        }
    }
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::Aborted => write!(f, "Prompt aborted"),
            PromptError::Unavailable(msg) => write!(f, "Model unavailable: {}", msg),
            PromptError::SessionCreation(msg) => {
                write!(f, "Failed to create model session: {}", msg)
            }
            PromptError::Network(msg) => write!(f, "Model network error: {}", msg),
            PromptError::Provider { status, message } => {
                write!(f, "Model provider error ({}): {}", status, message)
            }
            PromptError::InvalidReply(msg) => write!(f, "Invalid model reply: {}", msg),
            PromptError::Model(msg) => write!(f, "Model error: {}", msg),
        }
    }
}

impl std::error::Error for PromptError {}

// === MutationError ===

/// Errors reported by the host browser's tab and group API.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationError {
    /// No tab with the given id exists.
    TabNotFound(TabId),
    /// No group with the given id exists.
    GroupNotFound(GroupId),
    /// The host rejected the call.
    Host(String),
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationError::TabNotFound(id) => write!(f, "Tab not found: {}", id),
            MutationError::GroupNotFound(id) => write!(f, "Tab group not found: {}", id),
            MutationError::Host(msg) => write!(f, "Tab host error: {}", msg),
        }
    }
}

impl std::error::Error for MutationError {}

// === HistoryError ===

/// Errors related to undo/redo history.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// Undo or redo was invoked with nothing to step to.
    EmptyHistory,
    /// Restoring a snapshot failed; both stacks were rolled back.
    RestoreFailed(String),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::EmptyHistory => write!(f, "History is empty"),
            HistoryError::RestoreFailed(msg) => write!(f, "Failed to restore snapshot: {}", msg),
        }
    }
}

impl std::error::Error for HistoryError {}

// === StorageError ===

/// Errors related to the key-value store.
#[derive(Debug)]
pub enum StorageError {
    /// Database operation failed.
    DatabaseError(String),
    /// A stored value could not be (de)serialized.
    SerializationError(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::DatabaseError(msg) => write!(f, "Storage database error: {}", msg),
            StorageError::SerializationError(msg) => {
                write!(f, "Storage serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// The underlying store failed.
    Storage(String),
    /// Sealing or unsealing the API key failed.
    Crypto(String),
    /// A stored settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Storage(msg) => write!(f, "Settings storage error: {}", msg),
            SettingsError::Crypto(msg) => write!(f, "Settings crypto error: {}", msg),
            SettingsError::InvalidValue(msg) => write!(f, "Invalid settings value: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<StorageError> for SettingsError {
    fn from(e: StorageError) -> Self {
        SettingsError::Storage(e.to_string())
    }
}

impl From<CryptoError> for SettingsError {
    fn from(e: CryptoError) -> Self {
        SettingsError::Crypto(e.to_string())
    }
}

// === CryptoError ===

/// Errors related to cryptographic operations.
#[derive(Debug)]
pub enum CryptoError {
    /// The key file could not be read or written.
    KeyStorage(String),
    /// Encryption operation failed.
    Encryption(String),
    /// Decryption operation failed.
    Decryption(String),
    /// Failed to generate random bytes.
    RandomGeneration(String),
    /// The provided key is invalid.
    InvalidKey(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::KeyStorage(msg) => write!(f, "Key file error: {}", msg),
            CryptoError::Encryption(msg) => write!(f, "Encryption failed: {}", msg),
            CryptoError::Decryption(msg) => write!(f, "Decryption failed: {}", msg),
            CryptoError::RandomGeneration(msg) => {
                write!(f, "Random generation failed: {}", msg)
            }
            CryptoError::InvalidKey(msg) => write!(f, "Invalid key: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}
