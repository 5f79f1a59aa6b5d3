//! Integration-level unit tests for the SettingsManager public API.
//!
//! These tests exercise loading and saving through the key-value store,
//! including sealing of the remote API key, the legacy stored forms and
//! recovery from unreadable entries.

use std::sync::Arc;

use serde_json::{json, Value};
use tabio::database::{KeyValueStore, MemoryStore, SqliteStore};
use tabio::managers::settings_manager::{
    SettingsManager, SettingsManagerTrait, API_KEY_KEY, CUSTOM_INSTRUCTION_KEY, PROVIDER_KEY,
};
use tabio::services::crypto_service::SealingKey;
use tabio::types::errors::SettingsError;
use tabio::types::settings::{PanelSettings, Provider};
use tempfile::TempDir;

fn key() -> SealingKey {
    SealingKey::from_bytes(&[42u8; 32]).unwrap()
}

fn memory_manager() -> (SettingsManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (SettingsManager::new(store.clone(), key()), store)
}

/// An empty store yields the built-in defaults.
#[test]
fn test_load_defaults_from_empty_store() {
    let (mut manager, _) = memory_manager();
    let settings = manager.load().unwrap();
    assert_eq!(settings, PanelSettings::default());
    assert_eq!(settings.provider, Provider::OnDevice);
    assert_eq!(manager.custom_instruction(), "");
}

/// The API key is written sealed and reads back in clear.
#[test]
fn test_api_key_is_sealed_at_rest() {
    let (mut manager, store) = memory_manager();
    manager.set_provider(Provider::Remote).unwrap();
    manager.set_api_key("  sk-or-v1-secret  ").unwrap();
    assert_eq!(manager.get_settings().remote_api_key, "sk-or-v1-secret");

    let stored = store.get(API_KEY_KEY).unwrap().unwrap();
    assert!(stored.is_object(), "expected a sealed record, got {}", stored);
    assert!(!stored.to_string().contains("sk-or-v1-secret"));
    assert_eq!(store.get(PROVIDER_KEY).unwrap(), Some(json!("remote")));

    let mut reloaded = SettingsManager::new(store, key());
    let settings = reloaded.load().unwrap();
    assert_eq!(settings.provider, Provider::Remote);
    assert_eq!(settings.remote_api_key, "sk-or-v1-secret");
}

/// Clearing the key stores null rather than a sealed empty string.
#[test]
fn test_empty_api_key_is_stored_as_null() {
    let (mut manager, store) = memory_manager();
    manager.set_api_key("sk-1").unwrap();
    manager.set_api_key("   ").unwrap();
    assert_eq!(store.get(API_KEY_KEY).unwrap(), Some(Value::Null));

    let mut reloaded = SettingsManager::new(store, key());
    assert_eq!(reloaded.load().unwrap().remote_api_key, "");
}

/// Values written by older versions are still understood.
#[test]
fn test_legacy_values_are_accepted() {
    let (mut manager, store) = memory_manager();
    store.set(PROVIDER_KEY, json!("openrouter")).unwrap();
    store.set(API_KEY_KEY, json!(" sk-plain ")).unwrap();

    let settings = manager.load().unwrap();
    assert_eq!(settings.provider, Provider::Remote);
    assert_eq!(settings.remote_api_key, "sk-plain");
}

/// An unknown provider is reported, but the other entries still load.
#[test]
fn test_unknown_provider_is_invalid() {
    let (mut manager, store) = memory_manager();
    store.set(PROVIDER_KEY, json!("cloud-9")).unwrap();
    store.set(API_KEY_KEY, json!("sk-plain")).unwrap();
    store.set(CUSTOM_INSTRUCTION_KEY, json!("Group by project")).unwrap();

    assert!(matches!(manager.load(), Err(SettingsError::InvalidValue(_))));
    assert_eq!(manager.get_settings().provider, Provider::OnDevice);
    assert_eq!(manager.get_settings().remote_api_key, "sk-plain");
    assert_eq!(manager.custom_instruction(), "Group by project");
}

/// A key that cannot be opened is left empty without losing the other
/// entries, and the next save keeps the stored provider.
#[test]
fn test_unreadable_api_key_keeps_other_settings() {
    let (mut manager, store) = memory_manager();
    store.set(PROVIDER_KEY, json!("remote")).unwrap();
    store
        .set(API_KEY_KEY, json!({"nonce": "AAAA", "ciphertext": "AAAAAAAAAAAAAAAAAAAAAA=="}))
        .unwrap();
    store.set(CUSTOM_INSTRUCTION_KEY, json!("Group by project")).unwrap();

    let settings = manager.load().unwrap();
    assert_eq!(settings.provider, Provider::Remote);
    assert_eq!(settings.remote_api_key, "");
    assert_eq!(manager.custom_instruction(), "Group by project");

    manager.set_api_key("sk-new").unwrap();
    assert_eq!(store.get(PROVIDER_KEY).unwrap(), Some(json!("remote")));
}

/// A key sealed by another install reads as empty.
#[test]
fn test_key_sealed_elsewhere_reads_as_empty() {
    let store = Arc::new(MemoryStore::new());
    let mut elsewhere = SettingsManager::new(store.clone(), SealingKey::generate().unwrap());
    elsewhere.set_provider(Provider::Remote).unwrap();
    elsewhere.set_api_key("sk-foreign").unwrap();

    let mut manager = SettingsManager::new(store, key());
    let settings = manager.load().unwrap();
    assert_eq!(settings.provider, Provider::Remote);
    assert_eq!(settings.remote_api_key, "");
}

#[test]
fn test_custom_instruction_roundtrip() {
    let (mut manager, store) = memory_manager();
    manager
        .set_custom_instruction("Keep documentation tabs together")
        .unwrap();
    assert_eq!(
        store.get(CUSTOM_INSTRUCTION_KEY).unwrap(),
        Some(json!("Keep documentation tabs together"))
    );

    let mut reloaded = SettingsManager::new(store, key());
    reloaded.load().unwrap();
    assert_eq!(reloaded.custom_instruction(), "Keep documentation tabs together");
}

#[test]
fn test_non_text_custom_instruction_is_ignored() {
    let (mut manager, store) = memory_manager();
    store.set(CUSTOM_INSTRUCTION_KEY, json!(42)).unwrap();
    manager.load().unwrap();
    assert_eq!(manager.custom_instruction(), "");
}

/// A failed write surfaces as a storage error.
#[test]
fn test_save_failure_is_reported() {
    let (mut manager, store) = memory_manager();
    store.set_fail_writes(true);
    assert!(matches!(
        manager.set_provider(Provider::Remote),
        Err(SettingsError::Storage(_))
    ));
}

/// Settings persist across reopening the SQLite database.
#[test]
fn test_settings_persist_in_sqlite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tabio.db");
    let key_path = dir.path().join("tabio.key");
    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let mut manager = SettingsManager::new(store, SealingKey::load_or_create(&key_path).unwrap());
        manager.set_provider(Provider::Remote).unwrap();
        manager.set_api_key("sk-disk").unwrap();
        manager.set_custom_instruction("No news").unwrap();
    }

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let mut manager = SettingsManager::new(store, SealingKey::load_or_create(&key_path).unwrap());
    let settings = manager.load().unwrap();
    assert_eq!(settings.provider, Provider::Remote);
    assert_eq!(settings.remote_api_key, "sk-disk");
    assert_eq!(manager.custom_instruction(), "No news");
}
