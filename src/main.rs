//! Tabio: AI tab organizer side panel core.
//!
//! Demo mode: organizes an in-memory browser window with a keyword-based
//! stand-in for the on-device model, then walks through undo and redo.
//! Set `OPENROUTER_API_KEY` to use the remote backend instead.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use tabio::app::SidePanel;
use tabio::database::{KeyValueStore, MemoryStore, SqliteStore};
use tabio::managers::memory_host::InMemoryTabHost;
use tabio::services::crypto_service::SealingKey;
use tabio::services::on_device::{LanguageModelFactory, LanguageModelSession, PromptOptions, SessionParams};
use tabio::types::errors::PromptError;
use tabio::types::settings::Provider;
use tabio::types::tab::{Tab, TabId};
use tabio::types::view::{PanelStatus, TabListView};

const SAMPLE_TABS: [(&str, &str); 10] = [
    ("rust-lang/rust: Empowering everyone", "https://github.com/rust-lang/rust"),
    ("tokio - Rust", "https://docs.rs/tokio/latest/tokio/"),
    ("Lo-fi beats to code to", "https://www.youtube.com/watch?v=jfKfPfyJRdk"),
    ("Mechanical keyboard - Amazon", "https://www.amazon.com/s?k=mechanical+keyboard"),
    ("World news | BBC", "https://www.bbc.com/news/world"),
    ("How do I borrow mutably twice?", "https://stackoverflow.com/questions/30073684"),
    ("Extensions", "chrome://extensions/"),
    ("Desk lamp - eBay", "https://www.ebay.com/sch/desk+lamp"),
    ("Trailer - Netflix", "https://www.netflix.com/title/80057281"),
    ("The New York Times", "https://www.nytimes.com/"),
];

/// Keyword-matching stand-in for the on-device model.
struct KeywordModel;

struct KeywordSession;

#[async_trait]
impl LanguageModelFactory for KeywordModel {
    fn is_available(&self) -> bool {
        true
    }

    async fn create(&self, _params: &SessionParams) -> Result<Box<dyn LanguageModelSession>, PromptError> {
        Ok(Box::new(KeywordSession))
    }
}

#[async_trait]
impl LanguageModelSession for KeywordSession {
    async fn prompt(&mut self, prompt: &str, _options: PromptOptions) -> Result<String, PromptError> {
        let listing = prompt
            .split("Tabs to organize:\n")
            .nth(1)
            .ok_or_else(|| PromptError::Model("prompt has no tab listing".to_string()))?;
        let tabs: Vec<Tab> =
            serde_json::from_str(listing).map_err(|e| PromptError::Model(e.to_string()))?;

        let mut categories: Vec<(&str, Vec<TabId>)> = Vec::new();
        for tab in &tabs {
            let name = keyword_category(&tab.url);
            match categories.iter_mut().find(|(c, _)| *c == name) {
                Some((_, ids)) => ids.push(tab.id),
                None => categories.push((name, vec![tab.id])),
            }
        }
        let reply: Vec<serde_json::Value> = categories
            .into_iter()
            .map(|(category, ids)| json!({ "category": category, "tabIds": ids }))
            .collect();
        Ok(serde_json::Value::Array(reply).to_string())
    }
}

fn keyword_category(url: &str) -> &'static str {
    let matches = |words: &[&str]| words.iter().any(|w| url.contains(w));
    if matches(&["github.com", "docs.rs", "crates.io", "stackoverflow.com"]) {
        "Development"
    } else if matches(&["youtube.com", "netflix.com"]) {
        "Entertainment"
    } else if matches(&["amazon.", "ebay."]) {
        "Shopping"
    } else if matches(&["news", "nytimes.com"]) {
        "News"
    } else {
        "Research"
    }
}

/// Directory holding `tabio.db` and `tabio.key`: `TABIO_DATA_DIR`, else the executable's directory.
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TABIO_DATA_DIR") {
        return PathBuf::from(dir);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn open_store() -> Arc<dyn KeyValueStore> {
    let path = data_dir().join("tabio.db");
    match SqliteStore::open(&path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "falling back to in-memory store");
            Arc::new(MemoryStore::new())
        }
    }
}

/// The install's sealing key. Without a usable key file, a throwaway key is
/// used and keys saved in this run will not open in the next one.
fn open_sealing_key() -> Option<SealingKey> {
    let path = data_dir().join("tabio.key");
    match SealingKey::load_or_create(&path) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "falling back to a throwaway sealing key");
            SealingKey::generate()
                .map_err(|e| error!(error = %e, "failed to generate a sealing key"))
                .ok()
        }
    }
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn print_view(view: &TabListView) {
    for group in &view.groups {
        let color = group.color.map(|c| c.as_str()).unwrap_or("-");
        println!("  [{}] {} ({} tabs)", color, group.title, group.tabs.len());
        for tab in &group.tabs {
            println!("      #{} {}", tab.id, tab.title);
        }
    }
    println!();
}

fn print_status(status: &PanelStatus) {
    match status {
        PanelStatus::Idle => {}
        PanelStatus::Notice(msg) => println!("  ℹ {}", msg),
        PanelStatus::Results(lines) => {
            for line in lines {
                println!("  {}", line);
            }
        }
        PanelStatus::Error(msg) => println!("  ✗ {}", msg),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Tabio v{} — Demo Mode                    ║", env!("CARGO_PKG_VERSION"));
    println!("║          AI tab organizer: group, undo, redo                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let host = Arc::new(InMemoryTabHost::with_tabs(SAMPLE_TABS));
    let Some(sealing_key) = open_sealing_key() else {
        return;
    };
    let mut panel = SidePanel::new(host, open_store(), Arc::new(KeywordModel), sealing_key);

    let remote_key = std::env::var("OPENROUTER_API_KEY").unwrap_or_default();
    let configured = if remote_key.trim().is_empty() {
        panel.set_provider(Provider::OnDevice)
    } else {
        panel
            .set_api_key(&remote_key)
            .and_then(|_| panel.set_provider(Provider::Remote))
    };
    if let Err(e) = configured {
        warn!(error = %e, "failed to save settings");
    }
    println!("  Provider: {}", panel.settings().provider.as_str());
    println!();

    panel.startup().await;
    section("Window");
    print_view(panel.view());

    section("Organize");
    let _ = panel.organize().await;
    print_status(panel.status());
    println!();
    print_view(panel.view());

    section("Undo");
    match panel.undo().await {
        Ok(true) => print_view(panel.view()),
        Ok(false) => println!("  Nothing to undo\n"),
        Err(e) => println!("  ✗ {}\n", e),
    }

    section("Redo");
    match panel.redo().await {
        Ok(true) => print_view(panel.view()),
        Ok(false) => println!("  Nothing to redo\n"),
        Err(e) => println!("  ✗ {}\n", e),
    }

    println!("═══════════════════════════════════════════════════════════════");
    println!(
        "  ✅ Done. Undo available: {}, redo available: {}",
        panel.controls().undo_enabled,
        panel.controls().redo_enabled
    );
    println!("═══════════════════════════════════════════════════════════════");
}
