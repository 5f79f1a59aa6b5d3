//! Unit tests for the SidePanel user actions.
//!
//! The panel runs against the in-memory tab host, an in-memory store and a
//! scripted on-device model.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tabio::app::{SidePanel, StopHandle};
use tabio::database::MemoryStore;
use tabio::managers::memory_host::InMemoryTabHost;
use tabio::managers::tab_host::{GroupUpdate, TabHost};
use tabio::services::crypto_service::SealingKey;
use tabio::services::on_device::{
    LanguageModelFactory, LanguageModelSession, PromptOptions, SessionParams,
};
use tabio::types::errors::{HistoryError, MutationError, OrganizeError, PromptError};
use tabio::types::settings::Provider;
use tabio::types::tab::{GroupColor, GroupId, HostGroup, HostTab, TabId, TAB_GROUP_ID_NONE};
use tabio::types::view::PanelStatus;

const THREE_GROUPS: &str = r#"[
    {"category": "Work", "tabIds": [1, 2]},
    {"category": "News", "tabIds": [3, 4]},
    {"category": "Fun", "tabIds": [5, 6]}
]"#;

/// Scripted model: answers every prompt with `reply`, or waits for the
/// cancel signal when `reply` is `None`.
struct ScriptedModel {
    available: AtomicBool,
    reply: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
    sessions: AtomicUsize,
}

struct ScriptedSession {
    reply: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl LanguageModelSession for ScriptedSession {
    async fn prompt(&mut self, prompt: &str, options: PromptOptions) -> Result<String, PromptError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => {
                options.signal.cancelled().await;
                Err(PromptError::Aborted)
            }
        }
    }
}

#[async_trait]
impl LanguageModelFactory for ScriptedModel {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn create(&self, _params: &SessionParams) -> Result<Box<dyn LanguageModelSession>, PromptError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            reply: self.reply.clone(),
            prompts: self.prompts.clone(),
        }))
    }
}

fn model(reply: Option<&str>) -> Arc<ScriptedModel> {
    Arc::new(ScriptedModel {
        available: AtomicBool::new(true),
        reply: reply.map(str::to_string),
        prompts: Arc::new(Mutex::new(Vec::new())),
        sessions: AtomicUsize::new(0),
    })
}

fn six_tabs() -> Arc<InMemoryTabHost> {
    Arc::new(InMemoryTabHost::with_tabs([
        ("Rust docs", "https://doc.rust-lang.org/"),
        ("Issue tracker", "https://github.com/issues"),
        ("Headlines", "https://news.test/"),
        ("World", "https://world.test/"),
        ("Cat video", "https://video.test/cats"),
        ("Game", "https://games.test/"),
    ]))
}

fn key() -> SealingKey {
    SealingKey::generate().unwrap()
}

fn panel(host: &Arc<InMemoryTabHost>, model: &Arc<ScriptedModel>) -> SidePanel {
    SidePanel::new(host.clone(), Arc::new(MemoryStore::new()), model.clone(), key())
}

/// Host that presses stop the first time tabs are grouped.
struct StopWhileGrouping {
    inner: Arc<InMemoryTabHost>,
    handle: Mutex<Option<StopHandle>>,
    stopped: AtomicBool,
}

#[async_trait]
impl TabHost for StopWhileGrouping {
    async fn query_tabs(&self) -> Result<Vec<HostTab>, MutationError> {
        self.inner.query_tabs().await
    }

    async fn query_groups(&self) -> Result<Vec<HostGroup>, MutationError> {
        self.inner.query_groups().await
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<HostTab, MutationError> {
        self.inner.get_tab(tab_id).await
    }

    async fn group_tabs(&self, tab_ids: &[TabId], group: Option<GroupId>) -> Result<GroupId, MutationError> {
        if let Some(handle) = self.handle.lock().unwrap().as_ref() {
            if handle.stop() {
                self.stopped.store(true, Ordering::SeqCst);
            }
        }
        self.inner.group_tabs(tab_ids, group).await
    }

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), MutationError> {
        self.inner.ungroup_tabs(tab_ids).await
    }

    async fn update_group(&self, group: GroupId, update: GroupUpdate) -> Result<(), MutationError> {
        self.inner.update_group(group, update).await
    }

    async fn move_tab(&self, tab_id: TabId, index: usize) -> Result<(), MutationError> {
        self.inner.move_tab(tab_id, index).await
    }
}

// === Organize Tests ===

#[tokio::test]
async fn test_organize_groups_tabs_and_reports_results() {
    let host = six_tabs();
    let mut panel = panel(&host, &model(Some(THREE_GROUPS)));
    panel.startup().await;
    assert_eq!(panel.view().tab_count(), 6);

    let report = panel.organize().await.unwrap();
    assert_eq!(report.created_count(), 3);
    assert_eq!(
        host.grouping(),
        vec![
            ("Fun".to_string(), GroupColor::Yellow, vec![5, 6]),
            ("News".to_string(), GroupColor::Red, vec![3, 4]),
            ("Work".to_string(), GroupColor::Blue, vec![1, 2]),
        ]
    );
    assert_eq!(
        panel.status(),
        &PanelStatus::Results(vec![
            "✓ Work: 2 tabs".to_string(),
            "✓ News: 2 tabs".to_string(),
            "✓ Fun: 2 tabs".to_string(),
        ])
    );

    let controls = panel.controls();
    assert!(controls.organize_visible && controls.organize_enabled);
    assert!(!controls.stop_visible);
    assert!(controls.undo_enabled);
    assert!(!controls.redo_enabled);
    assert_eq!(panel.view().groups.len(), 3);
    assert!(!panel.stop_handle().is_armed());
}

#[tokio::test]
async fn test_organize_prompt_skips_internal_pages_and_carries_instruction() {
    let host = six_tabs();
    host.open_tab("Extensions", "chrome://extensions/");
    let model = model(Some(THREE_GROUPS));
    let mut panel = panel(&host, &model);
    panel.set_custom_instruction("  Keep news apart  ").unwrap();

    panel.organize().await.unwrap();
    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Additional Instructions:\nKeep news apart"));
    assert!(prompts[0].contains("Tabs to organize:"));
    assert!(prompts[0].contains("Rust docs"));
    assert!(!prompts[0].contains("chrome://extensions/"));
}

#[tokio::test]
async fn test_stop_aborts_run_and_leaves_groups_alone() {
    let host = six_tabs();
    let mut panel = panel(&host, &model(None));
    let handle = panel.stop_handle();
    assert!(!handle.stop(), "nothing to stop before a run");

    let (result, stopped) = tokio::join!(panel.organize(), async {
        while !handle.is_armed() {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
        handle.stop()
    });

    assert!(stopped);
    assert_eq!(result, Err(OrganizeError::AbortedByUser));
    assert!(host.groups().is_empty());
    assert_eq!(panel.status(), &PanelStatus::Notice("Stopped by user".to_string()));

    let controls = panel.controls();
    assert!(controls.organize_visible && controls.organize_enabled);
    assert!(!controls.stop_visible);
    assert!(!handle.is_armed());
}

#[tokio::test]
async fn test_stop_during_grouping_finishes_and_resets_session() {
    let inner = six_tabs();
    let host = Arc::new(StopWhileGrouping {
        inner: inner.clone(),
        handle: Mutex::new(None),
        stopped: AtomicBool::new(false),
    });
    let model = model(Some(THREE_GROUPS));
    let mut panel = SidePanel::new(host.clone(), Arc::new(MemoryStore::new()), model.clone(), key());
    *host.handle.lock().unwrap() = Some(panel.stop_handle());

    let report = panel.organize().await.unwrap();
    assert!(host.stopped.load(Ordering::SeqCst));
    assert_eq!(report.created_count(), 3);
    assert_eq!(inner.groups().len(), 3);
    assert!(matches!(panel.status(), PanelStatus::Results(_)));
    assert_eq!(model.sessions.load(Ordering::SeqCst), 1);

    *host.handle.lock().unwrap() = None;
    panel.organize().await.unwrap();
    assert_eq!(model.sessions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_window_has_no_tabs() {
    let host = Arc::new(InMemoryTabHost::new());
    let mut panel = panel(&host, &model(Some(THREE_GROUPS)));
    assert_eq!(panel.organize().await, Err(OrganizeError::NoTabs));
    assert_eq!(
        panel.status(),
        &PanelStatus::Error("No tabs found to organize.".to_string())
    );
}

#[tokio::test]
async fn test_internal_pages_only_have_no_regular_tabs() {
    let host = Arc::new(InMemoryTabHost::with_tabs([
        ("Settings", "chrome://settings/"),
        ("Panel", "chrome-extension://abc/panel.html"),
    ]));
    let model = model(Some(THREE_GROUPS));
    let mut panel = panel(&host, &model);
    assert_eq!(panel.organize().await, Err(OrganizeError::NoRegularTabs));
    assert!(model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_reply_is_reported() {
    let host = six_tabs();
    let mut panel = panel(&host, &model(Some("Sure! Here are your groups.")));
    assert!(matches!(
        panel.organize().await,
        Err(OrganizeError::MalformedResponse(_))
    ));
    assert_eq!(
        panel.status(),
        &PanelStatus::Error("AI returned invalid format. Please try again.".to_string())
    );
    assert!(host.groups().is_empty());
}

#[tokio::test]
async fn test_all_groups_failing_is_reported() {
    let host = six_tabs();
    for id in 1..=6 {
        host.fail_grouping_for(id);
    }
    let mut panel = panel(&host, &model(Some(THREE_GROUPS)));
    assert_eq!(panel.organize().await, Err(OrganizeError::NoGroupsCreated));
}

// === History Tests ===

#[tokio::test]
async fn test_undo_and_redo_organize() {
    let host = six_tabs();
    let mut panel = panel(&host, &model(Some(THREE_GROUPS)));
    assert_eq!(panel.undo().await, Ok(false));

    panel.organize().await.unwrap();
    let organized = host.grouping();

    assert_eq!(panel.undo().await, Ok(true));
    assert!(host.groups().is_empty());
    assert!(panel.controls().redo_enabled);
    assert!(!panel.controls().undo_enabled);

    assert_eq!(panel.redo().await, Ok(true));
    assert_eq!(host.grouping(), organized);
    assert_eq!(panel.redo().await, Ok(false));
}

#[tokio::test]
async fn test_failed_undo_sets_status() {
    let host = six_tabs();
    let mut panel = panel(&host, &model(Some(THREE_GROUPS)));
    panel.organize().await.unwrap();

    host.set_fail_queries(true);
    assert!(matches!(panel.undo().await, Err(HistoryError::RestoreFailed(_))));
    assert_eq!(panel.status(), &PanelStatus::Error("Failed to undo".to_string()));
    assert!(panel.controls().undo_enabled);
}

#[tokio::test]
async fn test_history_survives_a_new_panel() {
    let host = six_tabs();
    let store = Arc::new(MemoryStore::new());
    let model = model(Some(THREE_GROUPS));
    {
        let mut first = SidePanel::new(host.clone(), store.clone(), model.clone(), key());
        first.organize().await.unwrap();
    }
    let mut second = SidePanel::new(host.clone(), store, model, key());
    assert!(second.controls().undo_enabled);
    assert_eq!(second.undo().await, Ok(true));
    assert!(host.groups().is_empty());
}

// === Manual Editing Tests ===

#[tokio::test]
async fn test_ungroup_all_checkpoints_only_when_grouped() {
    let host = six_tabs();
    let mut panel = panel(&host, &model(Some(THREE_GROUPS)));
    assert_eq!(panel.ungroup_all().await, Ok(0));
    assert!(!panel.history().can_undo());

    panel.organize().await.unwrap();
    assert_eq!(panel.ungroup_all().await, Ok(6));
    assert_eq!(panel.history().undo_stack().len(), 2);
    assert!(host.groups().is_empty());
    assert!(panel.controls().ungroup_enabled);
    assert_eq!(panel.view().groups.len(), 1);
}

#[tokio::test]
async fn test_drag_and_drop_moves() {
    let host = six_tabs();
    let mut panel = panel(&host, &model(Some(THREE_GROUPS)));
    let report = panel.organize().await.unwrap();
    let work = report.created[0].group_id;

    assert_eq!(panel.move_tab_to_group(5, work).await, Ok(true));
    assert_eq!(panel.view().group(work).unwrap().tabs.len(), 3);
    assert_eq!(panel.move_tab_to_group(5, work).await, Ok(false));

    assert_eq!(panel.move_tab_to_tab(6, 6).await, Ok(false));
    assert_eq!(panel.move_tab_to_tab(6, 1).await, Ok(true));
    assert_eq!(panel.view().group(work).unwrap().tabs.len(), 4);

    assert_eq!(panel.move_tab_to_group(6, TAB_GROUP_ID_NONE).await, Ok(true));
    assert!(panel.view().group(TAB_GROUP_ID_NONE).is_some());
    assert_eq!(panel.history().undo_stack().len(), 4);
}

#[tokio::test]
async fn test_failed_move_sets_status() {
    let host = six_tabs();
    let mut panel = panel(&host, &model(Some(THREE_GROUPS)));
    assert!(panel.move_tab_to_tab(1, 99).await.is_err());
    assert_eq!(panel.status(), &PanelStatus::Error("Failed to move tab".to_string()));
}

#[tokio::test]
async fn test_rename_group() {
    let host = six_tabs();
    let mut panel = panel(&host, &model(Some(THREE_GROUPS)));
    let work = panel.organize().await.unwrap().created[0].group_id;
    let undo_depth = panel.history().undo_stack().len();

    assert!(panel.rename_group(work, "  Deep Work ").await);
    assert_eq!(panel.view().group(work).unwrap().title, "Deep Work");
    assert!(!panel.rename_group(work, "   ").await);
    assert_eq!(panel.history().undo_stack().len(), undo_depth);

    assert!(!panel.rename_group(999, "Ghost").await);
    assert_eq!(
        panel.status(),
        &PanelStatus::Error("Failed to update group title".to_string())
    );
}

// === Availability Tests ===

#[tokio::test]
async fn test_unavailable_on_device_model_disables_organize() {
    let host = six_tabs();
    let model = model(Some(THREE_GROUPS));
    model.available.store(false, Ordering::SeqCst);
    let mut panel = panel(&host, &model);
    panel.startup().await;

    assert!(!panel.controls().organize_enabled);
    assert_eq!(
        panel.status(),
        &PanelStatus::Error(
            "AI Model not available. Please check Chrome flags and download the model."
                .to_string()
        )
    );
}

#[tokio::test]
async fn test_remote_provider_needs_api_key() {
    let host = six_tabs();
    let mut panel = panel(&host, &model(Some(THREE_GROUPS)));
    panel.set_provider(Provider::Remote).unwrap();

    assert_eq!(panel.settings().provider, Provider::Remote);
    assert!(!panel.controls().organize_enabled);
    assert_eq!(
        panel.status(),
        &PanelStatus::Error(
            "OpenRouter API key not set. Please add your API key in settings.".to_string()
        )
    );

    panel.set_api_key("sk-or-v1-test").unwrap();
    assert!(panel.controls().organize_enabled);
    assert!(panel.check_availability());
}
