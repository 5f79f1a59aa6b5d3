//! Side panel core for Tabio.
//!
//! Central struct wiring the group mutator, history, prompt runner and
//! settings together. Each public async method is one user action of the
//! panel; `&mut self` serializes them.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::database::KeyValueStore;
use crate::managers::group_mutator::{ApplyReport, GroupMutator};
use crate::managers::history_manager::HistoryManager;
use crate::managers::settings_manager::{SettingsManager, SettingsManagerTrait};
use crate::managers::tab_host::TabHost;
use crate::services::category_normalizer::normalize_categories;
use crate::services::crypto_service::SealingKey;
use crate::services::on_device::LanguageModelFactory;
use crate::services::prompt_builder::build_organize_prompt;
use crate::services::prompt_runner::{categorization_schema, PromptRunner};
use crate::services::response_parser::parse_response;
use crate::types::errors::{HistoryError, MutationError, OrganizeError, PromptError, SettingsError};
use crate::types::settings::{PanelSettings, Provider};
use crate::types::tab::{GroupId, HostTab, Tab, TabId};
use crate::types::view::{PanelControls, PanelStatus, TabListView};

/// Cloneable handle that stops the organize run in flight.
#[derive(Clone, Default)]
pub struct StopHandle {
    token: Arc<Mutex<Option<CancellationToken>>>,
}

impl StopHandle {
    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.clone());
        }
        token
    }

    fn disarm(&self) {
        if let Ok(mut slot) = self.token.lock() {
            slot.take();
        }
    }

    /// Cancels the current run. Returns false when nothing was running.
    pub fn stop(&self) -> bool {
        let token = self.token.lock().ok().and_then(|mut slot| slot.take());
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.token.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

/// The side panel: state plus user actions.
pub struct SidePanel {
    mutator: GroupMutator,
    history: HistoryManager,
    runner: PromptRunner,
    settings: SettingsManager,
    factory: Arc<dyn LanguageModelFactory>,
    stop: StopHandle,
    controls: PanelControls,
    status: PanelStatus,
    view: TabListView,
}

impl SidePanel {
    /// Creates the panel, loading settings and history from `store`. The API
    /// key is sealed under `sealing_key`.
    ///
    /// Unreadable settings entries fall back to their defaults.
    pub fn new(
        host: Arc<dyn TabHost>,
        store: Arc<dyn KeyValueStore>,
        factory: Arc<dyn LanguageModelFactory>,
        sealing_key: SealingKey,
    ) -> Self {
        let mut settings = SettingsManager::new(store.clone(), sealing_key);
        if let Err(e) = settings.load() {
            warn!(error = %e, "some settings could not be loaded, using defaults for them");
        }
        let history = HistoryManager::load(store);
        let runner = PromptRunner::from_settings(settings.get_settings(), factory.clone());

        let mut panel = Self {
            mutator: GroupMutator::new(host),
            history,
            runner,
            settings,
            factory,
            stop: StopHandle::default(),
            controls: PanelControls::default(),
            status: PanelStatus::Idle,
            view: TabListView::default(),
        };
        panel.sync_history_controls();
        panel
    }

    /// Startup sequence: availability check, then the first tab list.
    pub async fn startup(&mut self) {
        self.check_availability();
        self.refresh_logged().await;
    }

    pub fn controls(&self) -> &PanelControls {
        &self.controls
    }

    pub fn status(&self) -> &PanelStatus {
        &self.status
    }

    pub fn view(&self) -> &TabListView {
        &self.view
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn settings(&self) -> &PanelSettings {
        self.settings.get_settings()
    }

    pub fn custom_instruction(&self) -> &str {
        self.settings.custom_instruction()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn sync_history_controls(&mut self) {
        self.controls.undo_enabled = self.history.can_undo();
        self.controls.redo_enabled = self.history.can_redo();
    }

    async fn refresh_logged(&mut self) {
        if let Err(e) = self.refresh().await {
            error!(error = %e, "failed to load tabs");
        }
    }

    // === Organize ===

    /// Groups the window's tabs by the model's categories.
    ///
    /// Controls are restored on every exit. A stop request that arrives before
    /// group creation starts ends the run with [`OrganizeError::AbortedByUser`]
    /// and leaves the groups untouched. Applying the groups cannot be
    /// interrupted; a stop arriving then lets the run finish. Either way the
    /// model session is reset after a stop.
    pub async fn organize(&mut self) -> Result<ApplyReport, OrganizeError> {
        let cancel = self.stop.arm();
        self.controls.organize_enabled = false;
        self.controls.organize_visible = false;
        self.controls.stop_visible = true;

        let outcome = self.run_organize(&cancel).await;

        self.stop.disarm();
        if cancel.is_cancelled() {
            self.runner.reset();
        }
        self.controls.organize_visible = true;
        self.controls.organize_enabled = self.runner.check_available().is_ok();
        self.controls.stop_visible = false;
        self.sync_history_controls();

        match &outcome {
            Ok(report) => {
                info!(groups = report.created_count(), failed = report.failed, "organized tabs");
                self.status = PanelStatus::Results(
                    report
                        .created
                        .iter()
                        .map(|g| format!("✓ {}: {} tabs", g.name, g.tab_count))
                        .collect(),
                );
                self.refresh_logged().await;
            }
            Err(OrganizeError::AbortedByUser) => {
                info!("organize stopped by user");
                self.status = PanelStatus::Notice(OrganizeError::AbortedByUser.user_message());
            }
            Err(e) => {
                warn!(error = %e, "organize failed");
                self.status = PanelStatus::Error(e.user_message());
            }
        }
        outcome
    }

    async fn run_organize(&mut self, cancel: &CancellationToken) -> Result<ApplyReport, OrganizeError> {
        self.history.record_checkpoint(&self.mutator).await;

        let host_tabs = self
            .mutator
            .host()
            .query_tabs()
            .await
            .map_err(|e| OrganizeError::Host(e.to_string()))?;
        if host_tabs.is_empty() {
            return Err(OrganizeError::NoTabs);
        }
        let tabs: Vec<Tab> = host_tabs
            .iter()
            .map(HostTab::to_tab)
            .filter(|t| !t.is_internal())
            .collect();
        if tabs.is_empty() {
            return Err(OrganizeError::NoRegularTabs);
        }

        let prompt = build_organize_prompt(&tabs, self.settings.custom_instruction());
        let schema = categorization_schema();
        let reply = match self.runner.run(&prompt, Some(&schema), cancel).await {
            Ok(reply) => reply,
            Err(e) if e.is_abort() => return Err(OrganizeError::AbortedByUser),
            Err(e) => return Err(OrganizeError::Backend(e.to_string())),
        };

        let raw = parse_response(&reply)?;
        let categories = normalize_categories(&raw, &tabs)?;
        if cancel.is_cancelled() {
            return Err(OrganizeError::AbortedByUser);
        }

        let report = self.mutator.apply_categories(&categories).await;
        if report.created.is_empty() {
            return Err(OrganizeError::NoGroupsCreated);
        }
        Ok(report)
    }

    /// Stops the organize run in flight, if any.
    pub fn stop(&self) -> bool {
        self.stop.stop()
    }

    /// Discards the on-device model session.
    pub fn reset(&mut self) {
        self.runner.reset();
    }

    // === Manual editing ===

    /// Ungroups every tab of the window. No checkpoint is taken when nothing
    /// is grouped.
    pub async fn ungroup_all(&mut self) -> Result<usize, MutationError> {
        self.controls.ungroup_enabled = false;
        let result = self.run_ungroup_all().await;
        self.controls.ungroup_enabled = true;
        self.sync_history_controls();

        match &result {
            Ok(0) => {}
            Ok(count) => {
                info!(tabs = count, "ungrouped all tabs");
                self.refresh_logged().await;
            }
            Err(e) => {
                error!(error = %e, "failed to ungroup tabs");
                self.status = PanelStatus::Error(format!("Error: {}", e));
            }
        }
        result
    }

    async fn run_ungroup_all(&mut self) -> Result<usize, MutationError> {
        if !self.mutator.has_grouped_tabs().await? {
            return Ok(0);
        }
        self.history.record_checkpoint(&self.mutator).await;
        self.mutator.ungroup_all().await
    }

    /// Drops `dragged` onto `target`. Returns false for a drop onto itself.
    pub async fn move_tab_to_tab(&mut self, dragged: TabId, target: TabId) -> Result<bool, MutationError> {
        if dragged == target {
            return Ok(false);
        }
        self.history.record_checkpoint(&self.mutator).await;
        self.sync_history_controls();

        if let Err(e) = self.mutator.move_tab_to_tab(dragged, target).await {
            error!(dragged, target, error = %e, "failed to move tab");
            self.status = PanelStatus::Error("Failed to move tab".to_string());
            return Err(e);
        }
        self.refresh_logged().await;
        Ok(true)
    }

    /// Drops `tab` onto a group bucket; the ungrouped bucket ungroups it.
    /// Returns false when the tab already is in that bucket.
    pub async fn move_tab_to_group(&mut self, tab: TabId, group: GroupId) -> Result<bool, MutationError> {
        let current = self.mutator.host().get_tab(tab).await?;
        if current.group_id == group {
            return Ok(false);
        }
        self.history.record_checkpoint(&self.mutator).await;
        self.sync_history_controls();

        match self.mutator.move_tab_to_group(tab, group).await {
            Ok(moved) => {
                self.refresh_logged().await;
                Ok(moved)
            }
            Err(e) => {
                error!(tab, group, error = %e, "failed to move tab to group");
                self.status = PanelStatus::Error("Failed to move tab to group".to_string());
                Err(e)
            }
        }
    }

    /// Renames a group. Blank titles are rejected without touching the host.
    pub async fn rename_group(&mut self, group: GroupId, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        if self.mutator.rename_group(group, title).await {
            self.refresh_logged().await;
            true
        } else {
            self.status = PanelStatus::Error("Failed to update group title".to_string());
            false
        }
    }

    /// Reloads the tab list.
    pub async fn refresh(&mut self) -> Result<&TabListView, MutationError> {
        self.view = self.mutator.tab_list().await?;
        Ok(&self.view)
    }

    // === History ===

    /// Steps back one action. Returns false when there is nothing to undo.
    pub async fn undo(&mut self) -> Result<bool, HistoryError> {
        let result = self.history.undo(&self.mutator).await;
        self.finish_history_step(result, "Failed to undo").await
    }

    /// Steps forward one undone action. Returns false when there is nothing to redo.
    pub async fn redo(&mut self) -> Result<bool, HistoryError> {
        let result = self.history.redo(&self.mutator).await;
        self.finish_history_step(result, "Failed to redo").await
    }

    async fn finish_history_step<T>(
        &mut self,
        result: Result<T, HistoryError>,
        failure: &str,
    ) -> Result<bool, HistoryError> {
        self.sync_history_controls();
        match result {
            Ok(_) => {
                self.refresh_logged().await;
                Ok(true)
            }
            Err(HistoryError::EmptyHistory) => Ok(false),
            Err(e) => {
                self.status = PanelStatus::Error(failure.to_string());
                Err(e)
            }
        }
    }

    // === Settings ===

    pub fn set_provider(&mut self, provider: Provider) -> Result<(), SettingsError> {
        let saved = self.settings.set_provider(provider);
        self.rebuild_runner();
        saved
    }

    pub fn set_api_key(&mut self, api_key: &str) -> Result<(), SettingsError> {
        let saved = self.settings.set_api_key(api_key);
        self.rebuild_runner();
        saved
    }

    pub fn set_custom_instruction(&mut self, instruction: &str) -> Result<(), SettingsError> {
        self.settings.set_custom_instruction(instruction)
    }

    fn rebuild_runner(&mut self) {
        self.runner.reset();
        self.runner = PromptRunner::from_settings(self.settings.get_settings(), self.factory.clone());
        self.check_availability();
    }

    /// Enables organize only when the selected backend can run.
    pub fn check_availability(&mut self) -> bool {
        match self.runner.check_available() {
            Ok(()) => {
                self.controls.organize_enabled = true;
                true
            }
            Err(e) => {
                let message = match e {
                    PromptError::Unavailable(msg) => msg,
                    other => other.to_string(),
                };
                warn!(provider = self.runner.provider().as_str(), %message, "model unavailable");
                self.status = PanelStatus::Error(message);
                self.controls.organize_enabled = false;
                false
            }
        }
    }
}
