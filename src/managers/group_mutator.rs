//! Group Mutator for Tabio.
//!
//! Captures and restores the window's grouping, turns normalized categories
//! into tab groups, and carries the manual editing operations of the panel.
//! Batch operations never stop at the first failing group: failures are
//! logged and counted in the returned report.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::managers::history_manager::SnapshotHost;
use crate::managers::tab_host::{GroupUpdate, TabHost};
use crate::types::category::Category;
use crate::types::errors::MutationError;
use crate::types::tab::{
    is_internal_url, GroupColor, GroupId, HostTab, TabGroupInfo, TabId, TabSnapshot, TAB_GROUP_ID_NONE,
};
use crate::types::view::{ListedGroup, TabListView, UNGROUPED_TITLE, UNTITLED_GROUP_TITLE};

/// Outcome of [`GroupMutator::restore_state`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub groups_restored: usize,
    pub groups_failed: usize,
}

/// One group created by [`GroupMutator::apply_categories`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedGroup {
    pub group_id: GroupId,
    pub name: String,
    pub color: GroupColor,
    pub tab_count: usize,
}

/// Outcome of [`GroupMutator::apply_categories`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub created: Vec<CreatedGroup>,
    pub failed: usize,
}

impl ApplyReport {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}

/// Tabs of one group to recreate, keyed by the group's title and color.
struct RestoreBucket {
    info: TabGroupInfo,
    tab_ids: Vec<TabId>,
}

pub struct GroupMutator {
    host: Arc<dyn TabHost>,
}

impl GroupMutator {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &Arc<dyn TabHost> {
        &self.host
    }

    /// Captures the current grouping of the window. `None` when the host
    /// cannot be queried.
    pub async fn capture_state(&self) -> Option<TabSnapshot> {
        let tabs = match self.host.query_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                error!(error = %e, "failed to capture tab group state");
                return None;
            }
        };
        let groups = match self.host.query_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                error!(error = %e, "failed to capture tab group state");
                return None;
            }
        };
        Some(TabSnapshot::capture(&tabs, &groups))
    }

    async fn grouped_tabs(&self) -> Result<Vec<TabId>, MutationError> {
        Ok(self
            .host
            .query_tabs()
            .await?
            .into_iter()
            .filter(HostTab::is_grouped)
            .map(|t| t.id)
            .collect())
    }

    /// True when at least one tab of the window is in a group.
    pub async fn has_grouped_tabs(&self) -> Result<bool, MutationError> {
        Ok(!self.grouped_tabs().await?.is_empty())
    }

    /// Rebuilds the grouping described by `snapshot`.
    ///
    /// Every grouped tab is ungrouped first, then one group is created per
    /// distinct (title, color) pair, in first-seen order. Tabs that no longer
    /// exist are skipped. A failure on one group does not stop the others.
    pub async fn restore_state(&self, snapshot: &TabSnapshot) -> Result<RestoreReport, MutationError> {
        let grouped = self.grouped_tabs().await?;
        if !grouped.is_empty() {
            self.host.ungroup_tabs(&grouped).await?;
        }

        let mut buckets: Vec<RestoreBucket> = Vec::new();
        for entry in snapshot.entries() {
            let Some(info) = &entry.group_info else {
                continue;
            };
            match buckets
                .iter_mut()
                .find(|b| b.info.title == info.title && b.info.color == info.color)
            {
                Some(bucket) => bucket.tab_ids.push(entry.id),
                None => buckets.push(RestoreBucket {
                    info: info.clone(),
                    tab_ids: vec![entry.id],
                }),
            }
        }

        let mut report = RestoreReport::default();
        for bucket in buckets {
            let mut live = Vec::with_capacity(bucket.tab_ids.len());
            for id in bucket.tab_ids {
                if self.host.get_tab(id).await.is_ok() {
                    live.push(id);
                } else {
                    debug!(tab = id, "skipping closed tab during restore");
                }
            }
            if live.is_empty() {
                continue;
            }

            match self.recreate_group(&live, &bucket.info).await {
                Ok(_) => report.groups_restored += 1,
                Err(e) => {
                    error!(title = %bucket.info.title, error = %e, "failed to restore group");
                    report.groups_failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn recreate_group(&self, tab_ids: &[TabId], info: &TabGroupInfo) -> Result<GroupId, MutationError> {
        let group = self.host.group_tabs(tab_ids, None).await?;
        self.host
            .update_group(
                group,
                GroupUpdate {
                    title: Some(info.title.clone()),
                    color: Some(info.color),
                    collapsed: Some(info.collapsed),
                },
            )
            .await?;
        Ok(group)
    }

    /// Creates one group per category, named after it and colored by its
    /// position in the category list.
    pub async fn apply_categories(&self, categories: &[Category]) -> ApplyReport {
        let mut report = ApplyReport::default();
        for (i, category) in categories.iter().enumerate() {
            if category.is_empty() {
                continue;
            }
            let color = GroupColor::for_category(i);
            let info = TabGroupInfo {
                title: category.name.clone(),
                color,
                collapsed: false,
            };
            match self.recreate_group(&category.tab_ids, &info).await {
                Ok(group_id) => report.created.push(CreatedGroup {
                    group_id,
                    name: category.name.clone(),
                    color,
                    tab_count: category.len(),
                }),
                Err(e) => {
                    error!(category = %category.name, error = %e, "failed to create group");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Ungroups every grouped tab. Returns how many tabs were ungrouped.
    pub async fn ungroup_all(&self) -> Result<usize, MutationError> {
        let grouped = self.grouped_tabs().await?;
        if grouped.is_empty() {
            return Ok(0);
        }
        self.host.ungroup_tabs(&grouped).await?;
        Ok(grouped.len())
    }

    /// Moves `dragged` to `target`'s position, joining `target`'s group when
    /// it has one and `dragged` is not already in it.
    pub async fn move_tab_to_tab(&self, dragged: TabId, target: TabId) -> Result<(), MutationError> {
        if dragged == target {
            return Ok(());
        }
        let target_tab = self.host.get_tab(target).await?;
        let dragged_tab = self.host.get_tab(dragged).await?;

        self.host.move_tab(dragged, target_tab.index).await?;
        if target_tab.is_grouped() && dragged_tab.group_id != target_tab.group_id {
            self.host.group_tabs(&[dragged], Some(target_tab.group_id)).await?;
        }
        Ok(())
    }

    /// Puts `tab` into `group`, or ungroups it when `group` is
    /// [`TAB_GROUP_ID_NONE`]. Returns false when the tab was already there.
    pub async fn move_tab_to_group(&self, tab: TabId, group: GroupId) -> Result<bool, MutationError> {
        let current = self.host.get_tab(tab).await?;
        if current.group_id == group {
            return Ok(false);
        }
        if group == TAB_GROUP_ID_NONE {
            self.host.ungroup_tabs(&[tab]).await?;
        } else {
            self.host.group_tabs(&[tab], Some(group)).await?;
        }
        Ok(true)
    }

    /// Sets a group's title.
    pub async fn rename_group(&self, group: GroupId, title: &str) -> bool {
        match self.host.update_group(group, GroupUpdate::title(title)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(group, error = %e, "failed to update group title");
                false
            }
        }
    }

    /// Builds the panel's tab list: internal pages skipped, one bucket per
    /// group plus the ungrouped bucket, empty buckets dropped, buckets in
    /// tab-strip order.
    pub async fn tab_list(&self) -> Result<TabListView, MutationError> {
        let tabs = self.host.query_tabs().await?;
        let groups = self.host.query_groups().await?;

        let mut listed: Vec<ListedGroup> = groups
            .iter()
            .map(|g| ListedGroup {
                id: g.id,
                title: if g.title.is_empty() {
                    UNTITLED_GROUP_TITLE.to_string()
                } else {
                    g.title.clone()
                },
                color: Some(g.color),
                collapsed: g.collapsed,
                tabs: Vec::new(),
            })
            .collect();
        listed.push(ListedGroup {
            id: TAB_GROUP_ID_NONE,
            title: UNGROUPED_TITLE.to_string(),
            color: None,
            collapsed: false,
            tabs: Vec::new(),
        });

        for tab in tabs.into_iter().filter(|t| !is_internal_url(&t.url)) {
            if let Some(bucket) = listed.iter_mut().find(|g| g.id == tab.group_id) {
                bucket.tabs.push(tab);
            }
        }

        for bucket in &mut listed {
            bucket.tabs.sort_by_key(|t| t.index);
        }
        listed.retain(|g| !g.tabs.is_empty());
        listed.sort_by_key(ListedGroup::first_index);

        Ok(TabListView { groups: listed })
    }
}

#[async_trait]
impl SnapshotHost for GroupMutator {
    async fn capture_state(&self) -> Option<TabSnapshot> {
        GroupMutator::capture_state(self).await
    }

    async fn restore_state(&self, snapshot: &TabSnapshot) -> Result<RestoreReport, MutationError> {
        GroupMutator::restore_state(self, snapshot).await
    }
}
