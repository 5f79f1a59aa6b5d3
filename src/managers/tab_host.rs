//! The host browser's tab and group API, scoped to the panel's window.

use async_trait::async_trait;

use crate::types::errors::MutationError;
use crate::types::tab::{GroupColor, GroupId, HostGroup, HostTab, TabId};

/// Partial update of a group's metadata; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupUpdate {
    pub title: Option<String>,
    pub color: Option<GroupColor>,
    pub collapsed: Option<bool>,
}

impl GroupUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Trait defining the tab/group query-and-mutate interface of the host.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Tabs of the current window in tab-strip order.
    async fn query_tabs(&self) -> Result<Vec<HostTab>, MutationError>;

    /// Groups of the current window.
    async fn query_groups(&self) -> Result<Vec<HostGroup>, MutationError>;

    async fn get_tab(&self, tab_id: TabId) -> Result<HostTab, MutationError>;

    /// Groups `tab_ids` into `group`, or into a new group when `group` is `None`.
    /// Returns the id of the group the tabs ended up in.
    async fn group_tabs(&self, tab_ids: &[TabId], group: Option<GroupId>) -> Result<GroupId, MutationError>;

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), MutationError>;

    async fn update_group(&self, group: GroupId, update: GroupUpdate) -> Result<(), MutationError>;

    async fn move_tab(&self, tab_id: TabId, index: usize) -> Result<(), MutationError>;
}
