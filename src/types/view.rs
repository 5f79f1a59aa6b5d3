use serde::{Deserialize, Serialize};

use super::tab::{GroupColor, GroupId, HostTab, TAB_GROUP_ID_NONE};

/// Title shown for the synthetic bucket of ungrouped tabs.
pub const UNGROUPED_TITLE: &str = "Ungrouped";

/// Title shown for a group the user never named.
pub const UNTITLED_GROUP_TITLE: &str = "Untitled Group";

/// One bucket of the panel's tab list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListedGroup {
    /// Host group id, or [`TAB_GROUP_ID_NONE`] for the ungrouped bucket.
    pub id: GroupId,
    pub title: String,
    pub color: Option<GroupColor>,
    pub collapsed: bool,
    pub tabs: Vec<HostTab>,
}

impl ListedGroup {
    pub fn is_ungrouped(&self) -> bool {
        self.id == TAB_GROUP_ID_NONE
    }

    /// Smallest tab index in the bucket, used to order buckets.
    pub fn first_index(&self) -> usize {
        self.tabs.iter().map(|t| t.index).min().unwrap_or(usize::MAX)
    }
}

/// The panel's refreshed view of the window: non-empty buckets in tab-strip order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TabListView {
    pub groups: Vec<ListedGroup>,
}

impl TabListView {
    pub fn tab_count(&self) -> usize {
        self.groups.iter().map(|g| g.tabs.len()).sum()
    }

    pub fn group(&self, id: GroupId) -> Option<&ListedGroup> {
        self.groups.iter().find(|g| g.id == id)
    }
}

/// What the status area currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PanelStatus {
    #[default]
    Idle,
    /// A short notice that is not a failure.
    Notice(String),
    /// Per-category result lines after a successful organize.
    Results(Vec<String>),
    Error(String),
}

/// Enabled/visible state of the panel's action controls.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelControls {
    pub organize_visible: bool,
    pub organize_enabled: bool,
    pub stop_visible: bool,
    pub ungroup_enabled: bool,
    pub undo_enabled: bool,
    pub redo_enabled: bool,
}

impl Default for PanelControls {
    fn default() -> Self {
        Self {
            organize_visible: true,
            organize_enabled: true,
            stop_visible: false,
            ungroup_enabled: true,
            undo_enabled: false,
            redo_enabled: false,
        }
    }
}

impl PanelControls {
    /// True when the user can either start or stop an organize run.
    pub fn is_actionable(&self) -> bool {
        (self.organize_visible && self.organize_enabled) || self.stop_visible
    }
}
