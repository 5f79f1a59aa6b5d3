use serde::{Deserialize, Serialize};

/// Browser-assigned tab identifier, stable within a browser session.
pub type TabId = i64;

/// Browser-assigned tab group identifier.
pub type GroupId = i64;

/// Sentinel group id meaning "not in any group".
pub const TAB_GROUP_ID_NONE: GroupId = -1;

/// URL prefixes of browser-internal pages that are never organized.
const INTERNAL_SCHEMES: [&str; 2] = ["chrome://", "chrome-extension://"];

/// A tab as presented to the model: identity plus the text it is clustered by.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    pub url: String,
}

impl Tab {
    /// Returns true when the tab shows a browser-internal page.
    pub fn is_internal(&self) -> bool {
        is_internal_url(&self.url)
    }
}

/// Returns true when `url` uses one of the browser-internal schemes.
pub fn is_internal_url(url: &str) -> bool {
    INTERNAL_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

/// Fixed tab group color palette.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl GroupColor {
    /// Colors assigned to freshly created category groups, in rotation.
    pub const CATEGORY_ROTATION: [GroupColor; 8] = [
        GroupColor::Blue,
        GroupColor::Red,
        GroupColor::Yellow,
        GroupColor::Green,
        GroupColor::Pink,
        GroupColor::Purple,
        GroupColor::Cyan,
        GroupColor::Orange,
    ];

    /// Color for the `index`-th category of an organize run.
    pub fn for_category(index: usize) -> Self {
        Self::CATEGORY_ROTATION[index % Self::CATEGORY_ROTATION.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupColor::Grey => "grey",
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Yellow => "yellow",
            GroupColor::Green => "green",
            GroupColor::Pink => "pink",
            GroupColor::Purple => "purple",
            GroupColor::Cyan => "cyan",
            GroupColor::Orange => "orange",
        }
    }
}

/// Metadata of a tab group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabGroupInfo {
    pub title: String,
    pub color: GroupColor,
    pub collapsed: bool,
}

/// A live tab as reported by the host browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostTab {
    pub id: TabId,
    pub index: usize,
    pub group_id: GroupId,
    pub title: String,
    pub url: String,
}

impl HostTab {
    pub fn is_grouped(&self) -> bool {
        self.group_id != TAB_GROUP_ID_NONE
    }

    /// Projects the live tab onto the fields the model sees.
    pub fn to_tab(&self) -> Tab {
        Tab {
            id: self.id,
            title: if self.title.is_empty() {
                "Untitled".to_string()
            } else {
                self.title.clone()
            },
            url: self.url.clone(),
        }
    }
}

/// A live tab group as reported by the host browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostGroup {
    pub id: GroupId,
    pub title: String,
    pub color: GroupColor,
    pub collapsed: bool,
}

impl HostGroup {
    pub fn info(&self) -> TabGroupInfo {
        TabGroupInfo {
            title: self.title.clone(),
            color: self.color,
            collapsed: self.collapsed,
        }
    }
}

/// One tab's placement inside a [`TabSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabState {
    pub id: TabId,
    pub index: usize,
    pub group_id: GroupId,
    pub group_info: Option<TabGroupInfo>,
}

/// Group topology of a window at one instant.
///
/// Serialized as a bare JSON array so persisted history stays a list of
/// `{id, index, groupId, groupInfo}` records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct TabSnapshot {
    entries: Vec<TabState>,
}

impl TabSnapshot {
    pub fn new(entries: Vec<TabState>) -> Self {
        Self { entries }
    }

    /// Builds a snapshot from the host's tab and group listings.
    pub fn capture(tabs: &[HostTab], groups: &[HostGroup]) -> Self {
        let entries = tabs
            .iter()
            .map(|tab| TabState {
                id: tab.id,
                index: tab.index,
                group_id: tab.group_id,
                group_info: if tab.is_grouped() {
                    groups.iter().find(|g| g.id == tab.group_id).map(HostGroup::info)
                } else {
                    None
                },
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[TabState] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
