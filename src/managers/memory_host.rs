use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::managers::tab_host::{GroupUpdate, TabHost};
use crate::types::errors::MutationError;
use crate::types::tab::{GroupColor, GroupId, HostGroup, HostTab, TabId, TAB_GROUP_ID_NONE};

struct WindowState {
    /// Tab strip in order; `HostTab::index` is kept equal to the position.
    tabs: Vec<HostTab>,
    groups: Vec<HostGroup>,
    next_tab_id: TabId,
    next_group_id: GroupId,
    failing_tabs: HashSet<TabId>,
    fail_queries: bool,
}

impl WindowState {
    fn position(&self, tab_id: TabId) -> Result<usize, MutationError> {
        self.tabs
            .iter()
            .position(|t| t.id == tab_id)
            .ok_or(MutationError::TabNotFound(tab_id))
    }

    fn renumber(&mut self) {
        for (i, tab) in self.tabs.iter_mut().enumerate() {
            tab.index = i;
        }
    }

    /// Removes groups that no longer hold any tab, as the browser does.
    fn prune_groups(&mut self) {
        let tabs = &self.tabs;
        self.groups
            .retain(|g| tabs.iter().any(|t| t.group_id == g.id));
    }

    /// Moves the tabs of `group` so they sit next to each other, starting at
    /// the position of the group's first tab.
    fn make_contiguous(&mut self, group: GroupId) {
        let Some(start) = self.tabs.iter().position(|t| t.group_id == group) else {
            return;
        };
        let (members, rest): (Vec<HostTab>, Vec<HostTab>) =
            self.tabs.drain(..).partition(|t| t.group_id == group);
        let split = rest
            .iter()
            .take_while(|t| t.index < start)
            .count();
        let mut tabs = rest;
        let tail = tabs.split_off(split);
        tabs.extend(members);
        tabs.extend(tail);
        self.tabs = tabs;
        self.renumber();
    }
}

/// Single-window in-memory browser model.
///
/// Used by the demo binary and the tests. Failures can be injected per tab
/// (grouping fails) or globally (queries fail).
pub struct InMemoryTabHost {
    state: Mutex<WindowState>,
}

impl InMemoryTabHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WindowState {
                tabs: Vec::new(),
                groups: Vec::new(),
                next_tab_id: 1,
                next_group_id: 1,
                failing_tabs: HashSet::new(),
                fail_queries: false,
            }),
        }
    }

    /// Creates a window holding one tab per `(title, url)` pair.
    pub fn with_tabs<'a, I>(tabs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let host = Self::new();
        for (title, url) in tabs {
            host.open_tab(title, url);
        }
        host
    }

    fn lock(&self) -> Result<MutexGuard<'_, WindowState>, MutationError> {
        self.state
            .lock()
            .map_err(|e| MutationError::Host(format!("window state poisoned: {}", e)))
    }

    /// Appends a tab to the end of the strip and returns its id, or `None`
    /// when the window state is poisoned.
    pub fn open_tab(&self, title: &str, url: &str) -> Option<TabId> {
        let mut state = self.lock().ok()?;
        let id = state.next_tab_id;
        state.next_tab_id += 1;
        let index = state.tabs.len();
        state.tabs.push(HostTab {
            id,
            index,
            group_id: TAB_GROUP_ID_NONE,
            title: title.to_string(),
            url: url.to_string(),
        });
        Some(id)
    }

    /// Closes a tab. Returns false when it did not exist.
    pub fn close_tab(&self, tab_id: TabId) -> bool {
        let Ok(mut state) = self.lock() else {
            return false;
        };
        let Ok(pos) = state.position(tab_id) else {
            return false;
        };
        state.tabs.remove(pos);
        state.failing_tabs.remove(&tab_id);
        state.renumber();
        state.prune_groups();
        true
    }

    /// Makes every grouping call that includes `tab_id` fail.
    pub fn fail_grouping_for(&self, tab_id: TabId) {
        if let Ok(mut state) = self.lock() {
            state.failing_tabs.insert(tab_id);
        }
    }

    /// Makes tab and group queries fail (or succeed again).
    pub fn set_fail_queries(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.fail_queries = fail;
        }
    }

    pub fn tabs(&self) -> Vec<HostTab> {
        self.lock().map(|s| s.tabs.clone()).unwrap_or_default()
    }

    pub fn groups(&self) -> Vec<HostGroup> {
        self.lock().map(|s| s.groups.clone()).unwrap_or_default()
    }

    /// Group membership as `(title, color, sorted tab ids)`, sorted by title.
    pub fn grouping(&self) -> Vec<(String, GroupColor, Vec<TabId>)> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        let mut out: Vec<(String, GroupColor, Vec<TabId>)> = state
            .groups
            .iter()
            .map(|g| {
                let mut ids: Vec<TabId> = state
                    .tabs
                    .iter()
                    .filter(|t| t.group_id == g.id)
                    .map(|t| t.id)
                    .collect();
                ids.sort_unstable();
                (g.title.clone(), g.color, ids)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.2.cmp(&b.2)));
        out
    }
}

impl Default for InMemoryTabHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TabHost for InMemoryTabHost {
    async fn query_tabs(&self) -> Result<Vec<HostTab>, MutationError> {
        let state = self.lock()?;
        if state.fail_queries {
            return Err(MutationError::Host("tab query failed".to_string()));
        }
        Ok(state.tabs.clone())
    }

    async fn query_groups(&self) -> Result<Vec<HostGroup>, MutationError> {
        let state = self.lock()?;
        if state.fail_queries {
            return Err(MutationError::Host("group query failed".to_string()));
        }
        Ok(state.groups.clone())
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<HostTab, MutationError> {
        let state = self.lock()?;
        let pos = state.position(tab_id)?;
        Ok(state.tabs[pos].clone())
    }

    async fn group_tabs(&self, tab_ids: &[TabId], group: Option<GroupId>) -> Result<GroupId, MutationError> {
        let mut state = self.lock()?;
        if tab_ids.is_empty() {
            return Err(MutationError::Host("no tabs to group".to_string()));
        }
        for id in tab_ids {
            state.position(*id)?;
            if state.failing_tabs.contains(id) {
                return Err(MutationError::Host(format!("grouping rejected for tab {}", id)));
            }
        }

        let target = match group {
            Some(id) => {
                if !state.groups.iter().any(|g| g.id == id) {
                    return Err(MutationError::GroupNotFound(id));
                }
                id
            }
            None => {
                let id = state.next_group_id;
                state.next_group_id += 1;
                state.groups.push(HostGroup {
                    id,
                    title: String::new(),
                    color: GroupColor::default(),
                    collapsed: false,
                });
                id
            }
        };

        for tab in state.tabs.iter_mut().filter(|t| tab_ids.contains(&t.id)) {
            tab.group_id = target;
        }
        state.make_contiguous(target);
        state.prune_groups();
        Ok(target)
    }

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), MutationError> {
        let mut state = self.lock()?;
        for id in tab_ids {
            state.position(*id)?;
        }
        for tab in state.tabs.iter_mut().filter(|t| tab_ids.contains(&t.id)) {
            tab.group_id = TAB_GROUP_ID_NONE;
        }
        state.prune_groups();
        Ok(())
    }

    async fn update_group(&self, group: GroupId, update: GroupUpdate) -> Result<(), MutationError> {
        let mut state = self.lock()?;
        let target = state
            .groups
            .iter_mut()
            .find(|g| g.id == group)
            .ok_or(MutationError::GroupNotFound(group))?;
        if let Some(title) = update.title {
            target.title = title;
        }
        if let Some(color) = update.color {
            target.color = color;
        }
        if let Some(collapsed) = update.collapsed {
            target.collapsed = collapsed;
        }
        Ok(())
    }

    async fn move_tab(&self, tab_id: TabId, index: usize) -> Result<(), MutationError> {
        let mut state = self.lock()?;
        let pos = state.position(tab_id)?;
        let tab = state.tabs.remove(pos);
        let index = index.min(state.tabs.len());
        state.tabs.insert(index, tab);
        state.renumber();
        Ok(())
    }
}
