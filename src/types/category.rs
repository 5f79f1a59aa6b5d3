use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// Longest category name a group title may carry.
pub const MAX_CATEGORY_NAME_CHARS: usize = 20;

/// Minimum and maximum number of categories in a normalized result.
pub const MIN_CATEGORIES: usize = 3;
pub const MAX_CATEGORIES: usize = 7;

/// A named cluster of tabs, validated by the normalizer.
///
/// Field names follow the wire shape the model is asked to produce.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    #[serde(rename = "category")]
    pub name: String,
    #[serde(rename = "tabIds")]
    pub tab_ids: Vec<TabId>,
}

impl Category {
    pub fn new(name: impl Into<String>, tab_ids: Vec<TabId>) -> Self {
        Self {
            name: name.into(),
            tab_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.tab_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tab_ids.is_empty()
    }
}
