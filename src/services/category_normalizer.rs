//! Category normalization: turns the model's untrusted candidate list into a
//! complete, bounded partition of the tabs under consideration.
//!
//! Guarantees on success:
//! - every known tab id appears in exactly one category, unknown ids never appear;
//! - names are unique and at most [`MAX_CATEGORY_NAME_CHARS`] characters;
//! - there are at most [`MAX_CATEGORIES`] categories, and at least
//!   [`MIN_CATEGORIES`] unless the largest category can no longer be split.
//!
//! The function is pure and deterministic so it can be tested apart from parsing.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::types::category::{Category, MAX_CATEGORIES, MAX_CATEGORY_NAME_CHARS, MIN_CATEGORIES};
use crate::types::errors::OrganizeError;
use crate::types::tab::{Tab, TabId};

/// Primary catch-all bucket name.
pub const OTHER: &str = "Other";

/// Fallback catch-all bucket name.
pub const MISC: &str = "Misc";

/// Number of categories kept by size when the model proposes too many.
const KEEP_ON_OVERFLOW: usize = MAX_CATEGORIES - 1;

/// Normalizes raw candidates against the tabs under consideration.
///
/// Returns [`OrganizeError::NoUsableCategories`] when nothing is left to group.
pub fn normalize_categories(raw: &[Value], tabs: &[Tab]) -> Result<Vec<Category>, OrganizeError> {
    let known: HashSet<TabId> = tabs.iter().map(|t| t.id).collect();
    let mut assigned: HashSet<TabId> = HashSet::new();
    let mut categories: Vec<Category> = Vec::new();
    let mut rejected = 0usize;

    // Merge by name and filter membership, first assignment wins.
    for entry in raw {
        let Some(ids) = entry.get("tabIds").and_then(Value::as_array) else {
            continue;
        };
        let name = category_name(entry.get("category"));
        let slot = bucket_index(&mut categories, &name);

        for id in ids.iter().filter_map(tab_id_of) {
            if !known.contains(&id) || !assigned.insert(id) {
                rejected += 1;
                continue;
            }
            categories[slot].tab_ids.push(id);
        }
    }
    if rejected > 0 {
        debug!(rejected, "dropped unknown or duplicate tab ids from model output");
    }

    // Completeness.
    let unassigned: Vec<TabId> = tabs
        .iter()
        .map(|t| t.id)
        .filter(|id| assigned.insert(*id))
        .collect();
    if !unassigned.is_empty() {
        let catch_all = if categories.iter().any(|c| c.name == OTHER) {
            OTHER
        } else {
            MISC
        };
        debug!(count = unassigned.len(), bucket = catch_all, "assigning uncategorized tabs");
        let slot = bucket_index(&mut categories, catch_all);
        categories[slot].tab_ids.extend(unassigned);
    }

    categories.retain(|c| !c.is_empty());

    if categories.len() > MAX_CATEGORIES {
        categories = merge_overflow(categories);
    } else if !categories.is_empty() && categories.len() < MIN_CATEGORIES {
        split_until_minimum(&mut categories);
    }

    if categories.is_empty() {
        return Err(OrganizeError::NoUsableCategories);
    }
    Ok(categories)
}

/// Keeps the largest categories and folds the rest into a catch-all bucket.
fn merge_overflow(mut categories: Vec<Category>) -> Vec<Category> {
    // Stable: ties keep model order.
    categories.sort_by(|a, b| b.len().cmp(&a.len()));
    let overflow = categories.split_off(KEEP_ON_OVERFLOW);
    let merged: Vec<TabId> = overflow.into_iter().flat_map(|c| c.tab_ids).collect();
    debug!(merged = merged.len(), "folding smallest categories into catch-all");

    let slot = categories
        .iter()
        .position(|c| c.name == OTHER)
        .or_else(|| categories.iter().position(|c| c.name == MISC));
    match slot {
        Some(i) => categories[i].tab_ids.extend(merged),
        None => categories.push(Category::new(OTHER, merged)),
    }
    categories
}

/// Halves the largest category until the minimum count is reached.
fn split_until_minimum(categories: &mut Vec<Category>) {
    while categories.len() < MIN_CATEGORIES {
        let mut largest = 0;
        for (i, c) in categories.iter().enumerate() {
            if c.len() > categories[largest].len() {
                largest = i;
            }
        }
        let size = categories[largest].len();
        if size <= 1 {
            break;
        }

        let tail = categories[largest].tab_ids.split_off(size.div_ceil(2));
        let name = split_name(&categories[largest].name, categories);
        categories.push(Category::new(name, tail));
    }
}

/// `"<base> 2"`, bumping the number while the name is taken.
fn split_name(base: &str, existing: &[Category]) -> String {
    let mut n = 2u32;
    loop {
        let suffix = format!(" {}", n);
        let room = MAX_CATEGORY_NAME_CHARS.saturating_sub(suffix.chars().count());
        let stem: String = base.chars().take(room).collect();
        let candidate = format!("{}{}", stem.trim_end(), suffix);
        if !existing.iter().any(|c| c.name == candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn bucket_index(categories: &mut Vec<Category>, name: &str) -> usize {
    match categories.iter().position(|c| c.name == name) {
        Some(i) => i,
        None => {
            categories.push(Category::new(name, Vec::new()));
            categories.len() - 1
        }
    }
}

/// Canonical category name: scalar values stringified, trimmed, cut to length.
/// Missing, falsy or blank names become [`OTHER`].
fn category_name(value: Option<&Value>) -> String {
    let raw = match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        _ => String::new(),
    };
    let name: String = raw.trim().chars().take(MAX_CATEGORY_NAME_CHARS).collect();
    if name.is_empty() {
        OTHER.to_string()
    } else {
        name
    }
}

/// Integral JSON numbers are tab ids; anything else is ignored.
fn tab_id_of(value: &Value) -> Option<TabId> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as TabId)
    })
}
