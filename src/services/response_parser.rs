//! Turns raw model text into the candidate category array.
//!
//! Only structure is checked here; the entries themselves are left untouched
//! for [`crate::services::category_normalizer`].

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::errors::OrganizeError;

/// Strips a surrounding markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let clean = clean.strip_suffix("```").unwrap_or(clean);
    clean.trim()
}

/// Parses model output into the raw candidate list.
///
/// Accepts a JSON array, or an object carrying the array under `items`
/// (models sometimes echo the schema wrapper back).
pub fn parse_response(raw: &str) -> Result<Vec<Value>, OrganizeError> {
    let text = strip_markdown_fences(raw);
    let parsed: Value = serde_json::from_str(text).map_err(|e| {
        warn!(error = %e, "model response is not valid JSON");
        OrganizeError::MalformedResponse(e.to_string())
    })?;

    match parsed {
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => {
                debug!(count = items.len(), "extracted items array from schema wrapper");
                Ok(items)
            }
            _ => Err(OrganizeError::MalformedResponse(
                "object without an items array".to_string(),
            )),
        },
        Value::Array(items) => Ok(items),
        other => Err(OrganizeError::MalformedResponse(format!(
            "expected an array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
