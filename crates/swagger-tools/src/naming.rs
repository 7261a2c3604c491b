//! Tool name derivation.
//!
//! Precedence: explicit `operationId`, then the first usable non-marker tag, then
//! `<method>_<path>`. Tag and path sources are normalized to `snake_case`.

use crate::error::{Result, SwaggerToolsError};
use crate::spec::{HttpMethod, Operation};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("([a-z0-9])([A-Z])").expect("static regex is valid"));

/// `"List Confs"` -> `"list_confs"`, `"getUserID"` -> `"get_user_id"`. Idempotent.
#[must_use]
pub fn normalize(s: &str) -> String {
    let underscored: String = s
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    CASE_BOUNDARY
        .replace_all(&underscored, "${1}_${2}")
        .to_lowercase()
}

/// # Errors
///
/// Returns [`SwaggerToolsError::Naming`] when neither the operation id, a tag, nor the path
/// yields a usable token.
pub fn resolve_tool_name(
    method: HttpMethod,
    path: &str,
    operation: &Operation,
    marker_tag: &str,
) -> Result<String> {
    if let Some(id) = operation
        .operation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        return Ok(id.to_string());
    }

    if let Some(tag_name) = operation
        .tags
        .iter()
        .filter(|t| !t.trim().eq_ignore_ascii_case(marker_tag.trim()))
        .map(|t| normalize(t))
        .find(|n| has_token(n))
    {
        return Ok(tag_name);
    }

    let clean_path = path.replace('/', "_").replace(['{', '}'], "");
    let clean_path = clean_path.trim_matches('_');
    if !has_token(clean_path) {
        return Err(SwaggerToolsError::Naming(format!(
            "cannot derive a tool name for {method} {path}: no operationId, no usable tag, and \
             the path has no name segments"
        )));
    }
    Ok(format!("{}_{}", method.as_lower(), normalize(clean_path)))
}

/// Claim `base`, or the first free `base_<n>` when it is already taken.
pub(crate) fn reserve_unique_tool_name(tool_names: &mut HashSet<String>, base: &str) -> String {
    if tool_names.insert(base.to_string()) {
        return base.to_string();
    }

    let mut counter = 1;
    loop {
        let candidate = format!("{base}_{counter}");
        if tool_names.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

fn has_token(s: &str) -> bool {
    s.chars().any(char::is_alphanumeric)
}
