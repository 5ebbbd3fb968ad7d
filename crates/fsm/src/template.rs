//! Late binding of `$(path)` placeholders.
//!
//! Component definitions may reference values that only exist once other
//! components have been built, e.g. `$(networks.items.0.network_aws_id)`.
//! Placeholders are resolved against the serialized service right before an
//! outbound command is sent. A placeholder whose lookup comes back empty or
//! `null` is left verbatim so the worker can tell the value is not known yet.

use std::collections::HashSet;

use serde_json::Value;

/// Maximum number of chained placeholder hops.
pub const MAX_DEPTH: usize = 16;

/// Returns the dotted path of a `$(path)` placeholder.
pub fn placeholder_path(value: &str) -> Option<&str> {
    value
        .strip_prefix("$(")
        .and_then(|rest| rest.strip_suffix(')'))
        .filter(|path| !path.is_empty())
}

/// Looks up a dotted path in a JSON document. Numeric segments index arrays.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let pointer: String = path
        .split('.')
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect();
    document.pointer(&pointer)
}

/// Renders a looked-up value as text. Strings are taken as-is, everything
/// else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolves a single string. Non-placeholders are returned unchanged.
pub fn resolve_str(document: &Value, value: &str) -> String {
    let mut visited = HashSet::new();
    resolve_chain(document, value, &mut visited, 0).unwrap_or_else(|| value.to_string())
}

fn resolve_chain(
    document: &Value,
    value: &str,
    visited: &mut HashSet<String>,
    depth: usize,
) -> Option<String> {
    let Some(path) = placeholder_path(value) else {
        return Some(value.to_string());
    };
    if depth >= MAX_DEPTH || !visited.insert(path.to_string()) {
        tracing::warn!(placeholder = %value, "Placeholder chain does not terminate");
        return None;
    }

    let found = lookup(document, path).map(render)?;
    if found.is_empty() || found == "null" {
        return Some(value.to_string());
    }
    if placeholder_path(&found).is_some() {
        return resolve_chain(document, &found, visited, depth + 1);
    }
    Some(found)
}

/// Resolves every placeholder inside `value`, depth-first.
pub fn resolve_value(document: &Value, value: &mut Value) {
    match value {
        Value::String(s) => {
            if placeholder_path(s).is_some() {
                *s = resolve_str(document, s);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| resolve_value(document, v)),
        Value::Object(map) => map.values_mut().for_each(|v| resolve_value(document, v)),
        _ => {}
    }
}
