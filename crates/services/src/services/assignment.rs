//! Assignee payload normalization and assignment diffs.
//!
//! Clients submit assignee sets in several shapes: a JSON list, a single id,
//! a JSON-encoded string holding either of those, or an object keyed by
//! numeric index. Everything is reduced to a deduplicated list of id strings
//! before any business rule runs.

use std::{collections::HashSet, hash::Hash};

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::{DomainError, Result};

/// Members that entered and left an assignee set between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentDiff<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

impl<T> Default for AssignmentDiff<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<T> AssignmentDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// `added = new - old`, `removed = old - new`. Duplicates collapse; the
/// relative order of first appearance is kept.
pub fn diff_assignees<T>(old: &[T], new: &[T]) -> AssignmentDiff<T>
where
    T: Eq + Hash + Clone,
{
    let old_set: HashSet<&T> = old.iter().collect();
    let new_set: HashSet<&T> = new.iter().collect();

    let added = dedup_preserving_order(new.iter().filter(|id| !old_set.contains(id)).cloned());
    let removed = dedup_preserving_order(old.iter().filter(|id| !new_set.contains(id)).cloned());
    AssignmentDiff { added, removed }
}

pub fn dedup_preserving_order<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Reduces any accepted assignee payload shape to a deduplicated list of id
/// strings. `null` yields an empty list; unrecognized shapes are rejected.
pub fn normalize_assignees(value: &Value) -> Result<Vec<String>> {
    let ids = collect_ids(value, true)?;
    Ok(dedup_preserving_order(ids))
}

/// Normalizes the payload and parses every entry as a user id.
pub fn parse_assignee_ids(value: &Value) -> Result<Vec<Uuid>> {
    normalize_assignees(value)?
        .iter()
        .map(|raw| {
            Uuid::parse_str(raw)
                .map_err(|_| DomainError::validation(format!("Invalid assignee id: {raw}")))
        })
        .collect()
}

fn collect_ids(value: &Value, allow_encoded: bool) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(element_id).collect::<Result<Vec<_>>>().map(
            |ids| ids.into_iter().flatten().collect(),
        ),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(Vec::new());
            }
            if allow_encoded && looks_encoded(trimmed) {
                let decoded: Value = serde_json::from_str(trimmed).map_err(|_| {
                    DomainError::validation("Assignee payload is not valid JSON")
                })?;
                return collect_ids(&decoded, false);
            }
            Ok(vec![trimmed.to_string()])
        }
        Value::Object(map) => {
            if let Some(indexed) = index_keyed_values(map) {
                return indexed
                    .into_iter()
                    .map(element_id)
                    .collect::<Result<Vec<_>>>()
                    .map(|ids| ids.into_iter().flatten().collect());
            }
            match object_id(map) {
                Some(id) => Ok(vec![id]),
                None => Err(unrecognized()),
            }
        }
        Value::Bool(_) | Value::Number(_) => Err(unrecognized()),
    }
}

fn looks_encoded(raw: &str) -> bool {
    raw.starts_with('[') || raw.starts_with('{') || raw.starts_with('"')
}

/// A single list element: an id string or a populated user object.
fn element_id(value: &Value) -> Result<Option<String>> {
    match value {
        Value::String(raw) => {
            let trimmed = raw.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Value::Object(map) => object_id(map).map(Some).ok_or_else(unrecognized),
        Value::Null => Ok(None),
        _ => Err(unrecognized()),
    }
}

fn object_id(map: &Map<String, Value>) -> Option<String> {
    ["id", "_id"]
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(|value| value.as_str())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// `{"0": "a", "1": "b"}` in numeric key order; `None` if any key is not an index.
fn index_keyed_values(map: &Map<String, Value>) -> Option<Vec<&Value>> {
    if map.is_empty() {
        return None;
    }
    let mut entries = map
        .iter()
        .map(|(key, value)| key.parse::<usize>().ok().map(|index| (index, value)))
        .collect::<Option<Vec<_>>>()?;
    entries.sort_by_key(|(index, _)| *index);
    Some(entries.into_iter().map(|(_, value)| value).collect())
}

fn unrecognized() -> DomainError {
    DomainError::validation("Unrecognized assignee payload shape")
}
