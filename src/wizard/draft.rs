//! Shared draft built up across wizard steps.
//!
//! The draft is a JSON object addressed with dot-separated paths
//! (`application.name`). Exactly one `WizardSession` owns it; steps and field
//! bindings only ever see it through that session.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Errors raised when constructing a draft from external data
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Accumulated wizard data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Draft {
    root: Map<String, Value>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a draft from an existing JSON object
    pub fn from_value(value: Value) -> Result<Self, DraftError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(DraftError::NotAnObject(type_name(&other))),
        }
    }

    /// Read the value at `path`
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = segments(path);
        let first = parts.next()?;
        let mut current = self.root.get(first)?;
        for segment in parts {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Read the value at `path` as a string slice
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Read a trimmed, non-empty string at `path`
    pub fn text(&self, path: &str) -> Option<&str> {
        self.get_str(path)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether the value at `path` is missing or empty
    pub fn is_blank(&self, path: &str) -> bool {
        self.get(path).map_or(true, is_blank)
    }

    /// Write `value` at `path`, creating intermediate objects as needed.
    ///
    /// A non-object value sitting on the way to `path` is replaced by an
    /// object. An empty path is ignored.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let parts: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = parts.split_last() else {
            warn!(path, "ignoring draft write with an empty path");
            return;
        };

        let mut current = &mut self.root;
        for segment in parents {
            let slot = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot {
                Value::Object(map) => map,
                _ => unreachable!("slot was just made an object"),
            };
        }
        current.insert((*last).to_string(), value.into());
    }

    /// Remove and return the value at `path`
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let parts: Vec<&str> = segments(path).collect();
        let (last, parents) = parts.split_last()?;

        let mut current = &mut self.root;
        for segment in parents {
            current = current.get_mut(*segment)?.as_object_mut()?;
        }
        current.remove(*last)
    }

    /// Clear every value
    pub fn reset(&mut self) {
        self.root.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Snapshot the draft as a JSON value
    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Values at each of `paths`, in order, for change detection
    pub fn values_at<S: AsRef<str>>(&self, paths: &[S]) -> Vec<Option<Value>> {
        paths
            .iter()
            .map(|p| self.get(p.as_ref()).cloned())
            .collect()
    }

    /// All leaf paths with their values, depth first
    pub fn leaves(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        collect_leaves(&self.root, String::new(), &mut out);
        out
    }
}

fn collect_leaves(map: &Map<String, Value>, prefix: String, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => collect_leaves(inner, path, out),
            other => out.push((path, other.clone())),
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').map(str::trim).filter(|s| !s.is_empty())
}

/// Whether a value counts as "not filled in"
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
