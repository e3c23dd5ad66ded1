//! Trace model: per-path provenance of a compiled document.
//!
//! Every populated leaf of a compiled document should be explained by at least
//! one answer version. Gaps are reported, never silently dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::path;

/// One answer version that contributed to an output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraceEntry {
  pub question_id:    Uuid,
  pub answer_id:      Uuid,
  pub answer_version: u32,
}

/// Map from JSON pointer to the answer versions that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace(pub BTreeMap<String, Vec<TraceEntry>>);

impl Trace {
  pub fn new() -> Self { Self::default() }

  /// Record `entry` against `path`, ignoring exact duplicates.
  pub fn insert(&mut self, path: impl Into<String>, entry: TraceEntry) {
    let entries = self.0.entry(path.into()).or_default();
    if !entries.contains(&entry) {
      entries.push(entry);
      entries.sort();
    }
  }

  pub fn entries(&self, path: &str) -> &[TraceEntry] {
    self.0.get(path).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn is_empty(&self) -> bool { self.0.values().all(Vec::is_empty) }

  /// Populated leaves of `document` with no trace entry at their own path.
  pub fn uncovered_paths(&self, document: &Value) -> Vec<String> {
    populated_leaves(document)
      .into_iter()
      .filter(|p| self.entries(p).is_empty())
      .collect()
  }
}

/// JSON pointers of every non-null scalar in `document`, in document order.
///
/// Empty objects and arrays hold no information and are not leaves.
pub fn populated_leaves(document: &Value) -> Vec<String> {
  let mut out = Vec::new();
  collect_leaves(document, String::new(), &mut out);
  out
}

fn collect_leaves(value: &Value, at: String, out: &mut Vec<String>) {
  match value {
    Value::Null => {}
    Value::Object(map) => {
      for (key, child) in map {
        collect_leaves(child, path::push(&at, key), out);
      }
    }
    Value::Array(items) => {
      for (i, child) in items.iter().enumerate() {
        collect_leaves(child, path::push_index(&at, i), out);
      }
    }
    Value::Bool(_) | Value::Number(_) | Value::String(_) => out.push(at),
  }
}
