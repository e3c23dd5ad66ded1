//! Structural diff between two compiled documents.
//!
//! The comparison is positional: arrays are compared index by index, so an
//! insertion at the front of a list shows up as a run of `modified` entries
//! followed by one `added`, not as a single insertion. Callers that need
//! sequence alignment must do it themselves.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
  Added,
  Removed,
  Modified,
}

/// One difference at a JSON pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
  pub path:      String,
  pub kind:      ChangeKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub old_value: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub new_value: Option<Value>,
}

impl Change {
  fn added(path: String, new: &Value) -> Self {
    Self { path, kind: ChangeKind::Added, old_value: None, new_value: Some(new.clone()) }
  }

  fn removed(path: String, old: &Value) -> Self {
    Self { path, kind: ChangeKind::Removed, old_value: Some(old.clone()), new_value: None }
  }

  fn modified(path: String, old: &Value, new: &Value) -> Self {
    Self {
      path,
      kind: ChangeKind::Modified,
      old_value: Some(old.clone()),
      new_value: Some(new.clone()),
    }
  }

  /// The same change seen from the other side: added ⇄ removed, old ⇄ new.
  pub fn mirrored(&self) -> Self {
    let kind = match self.kind {
      ChangeKind::Added => ChangeKind::Removed,
      ChangeKind::Removed => ChangeKind::Added,
      ChangeKind::Modified => ChangeKind::Modified,
    };
    Self {
      path: self.path.clone(),
      kind,
      old_value: self.new_value.clone(),
      new_value: self.old_value.clone(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
  pub added:    usize,
  pub removed:  usize,
  pub modified: usize,
  pub total:    usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
  /// Sorted by path.
  pub changes: Vec<Change>,
  pub summary: DiffSummary,
}

impl DiffResult {
  pub fn is_empty(&self) -> bool { self.changes.is_empty() }
}

/// Compare `base` against `target`.
pub fn diff(base: &Value, target: &Value) -> DiffResult {
  let mut changes = Vec::new();
  walk(base, target, String::new(), &mut changes);
  changes.sort_by(|a, b| a.path.cmp(&b.path));

  let mut summary = DiffSummary::default();
  for change in &changes {
    match change.kind {
      ChangeKind::Added => summary.added += 1,
      ChangeKind::Removed => summary.removed += 1,
      ChangeKind::Modified => summary.modified += 1,
    }
  }
  summary.total = changes.len();

  DiffResult { changes, summary }
}

fn walk(base: &Value, target: &Value, at: String, out: &mut Vec<Change>) {
  match (base, target) {
    (Value::Object(old), Value::Object(new)) => {
      for (key, old_child) in old {
        let child_path = path::push(&at, key);
        match new.get(key) {
          Some(new_child) => walk(old_child, new_child, child_path, out),
          None => out.push(Change::removed(child_path, old_child)),
        }
      }
      for (key, new_child) in new {
        if !old.contains_key(key) {
          out.push(Change::added(path::push(&at, key), new_child));
        }
      }
    }
    (Value::Array(old), Value::Array(new)) => {
      for i in 0..old.len().max(new.len()) {
        let child_path = path::push_index(&at, i);
        match (old.get(i), new.get(i)) {
          (Some(o), Some(n)) => walk(o, n, child_path, out),
          (Some(o), None) => out.push(Change::removed(child_path, o)),
          (None, Some(n)) => out.push(Change::added(child_path, n)),
          (None, None) => {}
        }
      }
    }
    (old, new) if same_type(old, new) => {
      if old != new {
        out.push(Change::modified(at, old, new));
      }
    }
    // Type changed: report the whole subtree, do not descend.
    (old, new) => out.push(Change::modified(at, old, new)),
  }
}

fn same_type(a: &Value, b: &Value) -> bool {
  std::mem::discriminant(a) == std::mem::discriminant(b)
}
