//! Spec snapshots: immutable compiled documents with provenance.
//!
//! Compiling always appends a new snapshot; an existing snapshot is never
//! rewritten.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::trace::Trace;

/// How a snapshot was produced. Recorded so that the determinism claim
/// (same inputs, provider, model and prompt version ⇒ same output) can be
/// audited after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerMeta {
  pub provider:       String,
  pub model:          String,
  pub prompt_version: String,
  /// SHA-256 hex digest of the rendered prompt.
  pub prompt_digest:  String,
  pub temperature:    f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecSnapshot {
  pub snapshot_id:  Uuid,
  pub project_id:   Uuid,
  pub spec:         Value,
  pub trace:        Trace,
  /// Question id → the exact answer version the compiler consumed.
  pub derived_from: BTreeMap<Uuid, u32>,
  pub compiler:     CompilerMeta,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::SpecStore::record_snapshot`]. Identity and
/// timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
  pub project_id:   Uuid,
  pub spec:         Value,
  pub trace:        Trace,
  pub derived_from: BTreeMap<Uuid, u32>,
  pub compiler:     CompilerMeta,
}
