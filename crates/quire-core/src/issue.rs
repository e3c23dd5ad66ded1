//! Issues reported against a compiled snapshot.
//!
//! Stages emit [`IssueDraft`]s; the hydrator turns them into [`Issue`]s with
//! identity, timestamps and validated question references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueKind {
  SchemaViolation,
  SemanticConflict,
  MissingInfo,
  Assumption,
  Ambiguity,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
  Error,
  Warning,
  Info,
}

/// An issue as emitted by a stage. Question references are raw strings
/// because they come from model output and may not resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueDraft {
  pub kind:         IssueKind,
  pub severity:     Severity,
  pub message:      String,
  #[serde(default)]
  pub spec_paths:   Vec<String>,
  #[serde(default)]
  pub question_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
  pub issue_id:     Uuid,
  pub project_id:   Uuid,
  pub snapshot_id:  Uuid,
  pub kind:         IssueKind,
  pub severity:     Severity,
  pub message:      String,
  pub spec_paths:   Vec<String>,
  pub question_ids: Vec<Uuid>,
  pub created_at:   DateTime<Utc>,
}
