//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings so that text order
//! matches time order. Enumerations use their snake_case names. Lists, maps
//! and opaque documents are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use quire_core::{
  answer::Answer,
  issue::Issue,
  project::Project,
  question::Question,
  snapshot::{CompilerMeta, SpecSnapshot},
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("{column}: {s:?}")))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PROJECT_COLUMNS: &str = "project_id, name, description, created_at";

/// Raw strings read directly from a `projects` row.
pub struct RawProject {
  pub project_id:  String,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
}

impl RawProject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_id:  row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      project_id:  decode_uuid(&self.project_id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const QUESTION_COLUMNS: &str = "question_id, project_id, text, kind, options, tags, \
                                    priority, spec_paths, status, created_at";

/// Raw strings read directly from a `questions` row.
pub struct RawQuestion {
  pub question_id: String,
  pub project_id:  String,
  pub text:        String,
  pub kind:        String,
  pub options:     Option<String>,
  pub tags:        String,
  pub priority:    i32,
  pub spec_paths:  String,
  pub status:      String,
  pub created_at:  String,
}

impl RawQuestion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      question_id: row.get(0)?,
      project_id:  row.get(1)?,
      text:        row.get(2)?,
      kind:        row.get(3)?,
      options:     row.get(4)?,
      tags:        row.get(5)?,
      priority:    row.get(6)?,
      spec_paths:  row.get(7)?,
      status:      row.get(8)?,
      created_at:  row.get(9)?,
    })
  }

  pub fn into_question(self) -> Result<Question> {
    Ok(Question {
      question_id: decode_uuid(&self.question_id)?,
      project_id:  decode_uuid(&self.project_id)?,
      text:        self.text,
      kind:        decode_enum("kind", &self.kind)?,
      options:     self.options.as_deref().map(decode_json).transpose()?,
      tags:        decode_json(&self.tags)?,
      priority:    self.priority,
      spec_paths:  decode_json(&self.spec_paths)?,
      status:      decode_enum("status", &self.status)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const ANSWER_COLUMNS: &str =
  "answer_id, project_id, question_id, value_json, version, supersedes, created_at";

/// Raw strings read directly from an `answers` row.
pub struct RawAnswer {
  pub answer_id:   String,
  pub project_id:  String,
  pub question_id: String,
  pub value_json:  String,
  pub version:     u32,
  pub supersedes:  Option<String>,
  pub created_at:  String,
}

impl RawAnswer {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      answer_id:   row.get(0)?,
      project_id:  row.get(1)?,
      question_id: row.get(2)?,
      value_json:  row.get(3)?,
      version:     row.get(4)?,
      supersedes:  row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  pub fn into_answer(self) -> Result<Answer> {
    Ok(Answer {
      answer_id:   decode_uuid(&self.answer_id)?,
      project_id:  decode_uuid(&self.project_id)?,
      question_id: decode_uuid(&self.question_id)?,
      value:       decode_json(&self.value_json)?,
      version:     self.version,
      supersedes:  self.supersedes.as_deref().map(decode_uuid).transpose()?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const SNAPSHOT_COLUMNS: &str = "snapshot_id, project_id, spec_json, trace_json, \
                                    derived_from_json, provider, model, prompt_version, \
                                    prompt_digest, temperature, created_at";

/// Raw strings read directly from a `snapshots` row.
pub struct RawSnapshot {
  pub snapshot_id:       String,
  pub project_id:        String,
  pub spec_json:         String,
  pub trace_json:        String,
  pub derived_from_json: String,
  pub provider:          String,
  pub model:             String,
  pub prompt_version:    String,
  pub prompt_digest:     String,
  pub temperature:       f64,
  pub created_at:        String,
}

impl RawSnapshot {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      snapshot_id:       row.get(0)?,
      project_id:        row.get(1)?,
      spec_json:         row.get(2)?,
      trace_json:        row.get(3)?,
      derived_from_json: row.get(4)?,
      provider:          row.get(5)?,
      model:             row.get(6)?,
      prompt_version:    row.get(7)?,
      prompt_digest:     row.get(8)?,
      temperature:       row.get(9)?,
      created_at:        row.get(10)?,
    })
  }

  pub fn into_snapshot(self) -> Result<SpecSnapshot> {
    Ok(SpecSnapshot {
      snapshot_id:  decode_uuid(&self.snapshot_id)?,
      project_id:   decode_uuid(&self.project_id)?,
      spec:         decode_json(&self.spec_json)?,
      trace:        decode_json(&self.trace_json)?,
      derived_from: decode_json(&self.derived_from_json)?,
      compiler:     CompilerMeta {
        provider:       self.provider,
        model:          self.model,
        prompt_version: self.prompt_version,
        prompt_digest:  self.prompt_digest,
        temperature:    self.temperature as f32,
      },
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const ISSUE_COLUMNS: &str = "issue_id, project_id, snapshot_id, kind, severity, message, \
                                 spec_paths, question_ids, created_at";

/// Raw strings read directly from an `issues` row.
pub struct RawIssue {
  pub issue_id:     String,
  pub project_id:   String,
  pub snapshot_id:  String,
  pub kind:         String,
  pub severity:     String,
  pub message:      String,
  pub spec_paths:   String,
  pub question_ids: String,
  pub created_at:   String,
}

impl RawIssue {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      issue_id:     row.get(0)?,
      project_id:   row.get(1)?,
      snapshot_id:  row.get(2)?,
      kind:         row.get(3)?,
      severity:     row.get(4)?,
      message:      row.get(5)?,
      spec_paths:   row.get(6)?,
      question_ids: row.get(7)?,
      created_at:   row.get(8)?,
    })
  }

  pub fn into_issue(self) -> Result<Issue> {
    Ok(Issue {
      issue_id:     decode_uuid(&self.issue_id)?,
      project_id:   decode_uuid(&self.project_id)?,
      snapshot_id:  decode_uuid(&self.snapshot_id)?,
      kind:         decode_enum("kind", &self.kind)?,
      severity:     decode_enum("severity", &self.severity)?,
      message:      self.message,
      spec_paths:   decode_json(&self.spec_paths)?,
      question_ids: decode_json(&self.question_ids)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
