//! Questions: the prompts whose answers feed the compiler.
//!
//! A question is immutable apart from its [`QuestionStatus`]. Questions are
//! created when a project is initialised or by the asker stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The shape an answer to a question must take.
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
pub enum QuestionKind {
  /// Exactly one of the question's options.
  Single,
  /// Any subset of the question's options.
  Multi,
  /// Arbitrary JSON.
  Freeform,
}

impl QuestionKind {
  /// Whether questions of this kind carry an option list.
  pub fn has_options(self) -> bool { !matches!(self, Self::Freeform) }
}

/// Lifecycle status of a question.
///
/// Only `Unanswered → Answered` is driven by the ledger; the other states are
/// set by callers outside the compile pipeline.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum QuestionStatus {
  #[default]
  Unanswered,
  Answered,
  Skipped,
  Deferred,
}

// ─── Question ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
  pub question_id: Uuid,
  pub project_id:  Uuid,
  pub text:        String,
  pub kind:        QuestionKind,
  /// Present only for `single` and `multi` questions.
  pub options:     Option<Vec<String>>,
  pub tags:        Vec<String>,
  /// Lower values are asked first.
  pub priority:    i32,
  /// JSON pointer paths in the compiled document this question informs.
  pub spec_paths:  Vec<String>,
  pub status:      QuestionStatus,
  pub created_at:  DateTime<Utc>,
}

// ─── NewQuestion ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::SpecStore::create_questions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
  pub project_id: Uuid,
  pub text:       String,
  pub kind:       QuestionKind,
  #[serde(default)]
  pub options:    Option<Vec<String>>,
  #[serde(default)]
  pub tags:       Vec<String>,
  #[serde(default)]
  pub priority:   i32,
  #[serde(default)]
  pub spec_paths: Vec<String>,
}

impl NewQuestion {
  pub fn new(project_id: Uuid, text: impl Into<String>, kind: QuestionKind) -> Self {
    Self {
      project_id,
      text: text.into(),
      kind,
      options: None,
      tags: Vec::new(),
      priority: 0,
      spec_paths: Vec::new(),
    }
  }

  pub fn with_options<I, T>(mut self, options: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    self.options = Some(options.into_iter().map(Into::into).collect());
    self
  }

  /// Check the option list agrees with the question kind.
  ///
  /// Freeform questions silently lose any options they were given; choice
  /// questions must have at least one non-blank option.
  pub fn normalize(mut self) -> Result<Self> {
    if self.text.trim().is_empty() {
      return Err(Error::InvalidInput("question text must not be empty".into()));
    }
    if !self.kind.has_options() {
      self.options = None;
      return Ok(self);
    }
    let options: Vec<String> = self
      .options
      .take()
      .unwrap_or_default()
      .into_iter()
      .map(|o| o.trim().to_owned())
      .filter(|o| !o.is_empty())
      .collect();
    if options.is_empty() {
      return Err(Error::InvalidInput(format!(
        "{} question {:?} needs at least one option",
        self.kind, self.text
      )));
    }
    self.options = Some(options);
    Ok(self)
  }
}

/// Lowercased, whitespace-collapsed question text used to spot duplicates.
pub fn normalized_text(text: &str) -> String {
  text
    .split_whitespace()
    .map(|w| {
      w.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
    })
    .filter(|w| !w.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}
