//! Answers: the append-only ledger entries.
//!
//! An answer is never updated or deleted. Answering a question again always
//! records a new row whose `version` is one greater than the previous latest
//! answer and whose `supersedes` points at it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  question::{Question, QuestionKind},
};

/// An immutable answer version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
  pub answer_id:   Uuid,
  pub project_id:  Uuid,
  pub question_id: Uuid,
  pub value:       Value,
  /// Starts at 1 for each question and increases by one per submission.
  pub version:     u32,
  /// The answer this version replaces; `None` only for version 1.
  pub supersedes:  Option<Uuid>,
  pub created_at:  DateTime<Utc>,
}

impl Answer {
  /// The `(version, supersedes)` pair for the answer that follows `previous`.
  pub fn next_version(previous: Option<&Answer>) -> (u32, Option<Uuid>) {
    match previous {
      Some(prev) => (prev.version + 1, Some(prev.answer_id)),
      None => (1, None),
    }
  }
}

/// Check that `value` has the shape required by `question`'s kind.
pub fn validate_value(question: &Question, value: &Value) -> Result<()> {
  let options: HashSet<&str> = question
    .options
    .iter()
    .flatten()
    .map(String::as_str)
    .collect();

  match question.kind {
    QuestionKind::Single => {
      let Value::String(choice) = value else {
        return Err(Error::InvalidInput(
          "single-choice answer must be a string".into(),
        ));
      };
      if !options.is_empty() && !options.contains(choice.as_str()) {
        return Err(Error::InvalidInput(format!(
          "{choice:?} is not one of the question's options"
        )));
      }
    }
    QuestionKind::Multi => {
      let Value::Array(items) = value else {
        return Err(Error::InvalidInput(
          "multi-choice answer must be an array".into(),
        ));
      };
      let mut seen = HashSet::new();
      for item in items {
        let Value::String(choice) = item else {
          return Err(Error::InvalidInput(
            "multi-choice entries must be strings".into(),
          ));
        };
        if !options.is_empty() && !options.contains(choice.as_str()) {
          return Err(Error::InvalidInput(format!(
            "{choice:?} is not one of the question's options"
          )));
        }
        if !seen.insert(choice.as_str()) {
          return Err(Error::InvalidInput(format!("{choice:?} selected twice")));
        }
      }
    }
    QuestionKind::Freeform => {
      if value.is_null() {
        return Err(Error::InvalidInput("answer value must not be null".into()));
      }
    }
  }
  Ok(())
}
