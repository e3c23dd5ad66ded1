//! Suggester: drafts likely answers for unanswered questions.

use std::collections::HashSet;

use quire_core::{bundle::QaBundle, project::Project, question::Question};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{parse_reply, to_prompt};
use crate::{
  error::StageError,
  prompt::{self, Mode, RenderedPrompt, Stage},
};

pub struct SuggestInput<'a> {
  pub project:      &'a Project,
  pub unanswered:   &'a [Question],
  pub answers:      &'a [QaBundle],
  pub current_spec: &'a Value,
  pub mode:         Mode,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Confidence {
  High,
  Medium,
  Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSuggestion {
  pub question_id:     Uuid,
  pub suggested_value: Value,
  pub confidence:      Confidence,
  #[serde(default)]
  pub reasoning:       String,
}

#[derive(Deserialize)]
struct RawSuggestion {
  question_id:     String,
  suggested_value: Value,
  confidence:      Confidence,
  #[serde(default)]
  reasoning:       String,
}

#[derive(Deserialize)]
struct Reply {
  #[serde(default)]
  suggestions: Vec<RawSuggestion>,
}

pub fn prompt(input: &SuggestInput<'_>) -> Result<RenderedPrompt, StageError> {
  Ok(prompt::template(Stage::Suggester, input.mode).render(&[
    ("project", to_prompt(input.project)?),
    ("unanswered", to_prompt(input.unanswered)?),
    ("answers", to_prompt(input.answers)?),
    ("current_spec", to_prompt(input.current_spec)?),
  ]))
}

/// Parse the reply, keeping only suggestions for questions in `unanswered`.
pub fn parse(content: &str, unanswered: &[Question]) -> Result<Vec<AnswerSuggestion>, StageError> {
  let open: HashSet<Uuid> = unanswered.iter().map(|q| q.question_id).collect();
  let reply: Reply = parse_reply(content)?;
  Ok(
    reply
      .suggestions
      .into_iter()
      .filter_map(|raw| match Uuid::parse_str(raw.question_id.trim()) {
        Ok(id) if open.contains(&id) => Some(AnswerSuggestion {
          question_id:     id,
          suggested_value: raw.suggested_value,
          confidence:      raw.confidence,
          reasoning:       raw.reasoning,
        }),
        _ => {
          debug!(question_id = %raw.question_id, "dropping suggestion for unknown question");
          None
        }
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use pretty_assertions::assert_eq;
  use quire_core::question::{QuestionKind, QuestionStatus};
  use serde_json::json;

  use super::*;

  fn open_question() -> Question {
    Question {
      question_id: Uuid::new_v4(),
      project_id:  Uuid::new_v4(),
      text:        "Who?".into(),
      kind:        QuestionKind::Freeform,
      options:     None,
      tags:        vec![],
      priority:    0,
      spec_paths:  vec![],
      status:      QuestionStatus::Unanswered,
      created_at:  Utc::now(),
    }
  }

  #[test]
  fn suggestions_for_unknown_questions_are_dropped() {
    let q = open_question();
    let reply = json!({
      "suggestions": [
        { "question_id": q.question_id, "suggested_value": "nurses", "confidence": "high", "reasoning": "stated" },
        { "question_id": Uuid::new_v4(), "suggested_value": 1, "confidence": "low" },
        { "question_id": "q-17", "suggested_value": 2, "confidence": "medium" }
      ]
    });
    let suggestions = parse(&reply.to_string(), &[q.clone()]).unwrap();
    assert_eq!(suggestions, vec![AnswerSuggestion {
      question_id:     q.question_id,
      suggested_value: json!("nurses"),
      confidence:      Confidence::High,
      reasoning:       "stated".into(),
    }]);
  }
}
