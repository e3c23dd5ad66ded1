//! Planner: finds gaps in the current document and proposes question
//! intents to close them.

use quire_core::{
  bundle::QaBundle,
  issue::Issue,
  project::Project,
  question::{Question, QuestionKind},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_reply, to_prompt};
use crate::{
  error::StageError,
  prompt::{self, Mode, RenderedPrompt, Stage},
};

pub struct PlanInput<'a> {
  pub project:      &'a Project,
  pub current_spec: &'a Value,
  pub issues:       &'a [Issue],
  pub questions:    &'a [Question],
  pub answers:      &'a [QaBundle],
  pub mode:         Mode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTarget {
  pub gap_type:   String,
  #[serde(default)]
  pub spec_paths: Vec<String>,
  #[serde(default)]
  pub why_now:    String,
}

/// A question the planner wants asked, before the asker words it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionIntent {
  pub question_intent:     String,
  pub recommended_type:    QuestionKind,
  #[serde(default)]
  pub recommended_options: Option<Vec<String>>,
  #[serde(default)]
  pub priority:            i32,
  #[serde(default)]
  pub tags:                Vec<String>,
  #[serde(default)]
  pub spec_paths:          Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
  #[serde(default)]
  pub rationale:   String,
  #[serde(default)]
  pub targets:     Vec<PlanTarget>,
  #[serde(default)]
  pub suggestions: Vec<QuestionIntent>,
}

pub fn prompt(input: &PlanInput<'_>) -> Result<RenderedPrompt, StageError> {
  Ok(prompt::template(Stage::Planner, input.mode).render(&[
    ("project", to_prompt(input.project)?),
    ("current_spec", to_prompt(input.current_spec)?),
    ("issues", to_prompt(input.issues)?),
    ("questions", to_prompt(input.questions)?),
    ("answers", to_prompt(input.answers)?),
  ]))
}

pub fn parse(content: &str) -> Result<Plan, StageError> { parse_reply(content) }

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn parses_a_full_plan() {
    let reply = json!({
      "rationale": "nothing about users yet",
      "targets": [{ "gap_type": "missing_section", "spec_paths": ["/users"], "why_now": "blocks requirements" }],
      "suggestions": [{
        "question_intent": "who uses it",
        "recommended_type": "multi",
        "recommended_options": ["consumers", "businesses"],
        "priority": 1,
        "tags": ["users"],
        "spec_paths": ["/users"]
      }]
    });
    let plan = parse(&reply.to_string()).unwrap();
    assert_eq!(plan.targets[0].spec_paths, vec!["/users".to_string()]);
    assert_eq!(plan.suggestions[0].recommended_type, QuestionKind::Multi);
  }

  #[test]
  fn unknown_question_kind_fails() {
    let reply = json!({
      "suggestions": [{ "question_intent": "x", "recommended_type": "essay" }]
    });
    assert!(parse(&reply.to_string()).is_err());
  }
}
