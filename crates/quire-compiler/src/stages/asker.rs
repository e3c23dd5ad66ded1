//! Asker: words planner intents as concrete questions.
//!
//! Duplicate avoidance is asked of the model through the existing-question
//! list; the workflow additionally drops exact duplicates by normalized text.

use quire_core::{
  bundle::QaBundle,
  project::Project,
  question::{NewQuestion, Question, QuestionKind},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{parse_reply, planner::QuestionIntent, to_prompt};
use crate::{
  error::StageError,
  prompt::{self, Mode, RenderedPrompt, Stage},
};

pub struct AskInput<'a> {
  pub project:      &'a Project,
  pub intents:      &'a [QuestionIntent],
  pub current_spec: &'a Value,
  pub questions:    &'a [Question],
  pub answers:      &'a [QaBundle],
  pub mode:         Mode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedQuestion {
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

impl ProposedQuestion {
  pub fn into_new_question(self, project_id: Uuid) -> NewQuestion {
    NewQuestion {
      project_id,
      text: self.text,
      kind: self.kind,
      options: self.options,
      tags: self.tags,
      priority: self.priority,
      spec_paths: self.spec_paths,
    }
  }
}

#[derive(Deserialize)]
struct Reply {
  #[serde(default)]
  questions: Vec<ProposedQuestion>,
}

pub fn prompt(input: &AskInput<'_>) -> Result<RenderedPrompt, StageError> {
  Ok(prompt::template(Stage::Asker, input.mode).render(&[
    ("project", to_prompt(input.project)?),
    ("suggestions", to_prompt(input.intents)?),
    ("current_spec", to_prompt(input.current_spec)?),
    ("questions", to_prompt(input.questions)?),
    ("answers", to_prompt(input.answers)?),
  ]))
}

pub fn parse(content: &str) -> Result<Vec<ProposedQuestion>, StageError> {
  parse_reply::<Reply>(content).map(|r| r.questions)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn parses_questions_with_defaults() {
    let reply = json!({
      "questions": [
        { "text": "Who are the users?", "kind": "freeform" },
        { "text": "Which platforms?", "kind": "multi", "options": ["web", "ios"], "priority": 2 }
      ]
    });
    let questions = parse(&reply.to_string()).unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].priority, 0);
    assert_eq!(questions[1].options.as_deref(), Some(&["web".to_string(), "ios".to_string()][..]));

    let project = Uuid::new_v4();
    let input = questions[1].clone().into_new_question(project);
    assert_eq!(input.project_id, project);
    assert_eq!(input.kind, QuestionKind::Multi);
  }
}
