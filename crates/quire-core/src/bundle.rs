//! QA bundles: a question joined with its latest answer.
//!
//! Bundles are the only view of the ledger the compiler sees. Provenance
//! (`derived_from`) is computed from the bundles, never from model output.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  answer::Answer,
  question::{Question, QuestionKind},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaBundle {
  pub question_id:    Uuid,
  pub question:       String,
  pub kind:           QuestionKind,
  pub tags:           Vec<String>,
  pub spec_paths:     Vec<String>,
  pub answer_id:      Uuid,
  pub answer_version: u32,
  pub value:          Value,
}

impl QaBundle {
  pub fn new(question: &Question, answer: &Answer) -> Self {
    Self {
      question_id:    question.question_id,
      question:       question.text.clone(),
      kind:           question.kind,
      tags:           question.tags.clone(),
      spec_paths:     question.spec_paths.clone(),
      answer_id:      answer.answer_id,
      answer_version: answer.version,
      value:          answer.value.clone(),
    }
  }
}

/// Join `questions` with `latest_answers`.
///
/// Questions without an answer are left out; answers whose question is not
/// in `questions` are ignored. The result is ordered by question priority,
/// then creation time, then id, so the same ledger state always renders the
/// same prompt.
pub fn materialize(questions: &[Question], latest_answers: &[Answer]) -> Vec<QaBundle> {
  let by_question: HashMap<Uuid, &Answer> = latest_answers
    .iter()
    .map(|a| (a.question_id, a))
    .collect();

  let mut answered: Vec<&Question> = questions
    .iter()
    .filter(|q| by_question.contains_key(&q.question_id))
    .collect();
  answered.sort_by(|a, b| {
    a.priority
      .cmp(&b.priority)
      .then(a.created_at.cmp(&b.created_at))
      .then(a.question_id.cmp(&b.question_id))
  });

  answered
    .into_iter()
    .filter_map(|q| by_question.get(&q.question_id).map(|a| QaBundle::new(q, a)))
    .collect()
}

/// The `{question_id: answer_version}` provenance of a set of bundles.
pub fn derived_from(bundles: &[QaBundle]) -> BTreeMap<Uuid, u32> {
  bundles
    .iter()
    .map(|b| (b.question_id, b.answer_version))
    .collect()
}
