//! Compiler: turns QA bundles into a `{spec, trace}` pair.
//!
//! The model's trace is only a claim. Each reference is resolved against the
//! bundles actually supplied, so a trace entry always names an answer
//! version the compiler was given. Provenance (`derived_from`) never comes
//! from the model at all; see [`quire_core::bundle::derived_from`].

use std::collections::{BTreeMap, HashMap};

use quire_core::{
  bundle::QaBundle,
  issue::{IssueDraft, IssueKind, Severity},
  path,
  project::Project,
  trace::{Trace, TraceEntry},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{parse_reply, to_prompt};
use crate::{
  error::StageError,
  prompt::{self, Mode, RenderedPrompt, Stage},
};

pub struct CompileInput<'a> {
  pub project:      &'a Project,
  pub bundles:      &'a [QaBundle],
  pub current_spec: &'a Value,
  pub schema:       &'a Value,
}

/// A trace reference as a model writes it: a bare id or an entry object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTraceRef {
  Id(String),
  Entry { question_id: String },
}

impl RawTraceRef {
  fn question_id(&self) -> &str {
    match self {
      Self::Id(id) | Self::Entry { question_id: id } => id,
    }
  }
}

/// The parsed reply before its trace is resolved.
#[derive(Debug, Deserialize)]
pub struct RawCompilation {
  pub spec: Value,
  #[serde(default)]
  trace:    BTreeMap<String, Vec<RawTraceRef>>,
}

pub fn prompt(input: &CompileInput<'_>) -> Result<RenderedPrompt, StageError> {
  Ok(prompt::template(Stage::Compiler, Mode::default()).render(&[
    ("schema", to_prompt(input.schema)?),
    ("project", to_prompt(input.project)?),
    ("bundles", to_prompt(input.bundles)?),
    ("current_spec", to_prompt(input.current_spec)?),
  ]))
}

pub fn parse(content: &str) -> Result<RawCompilation, StageError> { parse_reply(content) }

impl RawCompilation {
  /// Resolve the claimed trace against `bundles`, dropping references to
  /// questions that were not supplied.
  pub fn resolve_trace(&self, bundles: &[QaBundle]) -> Trace {
    let by_question: HashMap<Uuid, &QaBundle> =
      bundles.iter().map(|b| (b.question_id, b)).collect();

    let mut trace = Trace::new();
    for (raw_path, refs) in &self.trace {
      let pointer = normalize_path(raw_path);
      for r in refs {
        let bundle = Uuid::parse_str(r.question_id().trim())
          .ok()
          .and_then(|id| by_question.get(&id));
        match bundle {
          Some(b) => trace.insert(pointer.clone(), TraceEntry {
            question_id:    b.question_id,
            answer_id:      b.answer_id,
            answer_version: b.answer_version,
          }),
          None => debug!(path = %pointer, reference = r.question_id(), "unresolved trace reference"),
        }
      }
    }
    trace
  }
}

/// Normalize a model-written path to a JSON pointer.
///
/// Pointers pass through. Dotted paths (`product.name`, `goals[0]`,
/// `$.goals.0`) are converted segment by segment.
pub fn normalize_path(raw: &str) -> String {
  let raw = raw.trim();
  if raw.is_empty() || raw.starts_with('/') {
    return raw.to_owned();
  }
  let raw = raw.strip_prefix("$.").or_else(|| raw.strip_prefix('$')).unwrap_or(raw);
  raw
    .replace('[', ".")
    .replace(']', "")
    .split('.')
    .filter(|s| !s.is_empty())
    .fold(String::new(), |acc, seg| path::push(&acc, seg))
}

/// One `assumption` draft per top-level section holding untraced leaves.
pub fn coverage_drafts(spec: &Value, trace: &Trace) -> Vec<IssueDraft> {
  let mut by_section: BTreeMap<String, Vec<String>> = BTreeMap::new();
  for leaf in trace.uncovered_paths(spec) {
    let section = path::top_level_segment(&leaf).unwrap_or_default();
    by_section.entry(section).or_default().push(leaf);
  }

  by_section
    .into_iter()
    .map(|(section, paths)| {
      let where_ = if section.is_empty() {
        "at the document root".to_owned()
      } else {
        format!("in section `{section}`")
      };
      IssueDraft {
        kind:         IssueKind::Assumption,
        severity:     Severity::Warning,
        message:      format!("{} value(s) {where_} are not traced to any answer", paths.len()),
        spec_paths:   paths,
        question_ids: vec![],
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use quire_core::question::QuestionKind;
  use serde_json::json;

  use super::*;

  fn bundle(version: u32) -> QaBundle {
    QaBundle {
      question_id:    Uuid::new_v4(),
      question:       "What is it called?".into(),
      kind:           QuestionKind::Freeform,
      tags:           vec![],
      spec_paths:     vec!["/product/name".into()],
      answer_id:      Uuid::new_v4(),
      answer_version: version,
      value:          json!("Quire"),
    }
  }

  #[test]
  fn trace_resolves_against_supplied_bundles() {
    let b = bundle(3);
    let reply = json!({
      "spec": { "product": { "name": "Quire" } },
      "trace": {
        "/product/name": [{ "question_id": b.question_id, "answer_version": 99 }],
        "product.summary": [b.question_id.to_string(), Uuid::new_v4().to_string()]
      }
    });
    let raw = parse(&reply.to_string()).unwrap();
    let trace = raw.resolve_trace(std::slice::from_ref(&b));

    let expected = TraceEntry {
      question_id:    b.question_id,
      answer_id:      b.answer_id,
      answer_version: 3,
    };
    assert_eq!(trace.entries("/product/name"), &[expected]);
    assert_eq!(trace.entries("/product/summary"), &[expected]);
  }

  #[test]
  fn missing_spec_is_a_parse_error() {
    assert!(matches!(parse("{\"trace\": {}}"), Err(StageError::Parse(_))));
  }

  #[test]
  fn paths_normalize_to_pointers() {
    assert_eq!(normalize_path("/a/b"), "/a/b");
    assert_eq!(normalize_path("a.b"), "/a/b");
    assert_eq!(normalize_path("goals[1].text"), "/goals/1/text");
    assert_eq!(normalize_path("$.data_model.entities"), "/data_model/entities");
    assert_eq!(normalize_path("a/b.c"), "/a~1b/c");
  }

  #[test]
  fn coverage_groups_untraced_leaves_by_section() {
    let spec = json!({
      "product": { "name": "Quire", "summary": "specs" },
      "goals": ["fast", "safe"]
    });
    let mut trace = Trace::new();
    trace.insert("/product/name", TraceEntry {
      question_id:    Uuid::nil(),
      answer_id:      Uuid::nil(),
      answer_version: 1,
    });

    let drafts = coverage_drafts(&spec, &trace);
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0].spec_paths, vec!["/goals/0".to_string(), "/goals/1".to_string()]);
    assert_eq!(drafts[1].spec_paths, vec!["/product/summary".to_string()]);
    assert!(drafts.iter().all(|d| d.kind == IssueKind::Assumption));
  }

  #[test]
  fn fully_traced_document_has_no_coverage_drafts() {
    let spec = json!({ "goals": ["fast"] });
    let mut trace = Trace::new();
    trace.insert("/goals/0", TraceEntry {
      question_id:    Uuid::nil(),
      answer_id:      Uuid::nil(),
      answer_version: 1,
    });
    assert!(coverage_drafts(&spec, &trace).is_empty());
  }
}
