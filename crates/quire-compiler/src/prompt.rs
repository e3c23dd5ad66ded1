//! Versioned prompt templates.
//!
//! Each stage has one template per [`Mode`] (the compiler and validator share
//! one across modes). Templates are rendered by plain `{{name}}` substitution;
//! values are passed in already serialized so that the same inputs always
//! render byte-identical prompts. Bump a template's `version` whenever its
//! text changes: the version is recorded on every snapshot.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::completion::{Message, Role};

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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
  /// Plain-language questions for non-technical owners.
  #[default]
  Basic,
  /// Engineering-level questions: interfaces, data, failure modes.
  Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
  Planner,
  Asker,
  Suggester,
  Compiler,
  Validator,
}

#[derive(Debug)]
pub struct PromptTemplate {
  pub stage:   Stage,
  pub mode:    Option<Mode>,
  pub version: u32,
  system:      &'static str,
  user:        &'static str,
}

/// A template filled in and ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
  pub version:  String,
  pub messages: Vec<Message>,
  /// SHA-256 hex digest over the rendered messages.
  pub digest:   String,
}

impl PromptTemplate {
  /// Identifier recorded as `prompt_version`, e.g. `planner.basic@v2`.
  pub fn id(&self) -> String {
    match self.mode {
      Some(mode) => format!("{}.{mode}@v{}", self.stage, self.version),
      None => format!("{}@v{}", self.stage, self.version),
    }
  }

  pub fn render(&self, vars: &[(&str, String)]) -> RenderedPrompt {
    let messages = vec![
      Message::system(fill(self.system, vars)),
      Message::user(fill(self.user, vars)),
    ];
    let digest = digest(&messages);
    RenderedPrompt { version: self.id(), messages, digest }
  }
}

/// Single left-to-right pass over `template`. Substituted values are never
/// rescanned, so a value containing `{{name}}` is emitted verbatim. Unknown
/// placeholders are left as written.
fn fill(template: &str, vars: &[(&str, String)]) -> String {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;

  while let Some(start) = rest.find("{{") {
    out.push_str(&rest[..start]);
    let after = &rest[start + 2..];
    let hit = after.find("}}").and_then(|end| {
      let name = &after[..end];
      vars
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, value)| (value, end))
    });
    match hit {
      Some((value, end)) => {
        out.push_str(value);
        rest = &after[end + 2..];
      }
      None => {
        out.push_str("{{");
        rest = after;
      }
    }
  }

  out.push_str(rest);
  out
}

fn digest(messages: &[Message]) -> String {
  let mut hasher = Sha256::new();
  for m in messages {
    hasher.update(role_tag(m.role));
    hasher.update([0u8]);
    hasher.update(m.content.as_bytes());
    hasher.update([0u8]);
  }
  hex::encode(hasher.finalize())
}

fn role_tag(role: Role) -> &'static [u8] {
  match role {
    Role::System => b"system",
    Role::User => b"user",
    Role::Assistant => b"assistant",
  }
}

/// The template for `stage` in `mode`.
pub fn template(stage: Stage, mode: Mode) -> &'static PromptTemplate {
  match (stage, mode) {
    (Stage::Planner, Mode::Basic) => &PLANNER_BASIC,
    (Stage::Planner, Mode::Advanced) => &PLANNER_ADVANCED,
    (Stage::Asker, Mode::Basic) => &ASKER_BASIC,
    (Stage::Asker, Mode::Advanced) => &ASKER_ADVANCED,
    (Stage::Suggester, Mode::Basic) => &SUGGESTER_BASIC,
    (Stage::Suggester, Mode::Advanced) => &SUGGESTER_ADVANCED,
    (Stage::Compiler, _) => &COMPILER,
    (Stage::Validator, _) => &VALIDATOR,
  }
}

// ─── Templates ───────────────────────────────────────────────────────────────

static PLANNER_BASIC: PromptTemplate = PromptTemplate {
  stage:   Stage::Planner,
  mode:    Some(Mode::Basic),
  version: 1,
  system:  "You plan the next questions for a product specification interview.
The person answering is not technical. Find the most important gaps in the
current specification and propose intents for plain-language questions that
would close them. Prefer questions with a few clear choices.
Respond with a single JSON object and nothing else, shaped as:
{\"rationale\": string,
 \"targets\": [{\"gap_type\": string, \"spec_paths\": [string], \"why_now\": string}],
 \"suggestions\": [{\"question_intent\": string,
   \"recommended_type\": \"single\"|\"multi\"|\"freeform\",
   \"recommended_options\": [string] | null, \"priority\": integer,
   \"tags\": [string], \"spec_paths\": [string]}]}
Lower priority numbers are asked first. spec_paths are JSON pointers.",
  user:    "Project:\n{{project}}\n\nCurrent specification:\n{{current_spec}}\n\n\
Open issues:\n{{issues}}\n\nExisting questions:\n{{questions}}\n\n\
Latest answers:\n{{answers}}",
};

static PLANNER_ADVANCED: PromptTemplate = PromptTemplate {
  stage:   Stage::Planner,
  mode:    Some(Mode::Advanced),
  version: 1,
  system:  "You plan the next questions for a technical specification review.
The person answering is an engineer. Look for gaps in architecture, data
model, interfaces, constraints, failure handling and non-functional
requirements, and propose precise question intents that would close them.
Respond with a single JSON object and nothing else, shaped as:
{\"rationale\": string,
 \"targets\": [{\"gap_type\": string, \"spec_paths\": [string], \"why_now\": string}],
 \"suggestions\": [{\"question_intent\": string,
   \"recommended_type\": \"single\"|\"multi\"|\"freeform\",
   \"recommended_options\": [string] | null, \"priority\": integer,
   \"tags\": [string], \"spec_paths\": [string]}]}
Lower priority numbers are asked first. spec_paths are JSON pointers.",
  user:    "Project:\n{{project}}\n\nCurrent specification:\n{{current_spec}}\n\n\
Open issues:\n{{issues}}\n\nExisting questions:\n{{questions}}\n\n\
Latest answers:\n{{answers}}",
};

static ASKER_BASIC: PromptTemplate = PromptTemplate {
  stage:   Stage::Asker,
  mode:    Some(Mode::Basic),
  version: 1,
  system:  "You turn question intents into concrete interview questions for a
non-technical product owner. Use everyday words. Never propose a question
that asks the same thing as one of the existing questions.
Respond with a single JSON object and nothing else, shaped as:
{\"questions\": [{\"text\": string, \"kind\": \"single\"|\"multi\"|\"freeform\",
  \"options\": [string] | null, \"tags\": [string], \"priority\": integer,
  \"spec_paths\": [string]}]}
single and multi questions must list their options.",
  user:    "Project:\n{{project}}\n\nQuestion intents:\n{{suggestions}}\n\n\
Current specification:\n{{current_spec}}\n\nExisting questions:\n{{questions}}\n\n\
Latest answers:\n{{answers}}",
};

static ASKER_ADVANCED: PromptTemplate = PromptTemplate {
  stage:   Stage::Asker,
  mode:    Some(Mode::Advanced),
  version: 1,
  system:  "You turn question intents into concrete specification questions for
an engineer. Be specific about protocols, data shapes, limits and failure
behaviour. Never propose a question that asks the same thing as one of the
existing questions.
Respond with a single JSON object and nothing else, shaped as:
{\"questions\": [{\"text\": string, \"kind\": \"single\"|\"multi\"|\"freeform\",
  \"options\": [string] | null, \"tags\": [string], \"priority\": integer,
  \"spec_paths\": [string]}]}
single and multi questions must list their options.",
  user:    "Project:\n{{project}}\n\nQuestion intents:\n{{suggestions}}\n\n\
Current specification:\n{{current_spec}}\n\nExisting questions:\n{{questions}}\n\n\
Latest answers:\n{{answers}}",
};

static SUGGESTER_BASIC: PromptTemplate = PromptTemplate {
  stage:   Stage::Suggester,
  mode:    Some(Mode::Basic),
  version: 1,
  system:  "You draft likely answers to open interview questions so the product
owner only has to confirm or correct them. Base every suggestion on what has
already been answered. For single questions suggest one option, for multi
questions an array of options, otherwise free text.
Respond with a single JSON object and nothing else, shaped as:
{\"suggestions\": [{\"question_id\": string, \"suggested_value\": any,
  \"confidence\": \"high\"|\"medium\"|\"low\", \"reasoning\": string}]}",
  user:    "Project:\n{{project}}\n\nOpen questions:\n{{unanswered}}\n\n\
Latest answers:\n{{answers}}\n\nCurrent specification:\n{{current_spec}}",
};

static SUGGESTER_ADVANCED: PromptTemplate = PromptTemplate {
  stage:   Stage::Suggester,
  mode:    Some(Mode::Advanced),
  version: 1,
  system:  "You draft likely answers to open technical specification questions.
Prefer conventional engineering choices consistent with the existing answers
and say which trade-off each suggestion makes. For single questions suggest
one option, for multi questions an array of options, otherwise free text.
Respond with a single JSON object and nothing else, shaped as:
{\"suggestions\": [{\"question_id\": string, \"suggested_value\": any,
  \"confidence\": \"high\"|\"medium\"|\"low\", \"reasoning\": string}]}",
  user:    "Project:\n{{project}}\n\nOpen questions:\n{{unanswered}}\n\n\
Latest answers:\n{{answers}}\n\nCurrent specification:\n{{current_spec}}",
};

static COMPILER: PromptTemplate = PromptTemplate {
  stage:   Stage::Compiler,
  mode:    None,
  version: 1,
  system:  "You compile interview answers into a specification document.
Use only information present in the answers; do not invent facts. Update the
current document rather than starting over. The document must follow this
JSON Schema:
{{schema}}
For every populated value in the document, list the questions whose answers
it came from in `trace`, keyed by the value's JSON pointer.
Respond with a single JSON object and nothing else, shaped as:
{\"spec\": object, \"trace\": {\"/json/pointer\": [{\"question_id\": string}]}}",
  user:    "Project:\n{{project}}\n\nAnswers:\n{{bundles}}\n\n\
Current document:\n{{current_spec}}",
};

static VALIDATOR: PromptTemplate = PromptTemplate {
  stage:   Stage::Validator,
  mode:    None,
  version: 1,
  system:  "You review a compiled specification against the answers it was
built from. Report contradictions (semantic_conflict), information the
document needs but the answers do not give (missing_info), content that was
assumed rather than answered (assumption) and statements that can be read
more than one way (ambiguity). Reference JSON pointers and question ids.
Respond with a single JSON object and nothing else, shaped as:
{\"issues\": [{\"kind\": \"semantic_conflict\"|\"missing_info\"|\"assumption\"|\"ambiguity\",
  \"severity\": \"error\"|\"warning\"|\"info\", \"message\": string,
  \"spec_paths\": [string], \"question_ids\": [string]}]}",
  user:    "Project:\n{{project}}\n\nAnswers:\n{{bundles}}\n\nDocument:\n{{spec}}",
};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn render_substitutes_every_placeholder() {
    let prompt = template(Stage::Validator, Mode::Basic).render(&[
      ("project", "P".into()),
      ("bundles", "B".into()),
      ("spec", "S".into()),
    ]);
    let user = &prompt.messages[1].content;
    assert_eq!(user, "Project:\nP\n\nAnswers:\nB\n\nDocument:\nS");
    assert!(!prompt.messages[0].content.contains("{{"));
  }

  #[test]
  fn placeholders_inside_values_are_not_expanded() {
    let prompt = template(Stage::Compiler, Mode::Basic).render(&[
      ("schema", "{}".into()),
      ("project", "named {{bundles}}".into()),
      ("bundles", "\"answer mentions {{current_spec}}\"".into()),
      ("current_spec", "CURRENT_DOC".into()),
    ]);
    let user = &prompt.messages[1].content;
    assert_eq!(
      user,
      "Project:\nnamed {{bundles}}\n\nAnswers:\n\"answer mentions \
       {{current_spec}}\"\n\nCurrent document:\nCURRENT_DOC"
    );
  }

  #[test]
  fn unknown_placeholders_are_left_alone() {
    assert_eq!(fill("a {{x}} b {{y", &[("z", "Z".into())]), "a {{x}} b {{y");
    assert_eq!(fill("{{x}}{{x}}", &[("x", "1".into())]), "11");
  }

  #[test]
  fn digest_is_stable_and_input_sensitive() {
    let t = template(Stage::Compiler, Mode::Basic);
    let vars = |p: &str| vec![("project", p.to_owned()), ("bundles", "[]".into())];
    let a = t.render(&vars("one"));
    let b = t.render(&vars("one"));
    let c = t.render(&vars("two"));
    assert_eq!(a.digest, b.digest);
    assert_ne!(a.digest, c.digest);
    assert_eq!(a.digest.len(), 64);
  }

  #[test]
  fn modes_select_distinct_templates() {
    assert_eq!(template(Stage::Planner, Mode::Basic).id(), "planner.basic@v1");
    assert_eq!(template(Stage::Planner, Mode::Advanced).id(), "planner.advanced@v1");
    assert_eq!(template(Stage::Compiler, Mode::Advanced).id(), "compiler@v1");
  }

  #[test]
  fn mode_parses_from_lowercase() {
    assert_eq!("advanced".parse::<Mode>().unwrap(), Mode::Advanced);
    assert_eq!(Mode::default(), Mode::Basic);
  }
}
