//! Validator: advisory semantic review of a compiled document.
//!
//! Drafts are decoded one at a time so a single malformed entry does not
//! discard the rest of the review.

use quire_core::{bundle::QaBundle, issue::IssueDraft, project::Project};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{parse_reply, to_prompt};
use crate::{
  error::StageError,
  prompt::{self, Mode, RenderedPrompt, Stage},
};

pub struct ValidateInput<'a> {
  pub project: &'a Project,
  pub spec:    &'a Value,
  pub bundles: &'a [QaBundle],
}

#[derive(Deserialize)]
struct Reply {
  #[serde(default)]
  issues: Vec<Value>,
}

pub fn prompt(input: &ValidateInput<'_>) -> Result<RenderedPrompt, StageError> {
  Ok(prompt::template(Stage::Validator, Mode::default()).render(&[
    ("project", to_prompt(input.project)?),
    ("bundles", to_prompt(input.bundles)?),
    ("spec", to_prompt(input.spec)?),
  ]))
}

pub fn parse(content: &str) -> Result<Vec<IssueDraft>, StageError> {
  let reply: Reply = parse_reply(content)?;
  Ok(
    reply
      .issues
      .into_iter()
      .filter_map(|raw| match serde_json::from_value::<IssueDraft>(raw) {
        Ok(draft) => Some(draft),
        Err(e) => {
          debug!(error = %e, "skipping malformed issue draft");
          None
        }
      })
      .collect(),
  )
}
