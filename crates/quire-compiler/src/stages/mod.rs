//! The LLM-backed stages.
//!
//! A stage is a pair of pure functions: one renders its prompt from typed
//! inputs, the other parses the model's reply into typed output. Calling the
//! completion service, budgets and timeouts live in
//! [`crate::orchestrator`].

pub mod asker;
pub mod compiler;
pub mod planner;
pub mod suggester;
pub mod validator;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::StageError;

/// Serialize a prompt input. Maps serialize with sorted keys, so equal inputs
/// render equal text.
pub(crate) fn to_prompt<T: Serialize + ?Sized>(value: &T) -> Result<String, StageError> {
  serde_json::to_string_pretty(value).map_err(StageError::Render)
}

/// Parse a model reply as JSON, tolerating a surrounding Markdown code fence.
pub(crate) fn parse_reply<T: DeserializeOwned>(content: &str) -> Result<T, StageError> {
  Ok(serde_json::from_str(strip_fence(content))?)
}

fn strip_fence(content: &str) -> &str {
  let trimmed = content.trim();
  let Some(rest) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  let body = rest.split_once('\n').map_or("", |(_, body)| body);
  body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
  use serde_json::{Value, json};

  use super::*;

  #[test]
  fn fenced_replies_parse() {
    let v: Value = parse_reply("```json\n{\"a\": 1}\n```").unwrap();
    assert_eq!(v, json!({ "a": 1 }));
    let v: Value = parse_reply("  {\"a\": 2}  ").unwrap();
    assert_eq!(v, json!({ "a": 2 }));
  }

  #[test]
  fn prose_is_a_parse_error() {
    assert!(matches!(
      parse_reply::<Value>("Sure! Here is your spec."),
      Err(StageError::Parse(_))
    ));
  }
}
