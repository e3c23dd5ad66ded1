//! The declared shape of a compiled specification document.
//!
//! Schema violations never abort a compile. They are reported as
//! `schema_violation` issue drafts so the document survives as a draft.

use jsonschema::Validator;
use quire_core::issue::{IssueDraft, IssueKind, Severity};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{Error, Result};

/// JSON Schema (2020-12) for compiled documents.
pub fn spec_document_schema() -> Value {
  let strings = json!({ "type": "array", "items": { "type": "string" } });
  json!({
    "$schema": "https://json-schema.org/draft/2020-12/schema",
    "title": "Specification document",
    "type": "object",
    "required": ["product"],
    "additionalProperties": false,
    "properties": {
      "product": {
        "type": "object",
        "required": ["name", "summary"],
        "properties": {
          "name":    { "type": "string", "minLength": 1 },
          "summary": { "type": "string" },
          "problem": { "type": "string" }
        }
      },
      "users": {
        "type": "array",
        "items": {
          "type": "object",
          "required": ["name"],
          "properties": {
            "name":  { "type": "string" },
            "needs": strings
          }
        }
      },
      "goals": strings,
      "non_goals": strings,
      "requirements": {
        "type": "array",
        "items": {
          "type": "object",
          "required": ["id", "statement"],
          "properties": {
            "id":        { "type": "string" },
            "statement": { "type": "string" },
            "priority":  { "enum": ["must", "should", "could"] }
          }
        }
      },
      "architecture": { "type": "object" },
      "data_model": { "type": "object" },
      "interfaces": { "type": "array", "items": { "type": "object" } },
      "constraints": { "type": "object" },
      "risks": { "type": "array" },
      "assumptions": strings,
      "open_questions": strings,
      "milestones": {
        "type": "array",
        "items": {
          "type": "object",
          "required": ["name"],
          "properties": {
            "name":  { "type": "string" },
            "scope": strings
          }
        }
      },
      "glossary": { "type": "object", "additionalProperties": { "type": "string" } }
    }
  })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaError {
  /// JSON pointer of the offending value.
  pub path:    String,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
  pub valid:  bool,
  pub errors: Vec<SchemaError>,
}

impl SchemaReport {
  pub fn into_drafts(self) -> Vec<IssueDraft> {
    self
      .errors
      .into_iter()
      .map(|e| IssueDraft {
        kind:         IssueKind::SchemaViolation,
        severity:     Severity::Error,
        message:      e.message,
        spec_paths:   vec![e.path],
        question_ids: vec![],
      })
      .collect()
  }
}

/// A compiled validator for one schema.
pub struct SchemaValidator {
  schema:    Value,
  validator: Validator,
}

impl SchemaValidator {
  pub fn new(schema: Value) -> Result<Self> {
    let validator = jsonschema::validator_for(&schema).map_err(|e| Error::Schema(e.to_string()))?;
    Ok(Self { schema, validator })
  }

  /// Validator for [`spec_document_schema`].
  pub fn spec_document() -> Result<Self> { Self::new(spec_document_schema()) }

  pub fn schema(&self) -> &Value { &self.schema }

  /// Every violation in `document`, sorted by path then message.
  pub fn validate(&self, document: &Value) -> SchemaReport {
    let mut errors: Vec<SchemaError> = self
      .validator
      .iter_errors(document)
      .map(|e| SchemaError {
        path:    e.instance_path.to_string(),
        message: e.to_string(),
      })
      .collect();
    errors.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.message.cmp(&b.message)));
    SchemaReport { valid: errors.is_empty(), errors }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn minimal_document_is_valid() {
    let v = SchemaValidator::spec_document().unwrap();
    let report = v.validate(&json!({ "product": { "name": "Quire", "summary": "specs" } }));
    assert!(report.valid, "{report:?}");
    assert!(report.into_drafts().is_empty());
  }

  #[test]
  fn violations_become_error_drafts() {
    let v = SchemaValidator::spec_document().unwrap();
    let report = v.validate(&json!({
      "product": { "name": "Quire", "summary": "specs" },
      "goals": "be fast",
      "mystery": 1
    }));
    assert!(!report.valid);
    assert!(report.errors.iter().any(|e| e.path == "/goals"));

    let drafts = report.into_drafts();
    assert!(drafts.len() >= 2);
    assert!(drafts.iter().all(|d| d.kind == IssueKind::SchemaViolation));
    assert!(drafts.iter().all(|d| d.severity == Severity::Error));
  }

  #[test]
  fn missing_product_is_reported_at_root() {
    let v = SchemaValidator::spec_document().unwrap();
    let report = v.validate(&json!({}));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, "");
  }

  #[test]
  fn invalid_schema_is_rejected() {
    assert!(matches!(
      SchemaValidator::new(json!({ "type": "string", "pattern": "(" })),
      Err(Error::Schema(_))
    ));
  }
}
