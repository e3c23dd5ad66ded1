//! Error types for `quire-compiler`.

use std::time::Duration;

use quire_core::store::{StoreError, StoreErrorKind};
use thiserror::Error;
use uuid::Uuid;

use crate::completion::CompletionError;

/// Why a single LLM-backed stage call failed.
#[derive(Debug, Error)]
pub enum StageError {
  #[error(transparent)]
  Completion(#[from] CompletionError),

  #[error("unparsable response: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("failed to render prompt: {0}")]
  Render(#[source] serde_json::Error),

  #[error("timed out after {0:?}")]
  Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("planner failed: {0}")]
  PlannerFailed(#[source] StageError),

  #[error("asker failed: {0}")]
  AskerFailed(#[source] StageError),

  #[error("suggester failed: {0}")]
  SuggesterFailed(#[source] StageError),

  #[error("compilation failed: {0}")]
  CompilationFailed(#[source] StageError),

  #[error("validator failed: {0}")]
  ValidatorFailed(#[source] StageError),

  /// Compiling with zero answers is rejected before any completion call.
  #[error("project {0} has no answers to compile")]
  NoAnswers(Uuid),

  #[error("project not found: {0}")]
  ProjectNotFound(Uuid),

  #[error("question not found: {0}")]
  QuestionNotFound(Uuid),

  #[error("snapshot not found: {0}")]
  SnapshotNotFound(Uuid),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unknown completion provider: {0:?}")]
  UnknownProvider(String),

  #[error("output schema error: {0}")]
  Schema(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Lift a backend error, keeping lookup and conflict failures distinct
  /// from internal ones.
  pub fn store(e: impl StoreError) -> Self {
    match e.kind() {
      StoreErrorKind::ProjectNotFound(id) => Self::ProjectNotFound(id),
      StoreErrorKind::QuestionNotFound(id) => Self::QuestionNotFound(id),
      StoreErrorKind::SnapshotNotFound(id) => Self::SnapshotNotFound(id),
      StoreErrorKind::InvalidInput => Self::InvalidInput(e.to_string()),
      StoreErrorKind::Conflict => Self::Conflict(e.to_string()),
      StoreErrorKind::Other => Self::Store(Box::new(e)),
    }
  }

  /// The stage failure behind this error, if any.
  pub fn stage_error(&self) -> Option<&StageError> {
    match self {
      Self::PlannerFailed(e)
      | Self::AskerFailed(e)
      | Self::SuggesterFailed(e)
      | Self::CompilationFailed(e)
      | Self::ValidatorFailed(e) => Some(e),
      _ => None,
    }
  }

  /// Whether repeating the same request may succeed. Stage failures are
  /// retryable; precondition and lookup failures are not.
  pub fn is_retryable(&self) -> bool { self.stage_error().is_some() }
}

impl From<quire_core::Error> for Error {
  fn from(e: quire_core::Error) -> Self {
    use quire_core::Error as Core;
    match e {
      Core::ProjectNotFound(id) => Self::ProjectNotFound(id),
      Core::QuestionNotFound(id) => Self::QuestionNotFound(id),
      Core::SnapshotNotFound(id) => Self::SnapshotNotFound(id),
      Core::InvalidInput(m) => Self::InvalidInput(m),
      Core::Conflict(m) => Self::Conflict(m),
      Core::Serialization(e) => Self::InvalidInput(e.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn store_conflicts_become_conflicts() {
    let id = Uuid::new_v4();
    let err = Error::store(quire_store_sqlite::Error::VersionConflict(id));
    assert!(matches!(err, Error::Conflict(ref m) if m.contains(&id.to_string())));
    assert!(!err.is_retryable());
  }

  #[test]
  fn store_lookups_become_not_found() {
    let id = Uuid::new_v4();
    assert!(matches!(
      Error::store(quire_store_sqlite::Error::QuestionNotFound(id)),
      Error::QuestionNotFound(q) if q == id
    ));
    assert!(matches!(
      Error::store(quire_store_sqlite::Error::ProjectNotFound(id)),
      Error::ProjectNotFound(p) if p == id
    ));
    assert!(matches!(
      Error::store(quire_core::Error::SnapshotNotFound(id)),
      Error::SnapshotNotFound(s) if s == id
    ));
  }

  #[test]
  fn other_store_failures_stay_internal() {
    let err = Error::store(quire_store_sqlite::Error::Decode("bad row".into()));
    assert!(matches!(err, Error::Store(_)));
  }
}
