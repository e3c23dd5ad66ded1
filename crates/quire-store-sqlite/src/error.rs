//! Error type for `quire-store-sqlite`.

use quire_core::store::{StoreError, StoreErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] quire_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unrecognised column value: {0}")]
  Decode(String),

  #[error("project not found: {0}")]
  ProjectNotFound(uuid::Uuid),

  #[error("question not found: {0}")]
  QuestionNotFound(uuid::Uuid),

  /// Another writer kept claiming the same `(question_id, version)` slot.
  #[error("could not assign a version to an answer for question {0}")]
  VersionConflict(uuid::Uuid),
}

impl Error {
  /// Whether this error means a referenced row does not exist.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self.kind(),
      StoreErrorKind::ProjectNotFound(_)
        | StoreErrorKind::QuestionNotFound(_)
        | StoreErrorKind::SnapshotNotFound(_)
    )
  }
}

impl StoreError for Error {
  fn kind(&self) -> StoreErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::ProjectNotFound(id) => StoreErrorKind::ProjectNotFound(*id),
      Self::QuestionNotFound(id) => StoreErrorKind::QuestionNotFound(*id),
      Self::VersionConflict(_) => StoreErrorKind::Conflict,
      Self::Database(_)
      | Self::Json(_)
      | Self::Uuid(_)
      | Self::DateParse(_)
      | Self::Decode(_) => StoreErrorKind::Other,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn version_conflict_classifies_as_conflict() {
    let err = Error::VersionConflict(Uuid::new_v4());
    assert_eq!(err.kind(), StoreErrorKind::Conflict);
    assert!(!err.is_not_found());
  }

  #[test]
  fn missing_rows_classify_with_their_id() {
    let id = Uuid::new_v4();
    assert_eq!(Error::QuestionNotFound(id).kind(), StoreErrorKind::QuestionNotFound(id));
    assert_eq!(
      Error::Core(quire_core::Error::SnapshotNotFound(id)).kind(),
      StoreErrorKind::SnapshotNotFound(id)
    );
    assert!(Error::ProjectNotFound(id).is_not_found());
  }

  #[test]
  fn decode_failures_are_internal() {
    assert_eq!(Error::Decode("x".into()).kind(), StoreErrorKind::Other);
  }
}
