//! Error types for `quire-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
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

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
