//! Project: the envelope that owns questions, answers and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub project_id:  Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::SpecStore::create_project`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
}

impl NewProject {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), description: None }
  }

  /// Reject blank names before anything reaches the store.
  pub fn validate(&self) -> crate::Result<()> {
    if self.name.trim().is_empty() {
      return Err(crate::Error::InvalidInput("project name must not be empty".into()));
    }
    Ok(())
  }
}
