//! Issue Hydrator: stage drafts → identified issues.

use std::collections::HashSet;

use chrono::Utc;
use quire_core::issue::{Issue, IssueDraft};
use tracing::warn;
use uuid::Uuid;

/// Assign identity and timestamp to every draft and resolve its question
/// references against `known_questions`.
///
/// A reference that is not a UUID, or names a question outside the project,
/// is dropped on its own; the rest of the issue is kept.
pub fn hydrate(
  drafts: Vec<IssueDraft>,
  project_id: Uuid,
  snapshot_id: Uuid,
  known_questions: &HashSet<Uuid>,
) -> Vec<Issue> {
  let created_at = Utc::now();
  drafts
    .into_iter()
    .map(|draft| {
      let mut question_ids = Vec::with_capacity(draft.question_ids.len());
      for raw in &draft.question_ids {
        match Uuid::parse_str(raw.trim()) {
          Ok(id) if known_questions.contains(&id) => {
            if !question_ids.contains(&id) {
              question_ids.push(id);
            }
          }
          _ => warn!(%snapshot_id, reference = %raw, "dropping unresolved question reference"),
        }
      }
      Issue {
        issue_id: Uuid::new_v4(),
        project_id,
        snapshot_id,
        kind: draft.kind,
        severity: draft.severity,
        message: draft.message,
        spec_paths: draft.spec_paths,
        question_ids,
        created_at,
      }
    })
    .collect()
}
