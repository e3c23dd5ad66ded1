//! The `SpecStore` trait: the repository contract the pipeline runs against.
//!
//! The trait is implemented by storage backends (e.g. `quire-store-sqlite`).
//! The compiler and API crates depend on this abstraction, never on a
//! concrete backend, and never issue raw queries.
//!
//! Instead of a generic "run this closure in a transaction" hook, every
//! compound write the pipeline needs is a single trait method that the
//! backend must make atomic:
//!
//! - [`SpecStore::submit_answer`] reads the latest version and inserts the
//!   next one in one unit, so concurrent submissions cannot share a version.
//! - [`SpecStore::create_questions`] and [`SpecStore::record_issues`] commit
//!   all rows or none.

use std::future::Future;

use serde_json::Value;
use uuid::Uuid;

use crate::{
  answer::Answer,
  issue::Issue,
  project::{NewProject, Project},
  question::{NewQuestion, Question, QuestionStatus},
  snapshot::{NewSnapshot, SpecSnapshot},
};

/// What a backend error means to callers above the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
  ProjectNotFound(Uuid),
  QuestionNotFound(Uuid),
  SnapshotNotFound(Uuid),
  InvalidInput,
  /// A write lost to a concurrent writer and may be retried.
  Conflict,
  Other,
}

/// Backend errors classify themselves so that lookups and write conflicts
/// are not reported as internal failures.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> StoreErrorKind;
}

impl StoreError for crate::Error {
  fn kind(&self) -> StoreErrorKind {
    match self {
      Self::ProjectNotFound(id) => StoreErrorKind::ProjectNotFound(*id),
      Self::QuestionNotFound(id) => StoreErrorKind::QuestionNotFound(*id),
      Self::SnapshotNotFound(id) => StoreErrorKind::SnapshotNotFound(*id),
      Self::InvalidInput(_) => StoreErrorKind::InvalidInput,
      Self::Conflict(_) => StoreErrorKind::Conflict,
      Self::Serialization(_) => StoreErrorKind::Other,
    }
  }
}

/// Abstraction over a Quire storage backend.
///
/// Answers and snapshots are append-only: no method updates or deletes them.
/// The only mutable column in the model is a question's status.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SpecStore: Send + Sync {
  type Error: StoreError;

  // ── Projects ──────────────────────────────────────────────────────────

  fn create_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn list_projects(
    &self,
  ) -> impl Future<Output = Result<Vec<Project>, Self::Error>> + Send + '_;

  // ── Questions ─────────────────────────────────────────────────────────

  /// Persist a batch of questions atomically, in input order.
  ///
  /// Returns an error (and writes nothing) if any referenced project does
  /// not exist.
  fn create_questions(
    &self,
    inputs: Vec<NewQuestion>,
  ) -> impl Future<Output = Result<Vec<Question>, Self::Error>> + Send + '_;

  fn get_question(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Question>, Self::Error>> + Send + '_;

  /// All questions of a project, ordered by priority then creation time.
  fn list_questions(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Question>, Self::Error>> + Send + '_;

  fn set_question_status(
    &self,
    question_id: Uuid,
    status: QuestionStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Answer ledger ─────────────────────────────────────────────────────

  /// Append a new answer version for `question_id`.
  ///
  /// The read of the current latest answer and the insert of the next
  /// version happen in one atomic unit.
  fn submit_answer(
    &self,
    question_id: Uuid,
    value: Value,
  ) -> impl Future<Output = Result<Answer, Self::Error>> + Send + '_;

  fn latest_answer(
    &self,
    question_id: Uuid,
  ) -> impl Future<Output = Result<Option<Answer>, Self::Error>> + Send + '_;

  /// The highest version for every answered question of a project.
  fn latest_answers_for_project(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Answer>, Self::Error>> + Send + '_;

  /// Every version for a question, oldest first.
  fn answer_history(
    &self,
    question_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Answer>, Self::Error>> + Send + '_;

  // ── Snapshots ─────────────────────────────────────────────────────────

  fn record_snapshot(
    &self,
    input: NewSnapshot,
  ) -> impl Future<Output = Result<SpecSnapshot, Self::Error>> + Send + '_;

  fn get_snapshot(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SpecSnapshot>, Self::Error>> + Send + '_;

  /// Snapshots of a project, newest first.
  fn list_snapshots(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SpecSnapshot>, Self::Error>> + Send + '_;

  fn latest_snapshot_id(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + '_;

  // ── Issues ────────────────────────────────────────────────────────────

  /// Persist hydrated issues atomically.
  fn record_issues(
    &self,
    issues: Vec<Issue>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_issues(
    &self,
    snapshot_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Issue>, Self::Error>> + Send + '_;
}
