//! [`SqliteStore`]: the SQLite implementation of [`SpecStore`].

use std::{collections::BTreeSet, path::Path, time::Duration};

use quire_core::{
  answer::Answer,
  issue::Issue,
  project::{NewProject, Project},
  question::{NewQuestion, Question, QuestionStatus},
  snapshot::{NewSnapshot, SpecSnapshot},
  store::SpecStore,
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    ANSWER_COLUMNS, ISSUE_COLUMNS, PROJECT_COLUMNS, QUESTION_COLUMNS, RawAnswer,
    RawIssue, RawProject, RawQuestion, RawSnapshot, SNAPSHOT_COLUMNS, decode_uuid,
    encode_dt, encode_json, encode_uuid, now,
  },
  schema::SCHEMA,
};

/// How many times an answer insert is retried after losing the
/// `(question_id, version)` slot to a concurrent writer.
const MAX_VERSION_ATTEMPTS: u32 = 3;

/// How long a writer waits for another connection's lock on the file before
/// SQLite reports `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of the transactional part of an answer submission.
enum SubmitOutcome {
  MissingQuestion,
  Inserted(Answer),
}

/// Result of a transactional write that first checks its parent rows.
enum CheckedWrite<T> {
  MissingProject(String),
  Done(T),
}

pub(crate) fn is_constraint_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(err, _))
      if err.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

fn project_exists(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM projects WHERE project_id = ?1",
        rusqlite::params![id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Quire store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_answers(&self, sql: String, id: Uuid) -> Result<Vec<Answer>> {
    let id_str = encode_uuid(id);
    let raws: Vec<RawAnswer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawAnswer::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawAnswer::into_answer).collect()
  }

  /// One attempt at the read-latest-then-insert-next sequence, run inside a
  /// single `IMMEDIATE` transaction.
  async fn try_submit_answer(
    &self,
    question_id: Uuid,
    value: Value,
  ) -> std::result::Result<SubmitOutcome, tokio_rusqlite::Error> {
    let question_id_str = encode_uuid(question_id);
    let answer_id = Uuid::new_v4();
    let created_at = now();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let project_id: Option<String> = tx
          .query_row(
            "SELECT project_id FROM questions WHERE question_id = ?1",
            rusqlite::params![question_id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(project_id) = project_id else {
          return Ok(SubmitOutcome::MissingQuestion);
        };

        let latest: Option<RawAnswer> = tx
          .query_row(
            &format!(
              "SELECT {ANSWER_COLUMNS} FROM answers
               WHERE question_id = ?1
               ORDER BY version DESC
               LIMIT 1"
            ),
            rusqlite::params![question_id_str],
            RawAnswer::from_row,
          )
          .optional()?;
        let latest = latest
          .map(RawAnswer::into_answer)
          .transpose()
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;

        let (version, supersedes) = Answer::next_version(latest.as_ref());
        let answer = Answer {
          answer_id,
          project_id: decode_uuid(&project_id)
            .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?,
          question_id,
          value,
          version,
          supersedes,
          created_at,
        };
        let value_json = encode_json(&answer.value)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;

        tx.execute(
          "INSERT INTO answers (
             answer_id, project_id, question_id, value_json,
             version, supersedes, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_uuid(answer.answer_id),
            project_id,
            question_id_str,
            value_json,
            answer.version,
            answer.supersedes.map(encode_uuid),
            encode_dt(answer.created_at),
          ],
        )?;
        tx.commit()?;

        Ok(SubmitOutcome::Inserted(answer))
      })
      .await
  }
}

// ─── SpecStore impl ──────────────────────────────────────────────────────────

impl SpecStore for SqliteStore {
  type Error = Error;

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn create_project(&self, input: NewProject) -> Result<Project> {
    input.validate()?;
    let project = Project {
      project_id:  Uuid::new_v4(),
      name:        input.name,
      description: input.description,
      created_at:  now(),
    };

    let id_str = encode_uuid(project.project_id);
    let name = project.name.clone();
    let description = project.description.clone();
    let at_str = encode_dt(project.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO projects (project_id, name, description, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, description, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(project)
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawProject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = ?1"),
              rusqlite::params![id_str],
              RawProject::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProject::into_project).transpose()
  }

  async fn list_projects(&self) -> Result<Vec<Project>> {
    let raws: Vec<RawProject> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map([], RawProject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProject::into_project).collect()
  }

  // ── Questions ─────────────────────────────────────────────────────────────

  async fn create_questions(&self, inputs: Vec<NewQuestion>) -> Result<Vec<Question>> {
    if inputs.is_empty() {
      return Ok(Vec::new());
    }

    let created_at = now();
    let questions: Vec<Question> = inputs
      .into_iter()
      .map(|input| -> Result<Question> {
        let input = input.normalize()?;
        Ok(Question {
          question_id: Uuid::new_v4(),
          project_id: input.project_id,
          text: input.text,
          kind: input.kind,
          options: input.options,
          tags: input.tags,
          priority: input.priority,
          spec_paths: input.spec_paths,
          status: QuestionStatus::Unanswered,
          created_at,
        })
      })
      .collect::<Result<_>>()?;

    let mut rows = Vec::with_capacity(questions.len());
    for q in &questions {
      rows.push((
        encode_uuid(q.question_id),
        encode_uuid(q.project_id),
        q.text.clone(),
        q.kind.to_string(),
        q.options.as_ref().map(encode_json).transpose()?,
        encode_json(&q.tags)?,
        q.priority,
        encode_json(&q.spec_paths)?,
        q.status.to_string(),
        encode_dt(q.created_at),
      ));
    }
    let project_ids: BTreeSet<String> =
      rows.iter().map(|row| row.1.clone()).collect();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for id in &project_ids {
          if !project_exists(&tx, id)? {
            return Ok(CheckedWrite::MissingProject(id.clone()));
          }
        }
        {
          let mut stmt = tx.prepare(
            "INSERT INTO questions (
               question_id, project_id, text, kind, options, tags,
               priority, spec_paths, status, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          )?;
          for row in &rows {
            stmt.execute(rusqlite::params![
              row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8, row.9,
            ])?;
          }
        }
        tx.commit()?;
        Ok(CheckedWrite::Done(()))
      })
      .await?;

    match outcome {
      CheckedWrite::MissingProject(id) => Err(Error::ProjectNotFound(decode_uuid(&id)?)),
      CheckedWrite::Done(()) => Ok(questions),
    }
  }

  async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawQuestion> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE question_id = ?1"),
              rusqlite::params![id_str],
              RawQuestion::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawQuestion::into_question).transpose()
  }

  async fn list_questions(&self, project_id: Uuid) -> Result<Vec<Question>> {
    let id_str = encode_uuid(project_id);

    let raws: Vec<RawQuestion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {QUESTION_COLUMNS} FROM questions
           WHERE project_id = ?1
           ORDER BY priority, created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawQuestion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuestion::into_question).collect()
  }

  async fn set_question_status(
    &self,
    question_id: Uuid,
    status: QuestionStatus,
  ) -> Result<()> {
    let id_str = encode_uuid(question_id);
    let status_str = status.to_string();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE questions SET status = ?2 WHERE question_id = ?1",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::QuestionNotFound(question_id));
    }
    Ok(())
  }

  // ── Answer ledger ─────────────────────────────────────────────────────────

  async fn submit_answer(&self, question_id: Uuid, value: Value) -> Result<Answer> {
    for attempt in 1..=MAX_VERSION_ATTEMPTS {
      match self.try_submit_answer(question_id, value.clone()).await {
        Ok(SubmitOutcome::MissingQuestion) => {
          return Err(Error::QuestionNotFound(question_id));
        }
        Ok(SubmitOutcome::Inserted(answer)) => return Ok(answer),
        Err(e) if is_constraint_violation(&e) => {
          tracing::warn!(
            %question_id,
            attempt,
            "answer version already taken by a concurrent writer; retrying"
          );
        }
        Err(e) => return Err(e.into()),
      }
    }
    Err(Error::VersionConflict(question_id))
  }

  async fn latest_answer(&self, question_id: Uuid) -> Result<Option<Answer>> {
    let mut answers = self
      .query_answers(
        format!(
          "SELECT {ANSWER_COLUMNS} FROM answers
           WHERE question_id = ?1
           ORDER BY version DESC
           LIMIT 1"
        ),
        question_id,
      )
      .await?;
    Ok(answers.pop())
  }

  async fn latest_answers_for_project(&self, project_id: Uuid) -> Result<Vec<Answer>> {
    self
      .query_answers(
        format!(
          "SELECT {ANSWER_COLUMNS} FROM answers
           WHERE project_id = ?1
             AND version = (
               SELECT MAX(b.version) FROM answers b
               WHERE b.question_id = answers.question_id
             )
           ORDER BY created_at, question_id"
        ),
        project_id,
      )
      .await
  }

  async fn answer_history(&self, question_id: Uuid) -> Result<Vec<Answer>> {
    self
      .query_answers(
        format!(
          "SELECT {ANSWER_COLUMNS} FROM answers
           WHERE question_id = ?1
           ORDER BY version"
        ),
        question_id,
      )
      .await
  }

  // ── Snapshots ─────────────────────────────────────────────────────────────

  async fn record_snapshot(&self, input: NewSnapshot) -> Result<SpecSnapshot> {
    let snapshot = SpecSnapshot {
      snapshot_id:  Uuid::new_v4(),
      project_id:   input.project_id,
      spec:         input.spec,
      trace:        input.trace,
      derived_from: input.derived_from,
      compiler:     input.compiler,
      created_at:   now(),
    };

    let snapshot_id_str = encode_uuid(snapshot.snapshot_id);
    let project_id_str = encode_uuid(snapshot.project_id);
    let spec_json = encode_json(&snapshot.spec)?;
    let trace_json = encode_json(&snapshot.trace)?;
    let derived_from_json = encode_json(&snapshot.derived_from)?;
    let meta = snapshot.compiler.clone();
    let at_str = encode_dt(snapshot.created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !project_exists(&tx, &project_id_str)? {
          return Ok(CheckedWrite::MissingProject(project_id_str));
        }
        tx.execute(
          "INSERT INTO snapshots (
             snapshot_id, project_id, spec_json, trace_json, derived_from_json,
             provider, model, prompt_version, prompt_digest, temperature, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            snapshot_id_str,
            project_id_str,
            spec_json,
            trace_json,
            derived_from_json,
            meta.provider,
            meta.model,
            meta.prompt_version,
            meta.prompt_digest,
            f64::from(meta.temperature),
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(CheckedWrite::Done(()))
      })
      .await?;

    match outcome {
      CheckedWrite::MissingProject(_) => Err(Error::ProjectNotFound(snapshot.project_id)),
      CheckedWrite::Done(()) => Ok(snapshot),
    }
  }

  async fn get_snapshot(&self, id: Uuid) -> Result<Option<SpecSnapshot>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSnapshot> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE snapshot_id = ?1"),
              rusqlite::params![id_str],
              RawSnapshot::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSnapshot::into_snapshot).transpose()
  }

  async fn list_snapshots(&self, project_id: Uuid) -> Result<Vec<SpecSnapshot>> {
    let id_str = encode_uuid(project_id);

    let raws: Vec<RawSnapshot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
           WHERE project_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawSnapshot::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSnapshot::into_snapshot).collect()
  }

  async fn latest_snapshot_id(&self, project_id: Uuid) -> Result<Option<Uuid>> {
    let id_str = encode_uuid(project_id);

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT snapshot_id FROM snapshots
               WHERE project_id = ?1
               ORDER BY created_at DESC, rowid DESC
               LIMIT 1",
              rusqlite::params![id_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_uuid).transpose()
  }

  // ── Issues ────────────────────────────────────────────────────────────────

  async fn record_issues(&self, issues: Vec<Issue>) -> Result<()> {
    if issues.is_empty() {
      return Ok(());
    }

    let mut rows = Vec::with_capacity(issues.len());
    for issue in &issues {
      rows.push((
        encode_uuid(issue.issue_id),
        encode_uuid(issue.project_id),
        encode_uuid(issue.snapshot_id),
        issue.kind.to_string(),
        issue.severity.to_string(),
        issue.message.clone(),
        encode_json(&issue.spec_paths)?,
        encode_json(&issue.question_ids)?,
        encode_dt(issue.created_at),
      ));
    }

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO issues (
               issue_id, project_id, snapshot_id, kind, severity, message,
               spec_paths, question_ids, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          )?;
          for row in &rows {
            stmt.execute(rusqlite::params![
              row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn list_issues(&self, snapshot_id: Uuid) -> Result<Vec<Issue>> {
    let id_str = encode_uuid(snapshot_id);

    let raws: Vec<RawIssue> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ISSUE_COLUMNS} FROM issues
           WHERE snapshot_id = ?1
           ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawIssue::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIssue::into_issue).collect()
  }
}
