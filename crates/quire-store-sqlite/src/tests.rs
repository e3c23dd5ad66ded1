//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use quire_core::{
  issue::{Issue, IssueKind, Severity},
  project::{NewProject, Project},
  question::{NewQuestion, Question, QuestionKind, QuestionStatus},
  snapshot::{CompilerMeta, NewSnapshot},
  store::SpecStore,
  trace::{Trace, TraceEntry},
};
use serde_json::json;
use uuid::Uuid;

use crate::{SqliteStore, store::is_constraint_violation};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn project(s: &SqliteStore) -> Project {
  s.create_project(NewProject::new("Demo")).await.unwrap()
}

async fn freeform(s: &SqliteStore, project_id: Uuid, text: &str) -> Question {
  s.create_questions(vec![NewQuestion::new(project_id, text, QuestionKind::Freeform)])
    .await
    .unwrap()
    .remove(0)
}

fn meta() -> CompilerMeta {
  CompilerMeta {
    provider:       "scripted".into(),
    model:          "test-model".into(),
    prompt_version: "compiler/v1".into(),
    prompt_digest:  "abc".into(),
    temperature:    0.0,
  }
}

fn new_snapshot(project_id: Uuid, spec: serde_json::Value) -> NewSnapshot {
  NewSnapshot {
    project_id,
    spec,
    trace: Trace::new(),
    derived_from: BTreeMap::new(),
    compiler: meta(),
  }
}

// ─── Projects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_project() {
  let s = store().await;
  let mut input = NewProject::new("Atlas");
  input.description = Some("mapping tool".into());
  let created = s.create_project(input).await.unwrap();

  let fetched = s.get_project(created.project_id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
  assert_eq!(s.list_projects().await.unwrap().len(), 1);
}

#[tokio::test]
async fn blank_project_name_is_rejected() {
  let s = store().await;
  let err = s.create_project(NewProject::new("  ")).await.unwrap_err();
  assert!(matches!(err, crate::Error::Core(quire_core::Error::InvalidInput(_))));
}

#[tokio::test]
async fn get_project_missing_returns_none() {
  let s = store().await;
  assert!(s.get_project(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Questions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn questions_round_trip_all_fields() {
  let s = store().await;
  let p = project(&s).await;

  let mut input = NewQuestion::new(p.project_id, "Which platforms?", QuestionKind::Multi)
    .with_options(["web", "ios"]);
  input.tags = vec!["scope".into()];
  input.priority = 2;
  input.spec_paths = vec!["/product/platforms".into()];

  let created = s.create_questions(vec![input]).await.unwrap().remove(0);
  let fetched = s.get_question(created.question_id).await.unwrap().unwrap();

  assert_eq!(fetched, created);
  assert_eq!(fetched.status, QuestionStatus::Unanswered);
  assert_eq!(fetched.options, Some(vec!["web".to_string(), "ios".to_string()]));
}

#[tokio::test]
async fn list_questions_orders_by_priority() {
  let s = store().await;
  let p = project(&s).await;

  let mut low = NewQuestion::new(p.project_id, "later", QuestionKind::Freeform);
  low.priority = 5;
  let mut high = NewQuestion::new(p.project_id, "first", QuestionKind::Freeform);
  high.priority = 1;
  s.create_questions(vec![low, high]).await.unwrap();

  let texts: Vec<_> = s
    .list_questions(p.project_id)
    .await
    .unwrap()
    .into_iter()
    .map(|q| q.text)
    .collect();
  assert_eq!(texts, vec!["first", "later"]);
}

#[tokio::test]
async fn question_batch_is_all_or_nothing() {
  let s = store().await;
  let p = project(&s).await;

  let good = NewQuestion::new(p.project_id, "fine", QuestionKind::Freeform);
  let orphan = NewQuestion::new(Uuid::new_v4(), "orphan", QuestionKind::Freeform);
  let err = s.create_questions(vec![good, orphan]).await.unwrap_err();
  assert!(matches!(err, crate::Error::ProjectNotFound(_)));

  assert!(s.list_questions(p.project_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_question_in_batch_writes_nothing() {
  let s = store().await;
  let p = project(&s).await;

  let good = NewQuestion::new(p.project_id, "fine", QuestionKind::Freeform);
  let bad = NewQuestion::new(p.project_id, "choose", QuestionKind::Single);
  assert!(s.create_questions(vec![good, bad]).await.is_err());
  assert!(s.list_questions(p.project_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn set_status_updates_only_status() {
  let s = store().await;
  let p = project(&s).await;
  let q = freeform(&s, p.project_id, "why?").await;

  s.set_question_status(q.question_id, QuestionStatus::Answered)
    .await
    .unwrap();
  let fetched = s.get_question(q.question_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, QuestionStatus::Answered);
  assert_eq!(fetched.text, q.text);

  let err = s
    .set_question_status(Uuid::new_v4(), QuestionStatus::Skipped)
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

// ─── Answer ledger ───────────────────────────────────────────────────────────

#[tokio::test]
async fn versions_increase_without_gaps_and_link_back() {
  let s = store().await;
  let p = project(&s).await;
  let q = freeform(&s, p.project_id, "name?").await;

  let mut previous: Option<Uuid> = None;
  for expected in 1..=4u32 {
    let a = s.submit_answer(q.question_id, json!(expected)).await.unwrap();
    assert_eq!(a.version, expected);
    assert_eq!(a.supersedes, previous);
    assert_eq!(a.project_id, p.project_id);
    previous = Some(a.answer_id);
  }

  let history = s.answer_history(q.question_id).await.unwrap();
  let versions: Vec<_> = history.iter().map(|a| a.version).collect();
  assert_eq!(versions, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn latest_answer_is_the_second_submission() {
  let s = store().await;
  let p = project(&s).await;
  let q = freeform(&s, p.project_id, "colour?").await;

  s.submit_answer(q.question_id, json!("red")).await.unwrap();
  s.submit_answer(q.question_id, json!("blue")).await.unwrap();

  let latest = s.latest_answer(q.question_id).await.unwrap().unwrap();
  assert_eq!(latest.version, 2);
  assert_eq!(latest.value, json!("blue"));
}

#[tokio::test]
async fn submit_to_unknown_question_is_not_found() {
  let s = store().await;
  let err = s.submit_answer(Uuid::new_v4(), json!(1)).await.unwrap_err();
  assert!(matches!(err, crate::Error::QuestionNotFound(_)));
}

#[tokio::test]
async fn concurrent_submissions_get_distinct_versions() {
  let s = store().await;
  let p = project(&s).await;
  let q = freeform(&s, p.project_id, "race?").await;

  let mut handles = Vec::new();
  for i in 0..8 {
    let s = s.clone();
    let id = q.question_id;
    handles.push(tokio::spawn(async move { s.submit_answer(id, json!(i)).await }));
  }
  for h in handles {
    h.await.unwrap().unwrap();
  }

  let mut versions: Vec<_> = s
    .answer_history(q.question_id)
    .await
    .unwrap()
    .into_iter()
    .map(|a| a.version)
    .collect();
  versions.sort();
  assert_eq!(versions, (1..=8).collect::<Vec<u32>>());
}

#[tokio::test]
async fn separate_handles_on_one_file_get_distinct_versions() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("quire.db");
  let a = SqliteStore::open(&path).await.unwrap();
  let b = SqliteStore::open(&path).await.unwrap();
  let p = project(&a).await;
  let q = freeform(&a, p.project_id, "shared file?").await;

  let mut handles = Vec::new();
  for i in 0..10 {
    let s = if i % 2 == 0 { a.clone() } else { b.clone() };
    let id = q.question_id;
    handles.push(tokio::spawn(async move { s.submit_answer(id, json!(i)).await }));
  }
  for h in handles {
    h.await.unwrap().unwrap();
  }

  let history = b.answer_history(q.question_id).await.unwrap();
  let mut versions: Vec<_> = history.iter().map(|a| a.version).collect();
  versions.sort();
  assert_eq!(versions, (1..=10).collect::<Vec<u32>>());
  for pair in history.windows(2) {
    assert_eq!(pair[1].supersedes, Some(pair[0].answer_id));
  }
}

#[tokio::test]
async fn constraint_violations_are_recognised() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let err = conn
    .call(|conn| {
      conn.execute_batch(
        "CREATE TABLE t (x INTEGER UNIQUE);
         INSERT INTO t (x) VALUES (1);
         INSERT INTO t (x) VALUES (1);",
      )?;
      Ok(())
    })
    .await
    .unwrap_err();
  assert!(is_constraint_violation(&err));

  let err = conn
    .call(|conn| {
      conn.execute_batch("SELECT * FROM missing_table;")?;
      Ok(())
    })
    .await
    .unwrap_err();
  assert!(!is_constraint_violation(&err));
}

#[tokio::test]
async fn latest_answers_for_project_one_per_question() {
  let s = store().await;
  let p = project(&s).await;
  let other = project(&s).await;
  let q1 = freeform(&s, p.project_id, "one").await;
  let q2 = freeform(&s, p.project_id, "two").await;
  let q3 = freeform(&s, p.project_id, "unanswered").await;
  let foreign = freeform(&s, other.project_id, "elsewhere").await;

  s.submit_answer(q1.question_id, json!("a")).await.unwrap();
  s.submit_answer(q1.question_id, json!("b")).await.unwrap();
  s.submit_answer(q2.question_id, json!("c")).await.unwrap();
  s.submit_answer(foreign.question_id, json!("x")).await.unwrap();

  let latest = s.latest_answers_for_project(p.project_id).await.unwrap();
  assert_eq!(latest.len(), 2);
  let by_q: BTreeMap<_, _> = latest.iter().map(|a| (a.question_id, a)).collect();
  assert_eq!(by_q[&q1.question_id].version, 2);
  assert_eq!(by_q[&q1.question_id].value, json!("b"));
  assert_eq!(by_q[&q2.question_id].version, 1);
  assert!(!by_q.contains_key(&q3.question_id));
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_round_trip_preserves_provenance() {
  let s = store().await;
  let p = project(&s).await;
  let q = freeform(&s, p.project_id, "name?").await;
  let a = s.submit_answer(q.question_id, json!("Atlas")).await.unwrap();

  let mut trace = Trace::new();
  trace.insert("/product/name", TraceEntry {
    question_id:    q.question_id,
    answer_id:      a.answer_id,
    answer_version: a.version,
  });
  let mut input = new_snapshot(p.project_id, json!({ "product": { "name": "Atlas" } }));
  input.trace = trace;
  input.derived_from = BTreeMap::from([(q.question_id, 1)]);

  let created = s.record_snapshot(input).await.unwrap();
  let fetched = s.get_snapshot(created.snapshot_id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
  assert_eq!(fetched.derived_from[&q.question_id], 1);
  assert_eq!(fetched.compiler.temperature, 0.0);
}

#[tokio::test]
async fn compiling_again_appends_a_new_snapshot() {
  let s = store().await;
  let p = project(&s).await;

  let first = s.record_snapshot(new_snapshot(p.project_id, json!({ "v": 1 }))).await.unwrap();
  let second = s.record_snapshot(new_snapshot(p.project_id, json!({ "v": 2 }))).await.unwrap();
  assert_ne!(first.snapshot_id, second.snapshot_id);

  let all = s.list_snapshots(p.project_id).await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].snapshot_id, second.snapshot_id);
  assert_eq!(
    s.latest_snapshot_id(p.project_id).await.unwrap(),
    Some(second.snapshot_id)
  );

  // The older snapshot is untouched.
  let old = s.get_snapshot(first.snapshot_id).await.unwrap().unwrap();
  assert_eq!(old.spec, json!({ "v": 1 }));
}

#[tokio::test]
async fn snapshot_for_unknown_project_is_rejected() {
  let s = store().await;
  let err = s
    .record_snapshot(new_snapshot(Uuid::new_v4(), json!({})))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::ProjectNotFound(_)));
}

#[tokio::test]
async fn latest_snapshot_id_none_without_snapshots() {
  let s = store().await;
  let p = project(&s).await;
  assert!(s.latest_snapshot_id(p.project_id).await.unwrap().is_none());
}

// ─── Issues ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn issues_round_trip_by_snapshot() {
  let s = store().await;
  let p = project(&s).await;
  let q = freeform(&s, p.project_id, "name?").await;
  let snap = s.record_snapshot(new_snapshot(p.project_id, json!({}))).await.unwrap();
  let other = s.record_snapshot(new_snapshot(p.project_id, json!({}))).await.unwrap();

  let issue = Issue {
    issue_id:     Uuid::new_v4(),
    project_id:   p.project_id,
    snapshot_id:  snap.snapshot_id,
    kind:         IssueKind::MissingInfo,
    severity:     Severity::Warning,
    message:      "no users described".into(),
    spec_paths:   vec!["/users".into()],
    question_ids: vec![q.question_id],
    created_at:   chrono::Utc::now(),
  };
  s.record_issues(vec![issue.clone()]).await.unwrap();

  let fetched = s.list_issues(snap.snapshot_id).await.unwrap();
  assert_eq!(fetched.len(), 1);
  assert_eq!(fetched[0].issue_id, issue.issue_id);
  assert_eq!(fetched[0].kind, IssueKind::MissingInfo);
  assert_eq!(fetched[0].severity, Severity::Warning);
  assert_eq!(fetched[0].question_ids, vec![q.question_id]);
  assert!(s.list_issues(other.snapshot_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn recording_no_issues_is_a_no_op() {
  let s = store().await;
  s.record_issues(Vec::new()).await.unwrap();
}
