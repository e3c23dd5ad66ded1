//! `SpecService`: the workflows behind the API.
//!
//! Each workflow is one sequential unit: read the ledger, run the stages,
//! write the results. Primary writes are atomic store calls. Secondary
//! writes (seeding, status updates, issue persistence) are best-effort and
//! only logged when they fail.

use std::collections::HashSet;

use quire_core::{
  answer::{self, Answer},
  bundle::{self, QaBundle},
  diff::{self, DiffResult},
  impact::{self, ImpactReport},
  issue::{Issue, IssueDraft},
  project::{NewProject, Project},
  question::{self, Question, QuestionStatus},
  snapshot::{NewSnapshot, SpecSnapshot},
  store::SpecStore,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  completion::CompletionService,
  error::{Error, Result},
  hydrate::hydrate,
  orchestrator::{CompilerSettings, Orchestrator},
  prompt::Mode,
  provider::Providers,
  seed,
  stages::{
    asker::AskInput,
    compiler::coverage_drafts,
    planner::{Plan, PlanInput},
    suggester::{AnswerSuggestion, SuggestInput},
    validator::ValidateInput,
  },
};

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuestions {
  pub plan:      Plan,
  /// Newly persisted questions, in the order the asker proposed them.
  pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
  pub snapshot: SpecSnapshot,
  pub issues:   Vec<Issue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDiff {
  pub base_snapshot_id:   Uuid,
  pub target_snapshot_id: Uuid,
  pub diff:               DiffResult,
  pub impact:             ImpactReport,
}

/// Questions of a project plus the bundles of those that are answered.
struct Ledger {
  questions: Vec<Question>,
  bundles:   Vec<QaBundle>,
}

pub struct SpecService<S, C> {
  store:        S,
  providers:    Providers<C>,
  orchestrator: Orchestrator,
}

impl<S, C> SpecService<S, C>
where
  S: SpecStore,
  C: CompletionService,
{
  pub fn new(store: S, providers: Providers<C>, settings: CompilerSettings) -> Result<Self> {
    Ok(Self { store, providers, orchestrator: Orchestrator::new(settings)? })
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn providers(&self) -> &Providers<C> { &self.providers }

  // ── Projects ──────────────────────────────────────────────────────────

  /// Create a project and seed its starter questions. Seeding is
  /// best-effort: the project exists even if it fails.
  pub async fn create_project(&self, input: NewProject) -> Result<Project> {
    input.validate()?;
    let project = self.store.create_project(input).await.map_err(Error::store)?;
    info!(project_id = %project.project_id, name = %project.name, "created project");

    match self
      .store
      .create_questions(seed::starter_questions(project.project_id))
      .await
    {
      Ok(seeded) => debug!(project_id = %project.project_id, count = seeded.len(), "seeded questions"),
      Err(e) => warn!(project_id = %project.project_id, error = %e, "failed to seed starter questions"),
    }
    Ok(project)
  }

  pub async fn get_project(&self, id: Uuid) -> Result<Project> {
    self
      .store
      .get_project(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ProjectNotFound(id))
  }

  pub async fn list_projects(&self) -> Result<Vec<Project>> {
    self.store.list_projects().await.map_err(Error::store)
  }

  pub async fn list_questions(&self, project_id: Uuid) -> Result<Vec<Question>> {
    self.get_project(project_id).await?;
    self.store.list_questions(project_id).await.map_err(Error::store)
  }

  pub async fn get_question(&self, id: Uuid) -> Result<Question> {
    self
      .store
      .get_question(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::QuestionNotFound(id))
  }

  // ── Answer ledger ─────────────────────────────────────────────────────

  /// Append a new answer version after checking the value fits the
  /// question. The first answer also marks the question answered.
  pub async fn submit_answer(&self, question_id: Uuid, value: Value) -> Result<Answer> {
    let question = self.get_question(question_id).await?;
    answer::validate_value(&question, &value)?;

    let answer = self
      .store
      .submit_answer(question_id, value)
      .await
      .map_err(Error::store)?;
    info!(%question_id, version = answer.version, "recorded answer");

    if question.status == QuestionStatus::Unanswered {
      if let Err(e) = self
        .store
        .set_question_status(question_id, QuestionStatus::Answered)
        .await
      {
        warn!(%question_id, error = %e, "failed to mark question answered");
      }
    }
    Ok(answer)
  }

  pub async fn latest_answer(&self, question_id: Uuid) -> Result<Option<Answer>> {
    self.get_question(question_id).await?;
    self.store.latest_answer(question_id).await.map_err(Error::store)
  }

  pub async fn answer_history(&self, question_id: Uuid) -> Result<Vec<Answer>> {
    self.get_question(question_id).await?;
    self.store.answer_history(question_id).await.map_err(Error::store)
  }

  async fn ledger(&self, project_id: Uuid) -> Result<Ledger> {
    let questions = self.store.list_questions(project_id).await.map_err(Error::store)?;
    let latest = self
      .store
      .latest_answers_for_project(project_id)
      .await
      .map_err(Error::store)?;
    let bundles = bundle::materialize(&questions, &latest);
    Ok(Ledger { questions, bundles })
  }

  // ── Workflows ─────────────────────────────────────────────────────────

  /// Planner → Asker. Proposed questions that fail validation or repeat an
  /// existing question's text are dropped; the rest are stored in one batch.
  pub async fn generate_questions(
    &self,
    project_id: Uuid,
    mode: Mode,
    provider: Option<&str>,
  ) -> Result<GeneratedQuestions> {
    let project = self.get_project(project_id).await?;
    let service = self.providers.select(provider)?;
    let ledger = self.ledger(project_id).await?;
    let latest = self.latest_snapshot(project_id).await?;
    let issues = match &latest {
      Some(s) => self.store.list_issues(s.snapshot_id).await.map_err(Error::store)?,
      None => Vec::new(),
    };
    let current_spec = current_spec(latest.as_ref());

    let plan = self
      .orchestrator
      .plan(service, PlanInput {
        project:      &project,
        current_spec: &current_spec,
        issues:       &issues,
        questions:    &ledger.questions,
        answers:      &ledger.bundles,
        mode,
      })
      .await?;
    if plan.suggestions.is_empty() {
      info!(%project_id, "planner found nothing to ask");
      return Ok(GeneratedQuestions { plan, questions: Vec::new() });
    }

    let proposed = self
      .orchestrator
      .ask(service, AskInput {
        project:      &project,
        intents:      &plan.suggestions,
        current_spec: &current_spec,
        questions:    &ledger.questions,
        answers:      &ledger.bundles,
        mode,
      })
      .await?;

    let mut seen: HashSet<String> = ledger
      .questions
      .iter()
      .map(|q| question::normalized_text(&q.text))
      .collect();
    let mut inputs = Vec::with_capacity(proposed.len());
    for p in proposed {
      let input = match p.into_new_question(project_id).normalize() {
        Ok(input) => input,
        Err(e) => {
          warn!(%project_id, error = %e, "dropping invalid proposed question");
          continue;
        }
      };
      if !seen.insert(question::normalized_text(&input.text)) {
        debug!(%project_id, text = %input.text, "dropping duplicate proposed question");
        continue;
      }
      inputs.push(input);
    }

    let questions = if inputs.is_empty() {
      Vec::new()
    } else {
      self.store.create_questions(inputs).await.map_err(Error::store)?
    };
    info!(%project_id, count = questions.len(), "generated questions");
    Ok(GeneratedQuestions { plan, questions })
  }

  pub async fn suggest_answers(
    &self,
    project_id: Uuid,
    mode: Mode,
    provider: Option<&str>,
  ) -> Result<Vec<AnswerSuggestion>> {
    let project = self.get_project(project_id).await?;
    let service = self.providers.select(provider)?;
    let ledger = self.ledger(project_id).await?;

    let answered: HashSet<Uuid> = ledger.bundles.iter().map(|b| b.question_id).collect();
    let unanswered: Vec<Question> = ledger
      .questions
      .iter()
      .filter(|q| q.status == QuestionStatus::Unanswered && !answered.contains(&q.question_id))
      .cloned()
      .collect();
    let latest = self.latest_snapshot(project_id).await?;
    let current_spec = current_spec(latest.as_ref());

    self
      .orchestrator
      .suggest(service, SuggestInput {
        project:      &project,
        unanswered:   &unanswered,
        answers:      &ledger.bundles,
        current_spec: &current_spec,
        mode,
      })
      .await
  }

  /// Compile the project's latest answers into a new snapshot.
  ///
  /// The snapshot is recorded as soon as compilation succeeds. Issues come
  /// from the schema check, the trace-coverage check and the validator
  /// stage; a failing validator contributes nothing, and failing to persist
  /// issues does not undo the snapshot.
  pub async fn compile_project(
    &self,
    project_id: Uuid,
    provider: Option<&str>,
  ) -> Result<CompileReport> {
    let project = self.get_project(project_id).await?;
    let ledger = self.ledger(project_id).await?;
    if ledger.bundles.is_empty() {
      return Err(Error::NoAnswers(project_id));
    }
    let service = self.providers.select(provider)?;
    let previous = self.latest_snapshot(project_id).await?;

    let compilation = self
      .orchestrator
      .compile(
        service,
        &project,
        &ledger.bundles,
        previous.as_ref().map(|s| &s.spec),
      )
      .await?;

    let snapshot = self
      .store
      .record_snapshot(NewSnapshot {
        project_id,
        spec: compilation.spec,
        trace: compilation.trace,
        derived_from: compilation.derived_from,
        compiler: compilation.compiler,
      })
      .await
      .map_err(Error::store)?;
    info!(
      %project_id,
      snapshot_id = %snapshot.snapshot_id,
      model = %snapshot.compiler.model,
      "recorded snapshot"
    );

    let drafts = self
      .review(service, &project, &snapshot, &ledger.bundles)
      .await;
    let known: HashSet<Uuid> = ledger.questions.iter().map(|q| q.question_id).collect();
    let issues = hydrate(drafts, project_id, snapshot.snapshot_id, &known);

    if let Err(e) = self.store.record_issues(issues.clone()).await {
      warn!(snapshot_id = %snapshot.snapshot_id, error = %e, "failed to persist issues");
    }
    Ok(CompileReport { snapshot, issues })
  }

  /// Every issue draft for a freshly compiled snapshot.
  async fn review(
    &self,
    service: &C,
    project: &Project,
    snapshot: &SpecSnapshot,
    bundles: &[QaBundle],
  ) -> Vec<IssueDraft> {
    let mut drafts = self.orchestrator.check_schema(&snapshot.spec).into_drafts();
    drafts.extend(coverage_drafts(&snapshot.spec, &snapshot.trace));

    match self
      .orchestrator
      .validate(service, ValidateInput { project, spec: &snapshot.spec, bundles })
      .await
    {
      Ok(found) => drafts.extend(found),
      Err(e) => warn!(snapshot_id = %snapshot.snapshot_id, error = %e, "validator failed; continuing without its issues"),
    }
    drafts
  }

  // ── Snapshots ─────────────────────────────────────────────────────────

  pub async fn get_snapshot(&self, id: Uuid) -> Result<SpecSnapshot> {
    self
      .store
      .get_snapshot(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::SnapshotNotFound(id))
  }

  pub async fn list_snapshots(&self, project_id: Uuid) -> Result<Vec<SpecSnapshot>> {
    self.get_project(project_id).await?;
    self.store.list_snapshots(project_id).await.map_err(Error::store)
  }

  pub async fn latest_snapshot(&self, project_id: Uuid) -> Result<Option<SpecSnapshot>> {
    let Some(id) = self
      .store
      .latest_snapshot_id(project_id)
      .await
      .map_err(Error::store)?
    else {
      return Ok(None);
    };
    self.store.get_snapshot(id).await.map_err(Error::store)
  }

  pub async fn list_issues(&self, snapshot_id: Uuid) -> Result<Vec<Issue>> {
    self.get_snapshot(snapshot_id).await?;
    self.store.list_issues(snapshot_id).await.map_err(Error::store)
  }

  /// Structural diff and impact between two snapshots of `project_id`.
  pub async fn diff_snapshots(
    &self,
    project_id: Uuid,
    base_id: Uuid,
    target_id: Uuid,
  ) -> Result<SnapshotDiff> {
    self.get_project(project_id).await?;
    let base = self.get_snapshot(base_id).await?;
    let target = self.get_snapshot(target_id).await?;
    if base.project_id != project_id || target.project_id != project_id {
      return Err(Error::InvalidInput(format!(
        "snapshots {base_id} and {target_id} do not both belong to project {project_id}"
      )));
    }

    let diff = diff::diff(&base.spec, &target.spec);
    let impact = impact::analyze_impact(&diff);
    Ok(SnapshotDiff {
      base_snapshot_id: base_id,
      target_snapshot_id: target_id,
      diff,
      impact,
    })
  }
}

fn current_spec(snapshot: Option<&SpecSnapshot>) -> Value {
  snapshot
    .map(|s| s.spec.clone())
    .unwrap_or_else(|| Value::Object(Default::default()))
}
