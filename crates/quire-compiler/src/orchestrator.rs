//! Compiler Orchestrator: runs each stage against a completion service.
//!
//! Every call is made at temperature zero with a bounded token budget and
//! wrapped in a timeout. Nothing here retries: a failed stage call is
//! surfaced with its cause and the caller decides.

use std::{collections::BTreeMap, time::Duration};

use quire_core::{
  bundle::{self, QaBundle},
  issue::IssueDraft,
  project::Project,
  snapshot::CompilerMeta,
  trace::Trace,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  completion::{Completion, CompletionRequest, CompletionService},
  error::{Error, Result, StageError},
  prompt::RenderedPrompt,
  schema::{SchemaReport, SchemaValidator},
  stages::{
    asker::{self, AskInput, ProposedQuestion},
    compiler::{self, CompileInput},
    planner::{self, Plan, PlanInput},
    suggester::{self, AnswerSuggestion, SuggestInput},
    validator::{self, ValidateInput},
  },
};

/// Sampling temperature for every stage.
pub const TEMPERATURE: f32 = 0.0;

/// Token budgets and timeouts. Compilation writes a whole document and gets
/// the larger budget of both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
  pub compile_max_tokens:   u32,
  pub stage_max_tokens:     u32,
  pub compile_timeout_secs: u64,
  pub stage_timeout_secs:   u64,
}

impl Default for CompilerSettings {
  fn default() -> Self {
    Self {
      compile_max_tokens:   16_000,
      stage_max_tokens:     4_000,
      compile_timeout_secs: 300,
      stage_timeout_secs:   90,
    }
  }
}

/// Output of a successful compile call.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
  pub spec:         Value,
  pub trace:        Trace,
  pub derived_from: BTreeMap<Uuid, u32>,
  pub compiler:     CompilerMeta,
}

pub struct Orchestrator {
  settings: CompilerSettings,
  schema:   SchemaValidator,
}

impl Orchestrator {
  pub fn new(settings: CompilerSettings) -> Result<Self> {
    Ok(Self { settings, schema: SchemaValidator::spec_document()? })
  }

  pub fn settings(&self) -> &CompilerSettings { &self.settings }

  pub async fn plan<C: CompletionService>(&self, service: &C, input: PlanInput<'_>) -> Result<Plan> {
    self
      .stage(service, planner::prompt(&input), planner::parse)
      .await
      .map_err(Error::PlannerFailed)
  }

  pub async fn ask<C: CompletionService>(
    &self,
    service: &C,
    input: AskInput<'_>,
  ) -> Result<Vec<ProposedQuestion>> {
    self
      .stage(service, asker::prompt(&input), asker::parse)
      .await
      .map_err(Error::AskerFailed)
  }

  /// Suggest answers for `input.unanswered`. With nothing unanswered this
  /// returns immediately without calling the service.
  pub async fn suggest<C: CompletionService>(
    &self,
    service: &C,
    input: SuggestInput<'_>,
  ) -> Result<Vec<AnswerSuggestion>> {
    if input.unanswered.is_empty() {
      debug!(project_id = %input.project.project_id, "no unanswered questions; skipping suggester");
      return Ok(Vec::new());
    }
    let unanswered = input.unanswered;
    self
      .stage(service, suggester::prompt(&input), |c| suggester::parse(c, unanswered))
      .await
      .map_err(Error::SuggesterFailed)
  }

  /// Compile `bundles` into a new document.
  ///
  /// `derived_from` is taken from `bundles` alone. The call is rejected
  /// with [`Error::NoAnswers`] before the service is touched when there is
  /// nothing to compile.
  pub async fn compile<C: CompletionService>(
    &self,
    service: &C,
    project: &Project,
    bundles: &[QaBundle],
    current_spec: Option<&Value>,
  ) -> Result<Compilation> {
    if bundles.is_empty() {
      return Err(Error::NoAnswers(project.project_id));
    }
    let empty = Value::Object(Default::default());
    let input = CompileInput {
      project,
      bundles,
      current_spec: current_spec.unwrap_or(&empty),
      schema: self.schema.schema(),
    };

    let prompt = compiler::prompt(&input).map_err(Error::CompilationFailed)?;
    let completion = self
      .call(
        service,
        &prompt,
        self.settings.compile_max_tokens,
        Duration::from_secs(self.settings.compile_timeout_secs),
      )
      .await
      .map_err(Error::CompilationFailed)?;
    let raw = compiler::parse(&completion.content).map_err(Error::CompilationFailed)?;

    let trace = raw.resolve_trace(bundles);
    let derived_from = bundle::derived_from(bundles);
    info!(
      project_id = %project.project_id,
      bundles = bundles.len(),
      traced_paths = trace.0.len(),
      prompt_version = %prompt.version,
      "compiled specification"
    );

    Ok(Compilation {
      spec: raw.spec,
      trace,
      derived_from,
      compiler: CompilerMeta {
        provider:       service.provider().to_owned(),
        model:          reported_or_requested(&completion, service),
        prompt_version: prompt.version,
        prompt_digest:  prompt.digest,
        temperature:    TEMPERATURE,
      },
    })
  }

  /// Advisory review; callers treat failure as "no issues".
  pub async fn validate<C: CompletionService>(
    &self,
    service: &C,
    input: ValidateInput<'_>,
  ) -> Result<Vec<IssueDraft>> {
    self
      .stage(service, validator::prompt(&input), validator::parse)
      .await
      .map_err(Error::ValidatorFailed)
  }

  pub fn check_schema(&self, document: &Value) -> SchemaReport { self.schema.validate(document) }

  /// Render → call → parse with the per-stage budget.
  async fn stage<C, T, F>(
    &self,
    service: &C,
    prompt: Result<RenderedPrompt, StageError>,
    parse: F,
  ) -> Result<T, StageError>
  where
    C: CompletionService,
    F: FnOnce(&str) -> Result<T, StageError>,
  {
    let prompt = prompt?;
    let completion = self
      .call(
        service,
        &prompt,
        self.settings.stage_max_tokens,
        Duration::from_secs(self.settings.stage_timeout_secs),
      )
      .await?;
    parse(&completion.content)
  }

  async fn call<C: CompletionService>(
    &self,
    service: &C,
    prompt: &RenderedPrompt,
    max_tokens: u32,
    timeout: Duration,
  ) -> Result<Completion, StageError> {
    debug!(
      provider = service.provider(),
      prompt_version = %prompt.version,
      prompt_digest = %prompt.digest,
      max_tokens,
      "calling completion service"
    );
    let request = CompletionRequest {
      messages: prompt.messages.clone(),
      temperature: TEMPERATURE,
      max_tokens,
    };
    match tokio::time::timeout(timeout, service.complete(request)).await {
      Ok(result) => Ok(result?),
      Err(_) => Err(StageError::Timeout(timeout)),
    }
  }
}

fn reported_or_requested<C: CompletionService>(completion: &Completion, service: &C) -> String {
  if completion.model.is_empty() {
    service.model().to_owned()
  } else {
    completion.model.clone()
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use pretty_assertions::assert_eq;
  use quire_core::question::QuestionKind;
  use serde_json::json;

  use super::*;
  use crate::{
    completion::CompletionError,
    prompt::Mode,
    testing::ScriptedCompletion,
  };

  fn project() -> Project {
    Project {
      project_id:  Uuid::new_v4(),
      name:        "Quire".into(),
      description: None,
      created_at:  Utc::now(),
    }
  }

  fn bundle(version: u32) -> QaBundle {
    QaBundle {
      question_id:    Uuid::new_v4(),
      question:       "Name?".into(),
      kind:           QuestionKind::Freeform,
      tags:           vec![],
      spec_paths:     vec![],
      answer_id:      Uuid::new_v4(),
      answer_version: version,
      value:          json!("Quire"),
    }
  }

  fn orchestrator() -> Orchestrator { Orchestrator::new(CompilerSettings::default()).unwrap() }

  #[tokio::test]
  async fn zero_bundles_fail_before_any_call() {
    let service = ScriptedCompletion::new("scripted");
    let err = orchestrator()
      .compile(&service, &project(), &[], None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::NoAnswers(_)));
    assert_eq!(service.calls(), 0);
  }

  #[tokio::test]
  async fn derived_from_ignores_what_the_model_claims() {
    let bundles = vec![bundle(2), bundle(5)];
    let service = ScriptedCompletion::new("scripted");
    service.push_json(json!({
      "spec": { "product": { "name": "Quire", "summary": "x" } },
      "trace": { "/product/name": [{ "question_id": bundles[0].question_id, "answer_version": 7 }] }
    }));

    let out = orchestrator()
      .compile(&service, &project(), &bundles, None)
      .await
      .unwrap();
    assert_eq!(
      out.derived_from,
      BTreeMap::from([(bundles[0].question_id, 2), (bundles[1].question_id, 5)])
    );
    assert_eq!(out.trace.entries("/product/name")[0].answer_version, 2);
    assert_eq!(out.compiler.temperature, 0.0);
    assert_eq!(out.compiler.provider, "scripted");
    assert_eq!(out.compiler.prompt_version, "compiler@v1");

    let requests = service.requests();
    assert_eq!(requests[0].temperature, 0.0);
    assert_eq!(requests[0].max_tokens, 16_000);
  }

  #[tokio::test]
  async fn same_inputs_render_the_same_prompt() {
    let project = project();
    let bundles = vec![bundle(1)];
    let reply = json!({ "spec": { "product": { "name": "Quire", "summary": "x" } }, "trace": {} });
    let service = ScriptedCompletion::new("scripted");
    service.push_json(reply.clone()).push_json(reply);

    let o = orchestrator();
    let first = o.compile(&service, &project, &bundles, None).await.unwrap();
    let second = o.compile(&service, &project, &bundles, None).await.unwrap();
    assert_eq!(first, second);

    let requests = service.requests();
    assert_eq!(requests[0], requests[1]);
  }

  #[tokio::test]
  async fn unparsable_reply_is_a_compilation_failure() {
    let service = ScriptedCompletion::new("scripted");
    service.push_text("I could not do that.");
    let err = orchestrator()
      .compile(&service, &project(), &[bundle(1)], None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::CompilationFailed(StageError::Parse(_))));
    assert!(err.is_retryable());
    assert_eq!(service.calls(), 1);
  }

  #[tokio::test]
  async fn provider_errors_keep_their_cause() {
    let service = ScriptedCompletion::new("scripted");
    service.push_err(CompletionError::RateLimited { retry_after_secs: Some(3) });
    let err = orchestrator()
      .plan(&service, PlanInput {
        project:      &project(),
        current_spec: &json!({}),
        issues:       &[],
        questions:    &[],
        answers:      &[],
        mode:         Mode::Basic,
      })
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      Error::PlannerFailed(StageError::Completion(CompletionError::RateLimited {
        retry_after_secs: Some(3)
      }))
    ));
  }

  #[tokio::test]
  async fn suggester_short_circuits_without_open_questions() {
    let service = ScriptedCompletion::new("scripted");
    let out = orchestrator()
      .suggest(&service, SuggestInput {
        project:      &project(),
        unanswered:   &[],
        answers:      &[],
        current_spec: &json!({}),
        mode:         Mode::Advanced,
      })
      .await
      .unwrap();
    assert!(out.is_empty());
    assert_eq!(service.calls(), 0);
  }

  struct Stalled;

  impl CompletionService for Stalled {
    fn provider(&self) -> &str { "stalled" }

    fn model(&self) -> &str { "never" }

    fn complete(
      &self,
      _request: CompletionRequest,
    ) -> impl Future<Output = Result<Completion, CompletionError>> + Send + '_ {
      std::future::pending()
    }
  }

  #[tokio::test]
  async fn slow_stages_time_out() {
    let o = Orchestrator::new(CompilerSettings { stage_timeout_secs: 0, ..Default::default() }).unwrap();
    let err = o
      .ask(&Stalled, AskInput {
        project:      &project(),
        intents:      &[],
        current_spec: &json!({}),
        questions:    &[],
        answers:      &[],
        mode:         Mode::Basic,
      })
      .await
      .unwrap_err();
    assert!(matches!(err, Error::AskerFailed(StageError::Timeout(_))));
  }
}
