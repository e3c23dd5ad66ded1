//! LLM-backed workflows. Each runs synchronously within the request.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/projects/{id}/questions/generate` | `?mode=basic\|advanced&provider=<name>` |
//! | `POST` | `/projects/{id}/suggestions` | `?mode=basic\|advanced&provider=<name>` |
//! | `POST` | `/projects/{id}/compile` | `?provider=<name>`; 412 without answers |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use quire_compiler::{
  CompletionService,
  SpecService,
  prompt::Mode,
  service::GeneratedQuestions,
  stages::suggester::AnswerSuggestion,
};
use quire_core::store::SpecStore;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct WorkflowParams {
  #[serde(default)]
  pub mode:     Mode,
  pub provider: Option<String>,
}

/// `POST /projects/{id}/questions/generate`
pub async fn generate<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(project_id): Path<Uuid>,
  Query(params): Query<WorkflowParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  let generated: GeneratedQuestions = service
    .generate_questions(project_id, params.mode, params.provider.as_deref())
    .await?;
  Ok((StatusCode::CREATED, Json(generated)))
}

/// `POST /projects/{id}/suggestions`
pub async fn suggest<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(project_id): Path<Uuid>,
  Query(params): Query<WorkflowParams>,
) -> Result<Json<Vec<AnswerSuggestion>>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  Ok(Json(
    service
      .suggest_answers(project_id, params.mode, params.provider.as_deref())
      .await?,
  ))
}

#[derive(Debug, Default, Deserialize)]
pub struct CompileParams {
  pub provider: Option<String>,
}

/// `POST /projects/{id}/compile`
pub async fn compile<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(project_id): Path<Uuid>,
  Query(params): Query<CompileParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  let report = service
    .compile_project(project_id, params.provider.as_deref())
    .await?;
  Ok((StatusCode::CREATED, Json(report)))
}
