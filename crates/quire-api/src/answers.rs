//! Handlers for `/questions/{id}/answers`: the answer ledger.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/questions/{id}/answers` | Body: `{"value": <json>}`; appends a new version |
//! | `GET`  | `/questions/{id}/answers` | Every version, oldest first |
//! | `GET`  | `/questions/{id}/answers/latest` | 404 if unanswered |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use quire_compiler::{CompletionService, SpecService};
use quire_core::{answer::Answer, store::SpecStore};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub value: Value,
}

/// `POST /questions/{id}/answers`
pub async fn submit<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(question_id): Path<Uuid>,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  let answer = service.submit_answer(question_id, body.value).await?;
  Ok((StatusCode::CREATED, Json(answer)))
}

/// `GET /questions/{id}/answers`
pub async fn history<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(question_id): Path<Uuid>,
) -> Result<Json<Vec<Answer>>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  Ok(Json(service.answer_history(question_id).await?))
}

/// `GET /questions/{id}/answers/latest`
pub async fn latest<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(question_id): Path<Uuid>,
) -> Result<Json<Answer>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  service
    .latest_answer(question_id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("question {question_id} has no answer yet")))
}
