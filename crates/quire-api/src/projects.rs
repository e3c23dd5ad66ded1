//! Handlers for `/projects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/projects` | |
//! | `POST` | `/projects` | Body: `{"name":"…","description":"…"}`; seeds starter questions |
//! | `GET`  | `/projects/{id}` | 404 if not found |
//! | `GET`  | `/projects/{id}/questions` | Ordered by priority |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use quire_compiler::{CompletionService, SpecService};
use quire_core::{
  project::{NewProject, Project},
  question::Question,
  store::SpecStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /projects`
pub async fn list<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
) -> Result<Json<Vec<Project>>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  Ok(Json(service.list_projects().await?))
}

/// `POST /projects`
pub async fn create<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Json(body): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  let project = service.create_project(body).await?;
  Ok((StatusCode::CREATED, Json(project)))
}

/// `GET /projects/{id}`
pub async fn get_one<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Project>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  Ok(Json(service.get_project(id).await?))
}

/// `GET /projects/{id}/questions`
pub async fn questions<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Question>>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  Ok(Json(service.list_questions(id).await?))
}
