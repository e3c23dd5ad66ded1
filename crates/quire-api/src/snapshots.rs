//! Read-only snapshot endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/projects/{id}/snapshots` | Newest first |
//! | `GET`  | `/projects/{id}/snapshots/latest` | 404 if never compiled |
//! | `GET`  | `/projects/{id}/diff?base=<id>&target=<id>` | Diff + impact; both snapshots must belong to the project |
//! | `GET`  | `/snapshots/{id}` | Document, trace, provenance |
//! | `GET`  | `/snapshots/{id}/issues` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use quire_compiler::{CompletionService, SpecService, service::SnapshotDiff};
use quire_core::{issue::Issue, snapshot::SpecSnapshot, store::SpecStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /projects/{id}/snapshots`
pub async fn list<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<SpecSnapshot>>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  Ok(Json(service.list_snapshots(project_id).await?))
}

/// `GET /projects/{id}/snapshots/latest`
pub async fn latest<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(project_id): Path<Uuid>,
) -> Result<Json<SpecSnapshot>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  service.get_project(project_id).await?;
  service
    .latest_snapshot(project_id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("project {project_id} has no snapshots")))
}

/// `GET /snapshots/{id}`
pub async fn get_one<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SpecSnapshot>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  Ok(Json(service.get_snapshot(id).await?))
}

/// `GET /snapshots/{id}/issues`
pub async fn issues<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Issue>>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  Ok(Json(service.list_issues(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct DiffParams {
  pub base:   Uuid,
  pub target: Uuid,
}

/// `GET /projects/{id}/diff?base=<id>&target=<id>`
pub async fn diff<S, C>(
  State(service): State<Arc<SpecService<S, C>>>,
  Path(project_id): Path<Uuid>,
  Query(params): Query<DiffParams>,
) -> Result<Json<SnapshotDiff>, ApiError>
where
  S: SpecStore,
  C: CompletionService,
{
  Ok(Json(
    service
      .diff_snapshots(project_id, params.base, params.target)
      .await?,
  ))
}
