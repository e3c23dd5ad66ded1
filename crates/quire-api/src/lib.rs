//! JSON REST API for Quire.
//!
//! Exposes an axum [`Router`] backed by a [`SpecService`] over any
//! [`SpecStore`] and [`CompletionService`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", quire_api::api_router(service.clone()))
//! ```

pub mod answers;
pub mod error;
pub mod projects;
pub mod snapshots;
pub mod workflows;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use quire_compiler::{CompletionService, SpecService};
use quire_core::store::SpecStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(service: Arc<SpecService<S, C>>) -> Router<()>
where
  S: SpecStore + 'static,
  C: CompletionService + 'static,
{
  Router::new()
    // Projects
    .route("/projects", get(projects::list::<S, C>).post(projects::create::<S, C>))
    .route("/projects/{id}", get(projects::get_one::<S, C>))
    .route("/projects/{id}/questions", get(projects::questions::<S, C>))
    // Workflows
    .route("/projects/{id}/questions/generate", post(workflows::generate::<S, C>))
    .route("/projects/{id}/suggestions", post(workflows::suggest::<S, C>))
    .route("/projects/{id}/compile", post(workflows::compile::<S, C>))
    // Snapshots
    .route("/projects/{id}/snapshots", get(snapshots::list::<S, C>))
    .route("/projects/{id}/snapshots/latest", get(snapshots::latest::<S, C>))
    .route("/projects/{id}/diff", get(snapshots::diff::<S, C>))
    .route("/snapshots/{id}", get(snapshots::get_one::<S, C>))
    .route("/snapshots/{id}/issues", get(snapshots::issues::<S, C>))
    // Answer ledger
    .route(
      "/questions/{id}/answers",
      get(answers::history::<S, C>).post(answers::submit::<S, C>),
    )
    .route("/questions/{id}/answers/latest", get(answers::latest::<S, C>))
    .with_state(service)
}
