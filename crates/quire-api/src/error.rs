//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header::RETRY_AFTER},
  response::{IntoResponse, Response},
};
use quire_compiler::{CompletionError, Error, StageError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The request is well-formed but the project is not ready for it.
  #[error("precondition failed: {0}")]
  Precondition(String),

  #[error("rate limited: {message}")]
  RateLimited { message: String, retry_after_secs: Option<u64> },

  /// A completion stage failed; repeating the request may succeed.
  #[error("upstream failure: {0}")]
  Upstream(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  fn retryable(&self) -> bool { matches!(self, Self::RateLimited { .. } | Self::Upstream(_)) }
}

impl From<Error> for ApiError {
  fn from(e: Error) -> Self {
    let message = e.to_string();
    match e {
      Error::ProjectNotFound(_) | Error::QuestionNotFound(_) | Error::SnapshotNotFound(_) => {
        Self::NotFound(message)
      }
      Error::InvalidInput(_) | Error::UnknownProvider(_) => Self::BadRequest(message),
      Error::Conflict(_) => Self::Conflict(message),
      Error::NoAnswers(_) => Self::Precondition(message),
      Error::PlannerFailed(ref cause)
      | Error::AskerFailed(ref cause)
      | Error::SuggesterFailed(ref cause)
      | Error::CompilationFailed(ref cause)
      | Error::ValidatorFailed(ref cause) => match cause {
        StageError::Completion(CompletionError::RateLimited { retry_after_secs }) => {
          Self::RateLimited { message, retry_after_secs: *retry_after_secs }
        }
        _ => Self::Upstream(message),
      },
      Error::Schema(_) | Error::Store(_) => Self::Internal(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Precondition(_) => StatusCode::PRECONDITION_FAILED,
      ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
      ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
      ApiError::Internal(e) => {
        error!(error = %e, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let body = Json(json!({ "error": self.to_string(), "retryable": self.retryable() }));
    let mut resp = (status, body).into_response();
    if let ApiError::RateLimited { retry_after_secs: Some(secs), .. } = self {
      resp.headers_mut().insert(RETRY_AFTER, HeaderValue::from(secs));
    }
    resp
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  fn status_of(e: Error) -> StatusCode { ApiError::from(e).into_response().status() }

  #[test]
  fn store_version_conflict_is_409() {
    let e = Error::store(quire_store_sqlite::Error::VersionConflict(Uuid::new_v4()));
    assert_eq!(status_of(e), StatusCode::CONFLICT);
  }

  #[test]
  fn store_missing_rows_are_404() {
    let id = Uuid::new_v4();
    let e = Error::store(quire_store_sqlite::Error::QuestionNotFound(id));
    assert_eq!(status_of(e), StatusCode::NOT_FOUND);
    let e = Error::store(quire_store_sqlite::Error::ProjectNotFound(id));
    assert_eq!(status_of(e), StatusCode::NOT_FOUND);
  }

  #[test]
  fn other_store_failures_are_500() {
    let e = Error::store(quire_store_sqlite::Error::Decode("bad".into()));
    assert_eq!(status_of(e), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
