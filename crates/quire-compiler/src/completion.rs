//! The completion capability every LLM-backed stage runs against.
//!
//! Stages never talk to a provider directly. They build a
//! [`CompletionRequest`] and hand it to whatever [`CompletionService`] the
//! workflow selected, which keeps the stages testable against scripted
//! responses.

use std::{future::Future, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub role:    Role,
  pub content: String,
}

impl Message {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: Role::System, content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
  pub messages:    Vec<Message>,
  pub temperature: f32,
  pub max_tokens:  u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
  pub content: String,
  /// The model that actually answered, as reported by the provider.
  pub model:   String,
}

#[derive(Debug, Error)]
pub enum CompletionError {
  #[error("rate limited by provider")]
  RateLimited { retry_after_secs: Option<u64> },

  #[error("provider error: {0}")]
  Provider(String),

  #[error("invalid provider response: {0}")]
  InvalidResponse(String),
}

/// A chat-completion backend.
pub trait CompletionService: Send + Sync {
  /// Registry name, e.g. `"openai"`.
  fn provider(&self) -> &str;

  /// Model requested from the provider.
  fn model(&self) -> &str;

  fn complete(
    &self,
    request: CompletionRequest,
  ) -> impl Future<Output = Result<Completion, CompletionError>> + Send + '_;
}

impl<T: CompletionService> CompletionService for Arc<T> {
  fn provider(&self) -> &str { (**self).provider() }

  fn model(&self) -> &str { (**self).model() }

  fn complete(
    &self,
    request: CompletionRequest,
  ) -> impl Future<Output = Result<Completion, CompletionError>> + Send + '_ {
    (**self).complete(request)
  }
}
