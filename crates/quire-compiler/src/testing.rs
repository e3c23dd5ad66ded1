//! A scripted [`CompletionService`] for tests.
//!
//! Responses are queued up front and handed out in order; every request is
//! recorded so tests can assert what the stages sent.

use std::{
  collections::VecDeque,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use serde_json::Value;

use crate::completion::{Completion, CompletionError, CompletionRequest, CompletionService};

pub struct ScriptedCompletion {
  provider:  String,
  model:     String,
  responses: Mutex<VecDeque<Result<String, CompletionError>>>,
  requests:  Mutex<Vec<CompletionRequest>>,
  calls:     AtomicUsize,
}

impl ScriptedCompletion {
  pub fn new(provider: impl Into<String>) -> Self {
    Self {
      provider:  provider.into(),
      model:     "scripted-1".into(),
      responses: Mutex::new(VecDeque::new()),
      requests:  Mutex::new(Vec::new()),
      calls:     AtomicUsize::new(0),
    }
  }

  /// Queue a JSON response.
  pub fn push_json(&self, value: Value) -> &Self { self.push_text(value.to_string()) }

  /// Queue a raw text response.
  pub fn push_text(&self, text: impl Into<String>) -> &Self {
    self.lock_responses().push_back(Ok(text.into()));
    self
  }

  pub fn push_err(&self, error: CompletionError) -> &Self {
    self.lock_responses().push_back(Err(error));
    self
  }

  /// Number of `complete` calls made so far.
  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  pub fn requests(&self) -> Vec<CompletionRequest> {
    self
      .requests
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, CompletionError>>> {
    self.responses.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl CompletionService for ScriptedCompletion {
  fn provider(&self) -> &str { &self.provider }

  fn model(&self) -> &str { &self.model }

  fn complete(
    &self,
    request: CompletionRequest,
  ) -> impl Future<Output = Result<Completion, CompletionError>> + Send + '_ {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self
      .requests
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(request);
    let next = self
      .lock_responses()
      .pop_front()
      .unwrap_or_else(|| Err(CompletionError::InvalidResponse("script exhausted".into())));
    let model = self.model.clone();
    async move { next.map(|content| Completion { content, model }) }
  }
}
