//! HTTP completion providers and the registry workflows select them from.
//!
//! Two wire shapes are spoken: OpenAI-style `/chat/completions` and
//! Anthropic-style `/messages`. Anything else that speaks one of those
//! (local gateways, proxies) is configured by pointing `base_url` at it.

use std::{collections::BTreeMap, time::Duration};

use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
  completion::{Completion, CompletionError, CompletionRequest, CompletionService, Role},
  error::{Error, Result},
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
  Openai,
  Anthropic,
}

/// One `[[providers]]` entry of the server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
  pub name:     String,
  pub kind:     ProviderKind,
  pub base_url: String,
  #[serde(default)]
  pub api_key:  String,
  pub model:    String,
}

// ─── HTTP client ─────────────────────────────────────────────────────────────

/// A [`CompletionService`] backed by a provider's HTTP API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based. There is no
/// overall request timeout here; stage timeouts are enforced by the
/// orchestrator.
#[derive(Clone)]
pub struct HttpCompletionClient {
  client: Client,
  config: ProviderConfig,
}

impl HttpCompletionClient {
  pub fn new(config: ProviderConfig) -> Result<Self, CompletionError> {
    let client = Client::builder()
      .connect_timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| CompletionError::Provider(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  async fn send(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
    let builder = match self.config.kind {
      ProviderKind::Openai => self
        .client
        .post(self.url("/chat/completions"))
        .bearer_auth(&self.config.api_key)
        .json(&openai_body(&self.config.model, &request)),
      ProviderKind::Anthropic => self
        .client
        .post(self.url("/messages"))
        .header("x-api-key", &self.config.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&anthropic_body(&self.config.model, &request)),
    };

    let resp = builder
      .send()
      .await
      .map_err(|e| CompletionError::Provider(format!("request to {} failed: {e}", self.config.name)))?;

    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
      let retry_after_secs = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
      return Err(CompletionError::RateLimited { retry_after_secs });
    }
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(CompletionError::Provider(format!("{} → {status}: {body}", self.config.name)));
    }

    let body: Value = resp
      .json()
      .await
      .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;
    match self.config.kind {
      ProviderKind::Openai => parse_openai(&body),
      ProviderKind::Anthropic => parse_anthropic(&body),
    }
  }
}

impl CompletionService for HttpCompletionClient {
  fn provider(&self) -> &str { &self.config.name }

  fn model(&self) -> &str { &self.config.model }

  fn complete(
    &self,
    request: CompletionRequest,
  ) -> impl Future<Output = Result<Completion, CompletionError>> + Send + '_ {
    self.send(request)
  }
}

// ─── Wire shapes ─────────────────────────────────────────────────────────────

fn openai_body(model: &str, request: &CompletionRequest) -> Value {
  let messages: Vec<Value> = request
    .messages
    .iter()
    .map(|m| json!({ "role": m.role.to_string(), "content": m.content }))
    .collect();
  json!({
    "model": model,
    "messages": messages,
    "temperature": request.temperature,
    "max_tokens": request.max_tokens,
  })
}

/// Anthropic takes the system prompt out of band.
fn anthropic_body(model: &str, request: &CompletionRequest) -> Value {
  let system: Vec<&str> = request
    .messages
    .iter()
    .filter(|m| m.role == Role::System)
    .map(|m| m.content.as_str())
    .collect();
  let messages: Vec<Value> = request
    .messages
    .iter()
    .filter(|m| m.role != Role::System)
    .map(|m| json!({ "role": m.role.to_string(), "content": m.content }))
    .collect();
  json!({
    "model": model,
    "system": system.join("\n\n"),
    "messages": messages,
    "temperature": request.temperature,
    "max_tokens": request.max_tokens,
  })
}

fn parse_openai(body: &Value) -> Result<Completion, CompletionError> {
  let content = body
    .pointer("/choices/0/message/content")
    .and_then(Value::as_str)
    .ok_or_else(|| CompletionError::InvalidResponse("missing choices[0].message.content".into()))?;
  Ok(Completion {
    content: content.to_owned(),
    model:   reported_model(body),
  })
}

fn parse_anthropic(body: &Value) -> Result<Completion, CompletionError> {
  let blocks = body
    .get("content")
    .and_then(Value::as_array)
    .ok_or_else(|| CompletionError::InvalidResponse("missing content blocks".into()))?;
  let text: String = blocks
    .iter()
    .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
    .filter_map(|b| b.get("text").and_then(Value::as_str))
    .collect();
  if text.is_empty() {
    return Err(CompletionError::InvalidResponse("no text content blocks".into()));
  }
  Ok(Completion { content: text, model: reported_model(body) })
}

fn reported_model(body: &Value) -> String {
  body
    .get("model")
    .and_then(Value::as_str)
    .unwrap_or_default()
    .to_owned()
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Named completion services with one default.
pub struct Providers<C> {
  default: String,
  by_name: BTreeMap<String, C>,
}

impl<C: CompletionService> Providers<C> {
  /// A registry whose default is `service`.
  pub fn new(service: C) -> Self {
    let default = service.provider().to_owned();
    let mut by_name = BTreeMap::new();
    by_name.insert(default.clone(), service);
    Self { default, by_name }
  }

  /// Register another service, replacing any with the same name.
  pub fn with(mut self, service: C) -> Self {
    self.by_name.insert(service.provider().to_owned(), service);
    self
  }

  pub fn set_default(&mut self, name: &str) -> Result<()> {
    if !self.by_name.contains_key(name) {
      return Err(Error::UnknownProvider(name.to_owned()));
    }
    self.default = name.to_owned();
    Ok(())
  }

  pub fn default_name(&self) -> &str { &self.default }

  pub fn names(&self) -> impl Iterator<Item = &str> { self.by_name.keys().map(String::as_str) }

  /// The named service, or the default when `name` is `None`.
  pub fn select(&self, name: Option<&str>) -> Result<&C> {
    let name = name.unwrap_or(&self.default);
    self
      .by_name
      .get(name)
      .ok_or_else(|| Error::UnknownProvider(name.to_owned()))
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::{completion::Message, testing::ScriptedCompletion};

  fn request() -> CompletionRequest {
    CompletionRequest {
      messages:    vec![Message::system("be terse"), Message::user("hello")],
      temperature: 0.0,
      max_tokens:  64,
    }
  }

  #[test]
  fn anthropic_body_lifts_system_prompt() {
    let body = anthropic_body("m", &request());
    assert_eq!(body["system"], "be terse");
    assert_eq!(body["messages"], json!([{ "role": "user", "content": "hello" }]));
  }

  #[test]
  fn openai_body_keeps_roles_inline() {
    let body = openai_body("m", &request());
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["max_tokens"], 64);
  }

  #[test]
  fn parses_both_response_shapes() {
    let openai = json!({
      "model": "gpt-x",
      "choices": [{ "message": { "role": "assistant", "content": "{}" } }]
    });
    assert_eq!(parse_openai(&openai).unwrap().content, "{}");

    let anthropic = json!({
      "model": "claude-x",
      "content": [{ "type": "text", "text": "{\"a\":" }, { "type": "text", "text": "1}" }]
    });
    let completion = parse_anthropic(&anthropic).unwrap();
    assert_eq!(completion.content, "{\"a\":1}");
    assert_eq!(completion.model, "claude-x");
  }

  #[test]
  fn missing_content_is_invalid() {
    assert!(matches!(
      parse_openai(&json!({ "choices": [] })),
      Err(CompletionError::InvalidResponse(_))
    ));
  }

  #[test]
  fn registry_selects_default_and_named() {
    let mut providers = Providers::new(ScriptedCompletion::new("first"))
      .with(ScriptedCompletion::new("second"));
    assert_eq!(providers.select(None).unwrap().provider(), "first");
    assert_eq!(providers.select(Some("second")).unwrap().provider(), "second");

    providers.set_default("second").unwrap();
    assert_eq!(providers.default_name(), "second");
    assert!(matches!(
      providers.select(Some("nope")),
      Err(Error::UnknownProvider(n)) if n == "nope"
    ));
    assert!(providers.set_default("nope").is_err());
  }
}
