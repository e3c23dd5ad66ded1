//! Server configuration, layered from `config.toml` and `QUIRE__*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use quire_compiler::{CompilerSettings, provider::ProviderConfig};
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  /// Provider used when a request does not name one. Defaults to the first
  /// entry in `providers`.
  pub default_provider: Option<String>,
  #[serde(default)]
  pub providers:        Vec<ProviderConfig>,
  #[serde(default)]
  pub compiler:         CompilerSettings,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8420 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/quire/quire.db") }

impl ServerConfig {
  /// Read `path` (optional) and overlay the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("QUIRE")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
