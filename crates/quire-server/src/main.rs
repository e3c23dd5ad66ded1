//! quire server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, registers the configured completion providers,
//! and serves the JSON API under `/api`.

mod settings;

use std::sync::Arc;

use anyhow::{Context as _, bail};
use axum::Router;
use clap::Parser;
use quire_compiler::{
  SpecService,
  provider::{HttpCompletionClient, Providers},
};
use quire_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Quire specification compiler server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;

  let providers = build_providers(&server_cfg)?;
  tracing::info!(
    default = providers.default_name(),
    available = ?providers.names().collect::<Vec<_>>(),
    "registered completion providers"
  );

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let service = SpecService::new(store, providers, server_cfg.compiler)
    .context("failed to initialise compiler")?;

  let app = Router::new()
    .nest("/api", quire_api::api_router(Arc::new(service)))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

fn build_providers(cfg: &ServerConfig) -> anyhow::Result<Providers<HttpCompletionClient>> {
  let mut configs = cfg.providers.iter();
  let Some(first) = configs.next() else {
    bail!("no completion providers configured; add a [[providers]] entry");
  };

  let client = |p: &quire_compiler::provider::ProviderConfig| {
    HttpCompletionClient::new(p.clone())
      .with_context(|| format!("failed to build provider {:?}", p.name))
  };
  let mut providers = Providers::new(client(first)?);
  for p in configs {
    providers = providers.with(client(p)?);
  }
  if let Some(name) = &cfg.default_provider {
    providers.set_default(name)?;
  }
  Ok(providers)
}
