//! Alertline server binary.
//!
//! Reads `alertline.toml` (or the path given with `--config`), opens the
//! SQLite store, picks a live mirror, loads whatever risk models are present
//! and serves the JSON API over HTTP.

mod config;

use std::path::PathBuf;

use alertline_api::{AppState, api_router};
use alertline_mirror::{MemoryMirror, Mirror, RestMirror, read_auth_token};
use alertline_risk::RiskEngine;
use alertline_store_sqlite::SqliteStore;
use anyhow::Context as _;
use axum::{
  extract::DefaultBodyLimit,
  http::{HeaderValue, Method},
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::{
  cors::{AllowOrigin, Any, CorsLayer},
  trace::TraceLayer,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Alertline alert aggregation server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "alertline.toml")]
  config: PathBuf,
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
  let cfg = ServerConfig::load(cli.config).context("failed to read configuration")?;

  let store = open_store(&cfg).await?;
  let mirror = open_mirror(&cfg)?;
  let risk = RiskEngine::load(&cfg.models_dir);
  tracing::info!(
    mirror = mirror.backend(),
    models = ?risk.loaded_domains(),
    "backends ready"
  );

  let app = api_router(AppState::new(store, mirror, risk))
    .layer(cors_layer(&cfg.allowed_origins)?)
    .layer(DefaultBodyLimit::max(cfg.max_upload_bytes))
    .layer(TraceLayer::new_for_http());

  let address = cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  if cfg.is_in_memory() {
    tracing::warn!("using an in-memory database; alerts will not survive a restart");
    return SqliteStore::open_in_memory()
      .await
      .context("failed to open in-memory store");
  }
  SqliteStore::open(&cfg.database_url)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.database_url))
}

/// A REST mirror when `mirror_url` is set, otherwise an in-process one.
///
/// Unreadable credentials are logged and the mirror is used without a token.
fn open_mirror(cfg: &ServerConfig) -> anyhow::Result<Mirror> {
  let Some(url) = &cfg.mirror_url else {
    return Ok(Mirror::Memory(MemoryMirror::new()));
  };

  let token = match &cfg.mirror_credentials_path {
    Some(path) => read_auth_token(path).unwrap_or_else(|e| {
      tracing::warn!("continuing without mirror credentials: {e}");
      None
    }),
    None => None,
  };
  let rest = RestMirror::new(url.as_str(), token).context("failed to build mirror client")?;
  Ok(Mirror::Rest(rest))
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
  let origins = origins
    .iter()
    .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {o:?}")))
    .collect::<anyhow::Result<Vec<_>>>()?;

  Ok(
    CorsLayer::new()
      .allow_origin(AllowOrigin::list(origins))
      .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
      .allow_headers(Any),
  )
}
