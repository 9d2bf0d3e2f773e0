//! Runtime configuration, read from `alertline.toml` and `ALERTLINE_*`
//! environment variables. Every key has a default.

use std::path::PathBuf;

use serde::Deserialize;

/// Uploads are read in full before the first form field is looked at.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                    String,
  pub port:                    u16,
  /// SQLite file path, or `:memory:`.
  pub database_url:            String,
  /// Base URL of a REST mirror. Absent means an in-process mirror.
  pub mirror_url:              Option<String>,
  /// JSON file holding `{"auth_token": "..."}` for the REST mirror.
  pub mirror_credentials_path: Option<PathBuf>,
  /// Directory holding `<domain>_risk_model.json` artifacts.
  pub models_dir:              PathBuf,
  pub allowed_origins:         Vec<String>,
  pub max_upload_bytes:        usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                    "127.0.0.1".to_string(),
      port:                    8000,
      database_url:            "alertline.db".to_string(),
      mirror_url:              None,
      mirror_credentials_path: None,
      models_dir:              PathBuf::from("models"),
      allowed_origins:         vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
      ],
      max_upload_bytes:        DEFAULT_MAX_UPLOAD_BYTES,
    }
  }
}

impl ServerConfig {
  /// Layer `file` (optional) under `ALERTLINE_*` environment variables.
  pub fn load(file: PathBuf) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(
        config::Environment::with_prefix("ALERTLINE")
          .list_separator(",")
          .with_list_parse_key("allowed_origins")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn is_in_memory(&self) -> bool { self.database_url == ":memory:" }
}
