//! Error type for `alertline-mirror`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("mirror request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("mirror returned {status} for {method} {path}")]
  Status {
    method: &'static str,
    path:   String,
    status: reqwest::StatusCode,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("cannot read mirror credentials at {}: {source}", path.display())]
  Credentials {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("mirror response was not an object: {0}")]
  UnexpectedShape(String),
}

impl From<Error> for alertline_core::Error {
  fn from(e: Error) -> Self { alertline_core::Error::Backend(Box::new(e)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
