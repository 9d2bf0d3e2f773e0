//! Error type for `alertline-risk`.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::RiskDomain;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot read model artifact {}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed model artifact {}: {source}", path.display())]
  Json {
    path:   PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("{domain} model expects features {expected:?}, artifact has {found:?}")]
  SchemaMismatch {
    domain:   RiskDomain,
    expected: Vec<&'static str>,
    found:    Vec<String>,
  },

  #[error("{domain} model artifact: {message}")]
  Shape { domain: RiskDomain, message: String },

  #[error("unknown risk domain: {0:?}")]
  UnknownDomain(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
