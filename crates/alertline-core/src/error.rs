//! Error taxonomy shared by every Alertline backend.
//!
//! Backends keep their own error enums but convert into this one so the API
//! layer can map a failure to a status code without knowing the backend.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("alert not found: {0}")]
  AlertNotFound(i64),

  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error("location not found: {0}")]
  LocationNotFound(i64),

  #[error("mirror outbox entry not found: {0}")]
  OutboxEntryNotFound(i64),

  /// `created_by` points at a user that does not exist.
  #[error("unknown user referenced: {0}")]
  UnknownUser(i64),

  #[error("username already registered: {0}")]
  UsernameTaken(String),

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::AlertNotFound(_)
        | Self::UserNotFound(_)
        | Self::LocationNotFound(_)
        | Self::OutboxEntryNotFound(_)
    )
  }

  pub fn is_conflict(&self) -> bool {
    matches!(self, Self::UsernameTaken(_) | Self::EmailTaken(_))
  }
}

impl From<std::convert::Infallible> for Error {
  fn from(e: std::convert::Infallible) -> Self { match e {} }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
