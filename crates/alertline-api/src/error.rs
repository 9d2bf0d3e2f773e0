//! API error type and [`axum::response::IntoResponse`] implementation.

use alertline_core::Error as CoreError;
use axum::{
  Json,
  extract::multipart::MultipartError,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("malformed upload: {0}")]
  Multipart(#[from] MultipartError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("mirror error: {0}")]
  Mirror(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  /// Classify a store failure through the shared core taxonomy.
  pub fn store(e: impl Into<CoreError>) -> Self { Self::from(e.into()) }

  pub fn mirror(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Mirror(Box::new(e))
  }
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    if e.is_not_found() {
      return Self::NotFound(e.to_string());
    }
    if e.is_conflict() {
      return Self::Conflict(e.to_string());
    }
    match e {
      CoreError::Validation(m) => Self::BadRequest(m),
      CoreError::UnknownUser(id) => {
        Self::BadRequest(format!("unknown user referenced: {id}"))
      }
      other => Self::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Multipart(e) => (e.status(), e.body_text()),
      ApiError::Store(e) | ApiError::Mirror(e) => {
        tracing::error!("{self}");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
      ApiError::Internal(m) => {
        tracing::error!("{self}");
        (StatusCode::INTERNAL_SERVER_ERROR, m.clone())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
