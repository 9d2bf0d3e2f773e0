//! Handlers for `/alerts` endpoints (the durable store).
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/alerts` | `?skip=&limit=`, newest first |
//! | `GET`    | `/alerts/active` | Every alert with `is_active` |
//! | `POST`   | `/alerts` | Body: [`NewAlert`]; 201 |
//! | `GET`    | `/alerts/{id}` | 404 if not found |
//! | `PUT`    | `/alerts/{id}` | Body: [`AlertPatch`] |
//! | `DELETE` | `/alerts/{id}` | 404 if not found |

use alertline_core::{
  alert::{Alert, AlertPatch, NewAlert},
  mirror::AlertMirror,
  store::{AlertQuery, AlertStore},
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

/// Page size when the caller gives none.
pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct PageParams {
  #[serde(default)]
  pub skip:  usize,
  #[serde(default = "default_limit")]
  pub limit: usize,
}

pub(crate) fn default_limit() -> usize { DEFAULT_LIMIT }

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /alerts[?skip=&limit=]`
pub async fn list<S, M>(
  State(state): State<AppState<S, M>>,
  Query(params): Query<PageParams>,
) -> Result<Json<Vec<Alert>>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let query = AlertQuery {
    offset: Some(params.skip),
    limit: Some(params.limit),
    ..Default::default()
  };
  let page = state.store.list_alerts(&query).await.map_err(ApiError::store)?;
  Ok(Json(page.alerts))
}

/// `GET /alerts/active`
pub async fn active<S, M>(
  State(state): State<AppState<S, M>>,
) -> Result<Json<Vec<Alert>>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let query = AlertQuery { is_active: Some(true), ..Default::default() };
  let page = state.store.list_alerts(&query).await.map_err(ApiError::store)?;
  Ok(Json(page.alerts))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /alerts`
pub async fn create<S, M>(
  State(state): State<AppState<S, M>>,
  Json(body): Json<NewAlert>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  if body.alert_type.trim().is_empty() || body.title.trim().is_empty() {
    return Err(ApiError::BadRequest("alert_type and title must not be blank".into()));
  }
  let alert = state.store.create_alert(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(alert)))
}

// ─── Single alert ────────────────────────────────────────────────────────────

/// `GET /alerts/{id}`
pub async fn get_one<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Json<Alert>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let alert = state
    .store
    .get_alert(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("alert {id} not found")))?;
  Ok(Json(alert))
}

/// `PUT /alerts/{id}`: status and `is_active` move together.
pub async fn update<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<i64>,
  Json(patch): Json<AlertPatch>,
) -> Result<Json<Alert>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let alert = state.store.update_alert(id, patch).await.map_err(ApiError::store)?;
  Ok(Json(alert))
}

/// `DELETE /alerts/{id}`
pub async fn delete<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  state.store.delete_alert(id).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "message": "Alert deleted successfully" })))
}
