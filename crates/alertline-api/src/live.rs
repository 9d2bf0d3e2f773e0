//! Handlers for `/firebase/alerts` endpoints (the live mirror).
//!
//! Bodies and responses are raw JSON objects; the mirror imposes no schema
//! beyond the fields it stamps on creation.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/firebase/alerts` | `{alerts: {id: record}}` |
//! | `GET`    | `/firebase/alerts/active` | Only `status == "active"` |
//! | `POST`   | `/firebase/alerts` | Requires [`REQUIRED_FIELDS`] |
//! | `GET`    | `/firebase/alerts/{id}` | `{alert}`; 404 if absent |
//! | `PUT`    | `/firebase/alerts/{id}` | Shallow merge; 404 if absent |
//! | `DELETE` | `/firebase/alerts/{id}` | 404 if absent |

use alertline_core::{
  mirror::{AlertMirror, MirrorRecord},
  store::AlertStore,
};
use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

/// Keys a record created directly through the API must carry.
pub const REQUIRED_FIELDS: [&str; 5] =
  ["alert_type", "severity", "title", "latitude", "longitude"];

// ─── Collections ─────────────────────────────────────────────────────────────

/// `GET /firebase/alerts`
pub async fn list<S, M>(State(state): State<AppState<S, M>>) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let alerts = state.mirror.get_all().await.map_err(ApiError::mirror)?;
  Ok(Json(json!({ "alerts": alerts })))
}

/// `GET /firebase/alerts/active`
pub async fn active<S, M>(
  State(state): State<AppState<S, M>>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let alerts = state.mirror.get_active().await.map_err(ApiError::mirror)?;
  Ok(Json(json!({ "alerts": alerts })))
}

/// `POST /firebase/alerts`
pub async fn create<S, M>(
  State(state): State<AppState<S, M>>,
  Json(record): Json<MirrorRecord>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !record.contains_key(**f)) {
    return Err(ApiError::BadRequest(format!("Missing required field: {missing}")));
  }

  let id = state.mirror.create(record).await.map_err(ApiError::mirror)?;
  Ok(Json(json!({
    "message": "Alert created successfully",
    "alert_id": id,
    "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
  })))
}

// ─── Single record ───────────────────────────────────────────────────────────

/// `GET /firebase/alerts/{id}`
pub async fn get_one<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let alert = state
    .mirror
    .get(&id)
    .await
    .map_err(ApiError::mirror)?
    .ok_or_else(|| ApiError::NotFound(format!("live alert {id} not found")))?;
  Ok(Json(json!({ "alert": alert })))
}

/// `PUT /firebase/alerts/{id}`
pub async fn update<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<String>,
  Json(fields): Json<MirrorRecord>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  if !state.mirror.update(&id, fields).await.map_err(ApiError::mirror)? {
    return Err(ApiError::NotFound(format!("live alert {id} not found")));
  }
  Ok(Json(json!({ "message": "Alert updated successfully" })))
}

/// `DELETE /firebase/alerts/{id}`
pub async fn delete<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  if !state.mirror.delete(&id).await.map_err(ApiError::mirror)? {
    return Err(ApiError::NotFound(format!("live alert {id} not found")));
  }
  Ok(Json(json!({ "message": "Alert deleted successfully" })))
}
