//! Handlers for `/locations` endpoints (reference data).
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/locations` | All locations |
//! | `POST` | `/locations` | Body: [`NewLocation`]; 201 |
//! | `GET`  | `/locations/{id}` | 404 if not found |

use alertline_core::{
  location::{Location, NewLocation},
  mirror::AlertMirror,
  store::AlertStore,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};

use crate::{AppState, error::ApiError};

/// `GET /locations`
pub async fn list<S, M>(
  State(state): State<AppState<S, M>>,
) -> Result<Json<Vec<Location>>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let locations = state.store.list_locations().await.map_err(ApiError::store)?;
  Ok(Json(locations))
}

/// `POST /locations`
pub async fn create<S, M>(
  State(state): State<AppState<S, M>>,
  Json(body): Json<NewLocation>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be blank".into()));
  }
  let location = state.store.create_location(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(location)))
}

/// `GET /locations/{id}`
pub async fn get_one<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Json<Location>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let location = state
    .store
    .get_location(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("location {id} not found")))?;
  Ok(Json(location))
}
