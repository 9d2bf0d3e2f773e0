//! Handlers for `/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users` | `?skip=&limit=` |
//! | `POST`   | `/users` | Body: [`CreateUserBody`]; 201; 409 on duplicates |
//! | `GET`    | `/users/{id}` | 404 if not found |
//! | `PUT`    | `/users/{id}` | Body: [`UpdateUserBody`]; only given fields change |
//! | `DELETE` | `/users/{id}` | 404 if not found |
//!
//! Passwords are hashed here, before anything reaches the store. Responses
//! never carry the hash.

use alertline_core::{
  mirror::AlertMirror,
  store::{AlertStore, UserQuery},
  user::{DEFAULT_ROLE, NewUser, User, UserPatch},
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, alerts::PageParams, error::ApiError, password::hash_password};

// ─── Bodies ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
  pub username:  String,
  pub email:     String,
  #[serde(default)]
  pub full_name: Option<String>,
  #[serde(default)]
  pub phone:     Option<String>,
  #[serde(default)]
  pub role:      Option<String>,
  pub password:  String,
  #[serde(default)]
  pub is_active: Option<bool>,
}

impl CreateUserBody {
  /// Validate and hash into a store input.
  pub fn into_new_user(self) -> Result<NewUser, ApiError> {
    let username = self.username.trim().to_owned();
    let email = self.email.trim().to_owned();
    if username.is_empty() || email.is_empty() {
      return Err(ApiError::BadRequest("username and email must not be blank".into()));
    }
    Ok(NewUser {
      hashed_password: hash_password(&self.password)?,
      username,
      email,
      full_name: self.full_name,
      phone: self.phone,
      role: self
        .role
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ROLE.to_owned()),
      is_active: self.is_active.unwrap_or(true),
    })
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserBody {
  pub username:  Option<String>,
  pub email:     Option<String>,
  pub full_name: Option<String>,
  pub phone:     Option<String>,
  pub role:      Option<String>,
  pub is_active: Option<bool>,
  pub password:  Option<String>,
}

impl UpdateUserBody {
  /// Validate and hash into a store patch.
  pub fn into_patch(self) -> Result<UserPatch, ApiError> {
    let not_blank = |field: &str, value: Option<String>| -> Result<Option<String>, ApiError> {
      match value {
        Some(v) if v.trim().is_empty() => {
          Err(ApiError::BadRequest(format!("{field} must not be blank")))
        }
        other => Ok(other.map(|v| v.trim().to_owned())),
      }
    };
    Ok(UserPatch {
      username:        not_blank("username", self.username)?,
      email:           not_blank("email", self.email)?,
      full_name:       self.full_name,
      phone:           self.phone,
      role:            not_blank("role", self.role)?,
      is_active:       self.is_active,
      hashed_password: self.password.as_deref().map(hash_password).transpose()?,
    })
  }
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /users[?skip=&limit=]`
pub async fn list<S, M>(
  State(state): State<AppState<S, M>>,
  Query(params): Query<PageParams>,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let query = UserQuery {
    offset: Some(params.skip),
    limit: Some(params.limit),
    ..Default::default()
  };
  let page = state.store.list_users(&query).await.map_err(ApiError::store)?;
  Ok(Json(page.users))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /users`
pub async fn create<S, M>(
  State(state): State<AppState<S, M>>,
  Json(body): Json<CreateUserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let user = state
    .store
    .create_user(body.into_new_user()?)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(user_id = user.id, role = %user.role, "user created");
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Single user ─────────────────────────────────────────────────────────────

/// `GET /users/{id}`
pub async fn get_one<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Json<User>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let user = state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user))
}

/// `PUT /users/{id}`
pub async fn update<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<i64>,
  Json(body): Json<UpdateUserBody>,
) -> Result<Json<User>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let user = state
    .store
    .update_user(id, body.into_patch()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(user))
}

/// `DELETE /users/{id}`
pub async fn delete<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  state.store.delete_user(id).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "message": "User deleted successfully" })))
}
