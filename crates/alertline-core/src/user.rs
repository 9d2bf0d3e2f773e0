//! Platform users: citizens, responders and administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role conventionally assigned to responders counted on the dashboard.
pub const RESPONDER_ROLES: [&str; 2] = ["police", "ngo"];

/// The role given to a user created without one.
pub const DEFAULT_ROLE: &str = "user";

/// A persisted user. The password hash is never serialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id:              i64,
  pub username:        String,
  pub email:           String,
  pub full_name:       Option<String>,
  pub phone:           Option<String>,
  /// Free text; conventionally `user`, `police`, `ngo` or `admin`.
  pub role:            String,
  #[serde(skip_serializing, default)]
  pub hashed_password: String,
  pub is_active:       bool,
  pub created_at:      DateTime<Utc>,
}

impl User {
  /// Name shown on admin listings: full name when present, else username.
  pub fn display_name(&self) -> &str {
    self.full_name.as_deref().unwrap_or(&self.username)
  }
}

/// Input to [`crate::store::AlertStore::create_user`].
///
/// Carries the derived hash only; raw passwords never reach the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:        String,
  pub email:           String,
  pub full_name:       Option<String>,
  pub phone:           Option<String>,
  pub role:            String,
  pub hashed_password: String,
  pub is_active:       bool,
}

/// Partial update for a user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
  pub username:        Option<String>,
  pub email:           Option<String>,
  pub full_name:       Option<String>,
  pub phone:           Option<String>,
  pub role:            Option<String>,
  pub is_active:       Option<bool>,
  pub hashed_password: Option<String>,
}
