//! The `AlertStore` trait and supporting query types.
//!
//! The trait is implemented by durable backends (e.g.
//! `alertline-store-sqlite`). The API layer depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  alert::{Alert, AlertPatch, AlertStatus, NewAlert, Severity},
  location::{Location, NewLocation},
  mirror::MirrorRecord,
  user::{NewUser, User, UserPatch},
};

// ─── Alert queries ───────────────────────────────────────────────────────────

/// Parameters for [`AlertStore::list_alerts`].
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
  /// Case-insensitive substring match on `alert_type`.
  pub alert_type: Option<String>,
  pub severity:   Option<Severity>,
  pub status:     Option<AlertStatus>,
  pub is_active:  Option<bool>,
  pub offset:     Option<usize>,
  pub limit:      Option<usize>,
}

/// One page of alerts, newest first.
#[derive(Debug, Clone)]
pub struct AlertPage {
  pub alerts: Vec<Alert>,
  /// Number of rows matching the filters before `offset`/`limit`.
  pub total:  u64,
}

/// Parameters for [`AlertStore::count_alerts`].
#[derive(Debug, Clone)]
pub struct AlertCount {
  /// Calendar date (UTC) of `created_at`.
  pub created_on:     NaiveDate,
  /// If non-empty, `alert_type` must contain at least one of these
  /// (case-insensitive).
  pub type_patterns: Vec<String>,
}

/// The column an [`AlertStore::group_alerts`] call groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDimension {
  Type,
  Severity,
  Status,
  /// Rows with no location name are excluded.
  LocationName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
  pub key:   String,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
  pub date:  NaiveDate,
  pub count: u64,
}

// ─── User queries ────────────────────────────────────────────────────────────

/// Parameters for [`AlertStore::list_users`].
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
  /// Exact role match.
  pub role:      Option<String>,
  /// If non-empty, role must be one of these.
  pub any_role:  Vec<String>,
  pub is_active: Option<bool>,
  pub offset:    Option<usize>,
  pub limit:     Option<usize>,
}

#[derive(Debug, Clone)]
pub struct UserPage {
  pub users: Vec<User>,
  pub total: u64,
}

// ─── Mirror outbox ───────────────────────────────────────────────────────────

/// A durable alert whose live-mirror write failed and is awaiting replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMirror {
  pub outbox_id:  i64,
  pub alert_id:   i64,
  /// The record that should have been mirrored.
  pub payload:    MirrorRecord,
  pub last_error: String,
  pub attempts:   u32,
  pub created_at: DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the durable, relational alert store.
///
/// The store owns identity: every id is assigned here. Each method is a single
/// atomic unit; a failed mutation leaves no partial row behind.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AlertStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Alerts ────────────────────────────────────────────────────────────

  /// Persist a new alert with status `active` and the current timestamp.
  fn create_alert(
    &self,
    input: NewAlert,
  ) -> impl Future<Output = Result<Alert, Self::Error>> + Send + '_;

  /// Retrieve an alert by id. Returns `None` if not found.
  fn get_alert(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;

  /// Filtered, paged listing ordered by `created_at` descending.
  fn list_alerts<'a>(
    &'a self,
    query: &'a AlertQuery,
  ) -> impl Future<Output = Result<AlertPage, Self::Error>> + Send + 'a;

  /// Apply a partial update through [`Alert::apply`].
  fn update_alert(
    &self,
    id: i64,
    patch: AlertPatch,
  ) -> impl Future<Output = Result<Alert, Self::Error>> + Send + '_;

  /// Hard-delete an alert. Errors if it does not exist.
  fn delete_alert(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn count_alerts<'a>(
    &'a self,
    query: &'a AlertCount,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Group-by counts over one column, largest group first.
  fn group_alerts(
    &self,
    dimension: AlertDimension,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<GroupCount>, Self::Error>> + Send + '_;

  /// Alert counts per calendar day for alerts created at or after `since`.
  fn daily_alert_counts(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<DailyCount>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a user. Rejects a duplicate username or email without writing.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users<'a>(
    &'a self,
    query: &'a UserQuery,
  ) -> impl Future<Output = Result<UserPage, Self::Error>> + Send + 'a;

  /// Apply a partial update. The uniqueness rules of `create_user` apply to a
  /// changed username or email.
  fn update_user(
    &self,
    id: i64,
    patch: UserPatch,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Hard-delete a user. Errors if it does not exist.
  fn delete_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Locations ─────────────────────────────────────────────────────────

  fn create_location(
    &self,
    input: NewLocation,
  ) -> impl Future<Output = Result<Location, Self::Error>> + Send + '_;

  fn get_location(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Location>, Self::Error>> + Send + '_;

  fn list_locations(
    &self,
  ) -> impl Future<Output = Result<Vec<Location>, Self::Error>> + Send + '_;

  // ── Mirror outbox ─────────────────────────────────────────────────────

  /// Record that `alert_id` is committed but its mirror write failed.
  fn enqueue_mirror(
    &self,
    alert_id: i64,
    payload: MirrorRecord,
    error: String,
  ) -> impl Future<Output = Result<PendingMirror, Self::Error>> + Send + '_;

  /// All pending entries, oldest first.
  fn pending_mirrors(
    &self,
  ) -> impl Future<Output = Result<Vec<PendingMirror>, Self::Error>> + Send + '_;

  /// Take an entry for replay.
  ///
  /// Returns `false` when the entry is gone or another replay claimed it
  /// after `stale_before`. Claims older than that are taken over.
  fn claim_mirror(
    &self,
    outbox_id: i64,
    stale_before: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Note a failed replay attempt and release the claim.
  fn record_mirror_attempt(
    &self,
    outbox_id: i64,
    error: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove an entry after a successful replay.
  fn resolve_mirror(
    &self,
    outbox_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
