//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so lexical order equals chronological order and the
//! first ten characters are the calendar date. Enumerations are stored as
//! their lowercase names; payloads as compact JSON.

use alertline_core::{
  alert::{Alert, AlertStatus, Severity},
  location::Location,
  mirror::MirrorRecord,
  store::PendingMirror,
  user::User,
};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Severity / AlertStatus ──────────────────────────────────────────────────

pub fn encode_severity(s: Severity) -> &'static str { s.as_str() }

pub fn decode_severity(s: &str) -> Result<Severity> {
  s.parse()
    .map_err(|_| Error::UnknownEnum { column: "severity", value: s.into() })
}

pub fn encode_status(s: AlertStatus) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<AlertStatus> {
  s.parse()
    .map_err(|_| Error::UnknownEnum { column: "status", value: s.into() })
}

// ─── Payload ─────────────────────────────────────────────────────────────────

pub fn encode_payload(record: &MirrorRecord) -> Result<String> {
  Ok(serde_json::to_string(record)?)
}

pub fn decode_payload(s: &str) -> Result<MirrorRecord> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ALERT_COLUMNS: &str = "id, alert_type, severity, title, description, \
   latitude, longitude, location_name, radius, status, is_active, created_by, \
   created_at, resolved_at";

/// Raw values read directly from an `alerts` row.
pub struct RawAlert {
  pub id:            i64,
  pub alert_type:    String,
  pub severity:      String,
  pub title:         String,
  pub description:   Option<String>,
  pub latitude:      f64,
  pub longitude:     f64,
  pub location_name: Option<String>,
  pub radius:        Option<f64>,
  pub status:        String,
  pub is_active:     bool,
  pub created_by:    Option<i64>,
  pub created_at:    String,
  pub resolved_at:   Option<String>,
}

impl RawAlert {
  /// Row mapper for queries selecting [`ALERT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      alert_type:    row.get(1)?,
      severity:      row.get(2)?,
      title:         row.get(3)?,
      description:   row.get(4)?,
      latitude:      row.get(5)?,
      longitude:     row.get(6)?,
      location_name: row.get(7)?,
      radius:        row.get(8)?,
      status:        row.get(9)?,
      is_active:     row.get(10)?,
      created_by:    row.get(11)?,
      created_at:    row.get(12)?,
      resolved_at:   row.get(13)?,
    })
  }

  pub fn into_alert(self) -> Result<Alert> {
    Ok(Alert {
      id:            self.id,
      alert_type:    self.alert_type,
      severity:      decode_severity(&self.severity)?,
      title:         self.title,
      description:   self.description,
      latitude:      self.latitude,
      longitude:     self.longitude,
      location_name: self.location_name,
      radius:        self.radius,
      status:        decode_status(&self.status)?,
      is_active:     self.is_active,
      created_by:    self.created_by,
      created_at:    decode_dt(&self.created_at)?,
      resolved_at:   self.resolved_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub const USER_COLUMNS: &str = "id, username, email, full_name, phone, role, \
   hashed_password, is_active, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:              i64,
  pub username:        String,
  pub email:           String,
  pub full_name:       Option<String>,
  pub phone:           Option<String>,
  pub role:            String,
  pub hashed_password: String,
  pub is_active:       bool,
  pub created_at:      String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      username:        row.get(1)?,
      email:           row.get(2)?,
      full_name:       row.get(3)?,
      phone:           row.get(4)?,
      role:            row.get(5)?,
      hashed_password: row.get(6)?,
      is_active:       row.get(7)?,
      created_at:      row.get(8)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:              self.id,
      username:        self.username,
      email:           self.email,
      full_name:       self.full_name,
      phone:           self.phone,
      role:            self.role,
      hashed_password: self.hashed_password,
      is_active:       self.is_active,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub const LOCATION_COLUMNS: &str =
  "id, name, city, state, country, latitude, longitude, location_type";

/// Locations hold no encoded columns, so rows map straight to the domain type.
pub fn location_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Location> {
  Ok(Location {
    id:            row.get(0)?,
    name:          row.get(1)?,
    city:          row.get(2)?,
    state:         row.get(3)?,
    country:       row.get(4)?,
    latitude:      row.get(5)?,
    longitude:     row.get(6)?,
    location_type: row.get(7)?,
  })
}

pub const OUTBOX_COLUMNS: &str =
  "id, alert_id, payload, last_error, attempts, created_at";

/// Raw values read directly from a `mirror_outbox` row.
pub struct RawPending {
  pub id:         i64,
  pub alert_id:   i64,
  pub payload:    String,
  pub last_error: String,
  pub attempts:   u32,
  pub created_at: String,
}

impl RawPending {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      alert_id:   row.get(1)?,
      payload:    row.get(2)?,
      last_error: row.get(3)?,
      attempts:   row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_pending(self) -> Result<PendingMirror> {
    Ok(PendingMirror {
      outbox_id:  self.id,
      alert_id:   self.alert_id,
      payload:    decode_payload(&self.payload)?,
      last_error: self.last_error,
      attempts:   self.attempts,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
