//! [`SqliteStore`]: the SQLite implementation of [`AlertStore`].

use std::path::Path;

use alertline_core::{
  Error as CoreError,
  alert::{Alert, AlertPatch, AlertStatus, NewAlert},
  location::{Location, NewLocation},
  mirror::MirrorRecord,
  store::{
    AlertCount, AlertDimension, AlertPage, AlertQuery, AlertStore, DailyCount,
    GroupCount, PendingMirror, UserPage, UserQuery,
  },
  user::{NewUser, User, UserPatch},
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, Transaction, types::Value};

use crate::{
  Error, Result,
  encode::{
    ALERT_COLUMNS, LOCATION_COLUMNS, OUTBOX_COLUMNS, RawAlert, RawPending,
    RawUser, USER_COLUMNS, encode_dt, encode_payload, encode_severity,
    encode_status, location_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A durable alert store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// A WHERE clause assembled from optional conditions, each using bare `?`
/// placeholders bound in push order.
#[derive(Default)]
struct Filter {
  conds:  Vec<String>,
  params: Vec<Value>,
}

impl Filter {
  fn push(&mut self, cond: impl Into<String>, params: impl IntoIterator<Item = Value>) {
    self.conds.push(cond.into());
    self.params.extend(params);
  }

  fn where_clause(&self) -> String {
    if self.conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.conds.join(" AND "))
    }
  }
}

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

fn limit_value(limit: Option<usize>) -> Value {
  // SQLite treats a negative LIMIT as unbounded.
  Value::Integer(limit.map_or(-1, |l| l as i64))
}

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

// ─── Transaction bodies ──────────────────────────────────────────────────────
//
// Multi-statement operations run inside one transaction on the connection
// thread. They return `crate::Result` so domain errors (not found, conflicts)
// survive the trip back through `tokio_rusqlite`; dropping an uncommitted
// transaction rolls it back.

fn fetch_alert(tx: &Transaction<'_>, id: i64) -> Result<Option<Alert>> {
  tx.query_row(
    &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
    rusqlite::params![id],
    RawAlert::from_row,
  )
  .optional()?
  .map(RawAlert::into_alert)
  .transpose()
}

fn fetch_user(tx: &Transaction<'_>, id: i64) -> Result<Option<User>> {
  tx.query_row(
    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
    rusqlite::params![id],
    RawUser::from_row,
  )
  .optional()?
  .map(RawUser::into_user)
  .transpose()
}

/// Fail with the matching conflict if `username` or `email` belongs to a user
/// other than `except`.
fn check_unique(
  tx: &Transaction<'_>,
  username: Option<&str>,
  email: Option<&str>,
  except: Option<i64>,
) -> Result<()> {
  let taken = |column: &str, value: &str| -> Result<bool> {
    Ok(
      tx.query_row(
        &format!("SELECT 1 FROM users WHERE {column} = ?1 AND id IS NOT ?2"),
        rusqlite::params![value, except],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
    )
  };

  if let Some(username) = username
    && taken("username", username)?
  {
    return Err(CoreError::UsernameTaken(username.to_owned()).into());
  }
  if let Some(email) = email
    && taken("email", email)?
  {
    return Err(CoreError::EmailTaken(email.to_owned()).into());
  }
  Ok(())
}

fn create_alert_tx(
  conn: &mut rusqlite::Connection,
  input: NewAlert,
  now: DateTime<Utc>,
) -> Result<Alert> {
  let tx = conn.transaction()?;

  if let Some(user_id) = input.created_by
    && fetch_user(&tx, user_id)?.is_none()
  {
    return Err(CoreError::UnknownUser(user_id).into());
  }

  tx.execute(
    "INSERT INTO alerts (
       alert_type, severity, title, description, latitude, longitude,
       location_name, radius, status, is_active, created_by, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?11)",
    rusqlite::params![
      input.alert_type,
      encode_severity(input.severity),
      input.title,
      input.description,
      input.latitude,
      input.longitude,
      input.location_name,
      input.radius,
      encode_status(AlertStatus::Active),
      input.created_by,
      encode_dt(now),
    ],
  )?;
  let id = tx.last_insert_rowid();
  tx.commit()?;

  Ok(Alert {
    id,
    alert_type: input.alert_type,
    severity: input.severity,
    title: input.title,
    description: input.description,
    latitude: input.latitude,
    longitude: input.longitude,
    location_name: input.location_name,
    radius: input.radius,
    status: AlertStatus::Active,
    is_active: true,
    created_by: input.created_by,
    created_at: now,
    resolved_at: None,
  })
}

fn update_alert_tx(
  conn: &mut rusqlite::Connection,
  id: i64,
  patch: AlertPatch,
  now: DateTime<Utc>,
) -> Result<Alert> {
  let tx = conn.transaction()?;
  let mut alert = fetch_alert(&tx, id)?.ok_or(CoreError::AlertNotFound(id))?;
  alert.apply(patch, now)?;

  tx.execute(
    "UPDATE alerts SET status = ?1, is_active = ?2, resolved_at = ?3 WHERE id = ?4",
    rusqlite::params![
      encode_status(alert.status),
      alert.is_active,
      alert.resolved_at.map(encode_dt),
      id,
    ],
  )?;
  tx.commit()?;
  Ok(alert)
}

fn create_user_tx(
  conn: &mut rusqlite::Connection,
  input: NewUser,
  now: DateTime<Utc>,
) -> Result<User> {
  let tx = conn.transaction()?;
  check_unique(&tx, Some(&input.username), Some(&input.email), None)?;

  tx.execute(
    "INSERT INTO users (
       username, email, full_name, phone, role, hashed_password, is_active, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      input.username,
      input.email,
      input.full_name,
      input.phone,
      input.role,
      input.hashed_password,
      input.is_active,
      encode_dt(now),
    ],
  )?;
  let id = tx.last_insert_rowid();
  tx.commit()?;

  Ok(User {
    id,
    username: input.username,
    email: input.email,
    full_name: input.full_name,
    phone: input.phone,
    role: input.role,
    hashed_password: input.hashed_password,
    is_active: input.is_active,
    created_at: now,
  })
}

fn update_user_tx(
  conn: &mut rusqlite::Connection,
  id: i64,
  patch: UserPatch,
) -> Result<User> {
  let tx = conn.transaction()?;
  let mut user = fetch_user(&tx, id)?.ok_or(CoreError::UserNotFound(id))?;
  check_unique(&tx, patch.username.as_deref(), patch.email.as_deref(), Some(id))?;

  if let Some(username) = patch.username {
    user.username = username;
  }
  if let Some(email) = patch.email {
    user.email = email;
  }
  if let Some(full_name) = patch.full_name {
    user.full_name = Some(full_name);
  }
  if let Some(phone) = patch.phone {
    user.phone = Some(phone);
  }
  if let Some(role) = patch.role {
    user.role = role;
  }
  if let Some(is_active) = patch.is_active {
    user.is_active = is_active;
  }
  if let Some(hash) = patch.hashed_password {
    user.hashed_password = hash;
  }

  tx.execute(
    "UPDATE users SET
       username = ?1, email = ?2, full_name = ?3, phone = ?4, role = ?5,
       hashed_password = ?6, is_active = ?7
     WHERE id = ?8",
    rusqlite::params![
      user.username,
      user.email,
      user.full_name,
      user.phone,
      user.role,
      user.hashed_password,
      user.is_active,
      id,
    ],
  )?;
  tx.commit()?;
  Ok(user)
}

// ─── AlertStore impl ─────────────────────────────────────────────────────────

impl AlertStore for SqliteStore {
  type Error = Error;

  // ── Alerts ────────────────────────────────────────────────────────────────

  async fn create_alert(&self, input: NewAlert) -> Result<Alert> {
    let now = Utc::now();
    self
      .conn
      .call(move |conn| Ok(create_alert_tx(conn, input, now)))
      .await?
  }

  async fn get_alert(&self, id: i64) -> Result<Option<Alert>> {
    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
              rusqlite::params![id],
              RawAlert::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }

  async fn list_alerts(&self, query: &AlertQuery) -> Result<AlertPage> {
    let mut filter = Filter::default();
    if let Some(t) = &query.alert_type {
      filter.push("instr(lower(alert_type), ?) > 0", [text(t.to_lowercase())]);
    }
    if let Some(s) = query.severity {
      filter.push("severity = ?", [text(encode_severity(s))]);
    }
    if let Some(s) = query.status {
      filter.push("status = ?", [text(encode_status(s))]);
    }
    if let Some(a) = query.is_active {
      filter.push("is_active = ?", [Value::Integer(a.into())]);
    }
    let limit = limit_value(query.limit);
    let offset = Value::Integer(query.offset.unwrap_or(0) as i64);

    let (raws, total): (Vec<RawAlert>, i64) = self
      .conn
      .call(move |conn| {
        let where_clause = filter.where_clause();

        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM alerts {where_clause}"),
          rusqlite::params_from_iter(filter.params.iter()),
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {ALERT_COLUMNS} FROM alerts {where_clause}
           ORDER BY created_at DESC, id DESC
           LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(
              filter.params.iter().chain([&limit, &offset]),
            ),
            RawAlert::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    Ok(AlertPage {
      alerts: raws.into_iter().map(RawAlert::into_alert).collect::<Result<_>>()?,
      total:  total as u64,
    })
  }

  async fn update_alert(&self, id: i64, patch: AlertPatch) -> Result<Alert> {
    let now = Utc::now();
    self
      .conn
      .call(move |conn| Ok(update_alert_tx(conn, id, patch, now)))
      .await?
  }

  async fn delete_alert(&self, id: i64) -> Result<()> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM alerts WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    if deleted == 0 {
      return Err(CoreError::AlertNotFound(id).into());
    }
    Ok(())
  }

  async fn count_alerts(&self, query: &AlertCount) -> Result<u64> {
    let mut filter = Filter::default();
    filter.push("substr(created_at, 1, 10) = ?", [text(
      query.created_on.format("%Y-%m-%d").to_string(),
    )]);
    if !query.type_patterns.is_empty() {
      let any = vec!["instr(lower(alert_type), ?) > 0"; query.type_patterns.len()];
      filter.push(
        format!("({})", any.join(" OR ")),
        query.type_patterns.iter().map(|p| text(p.to_lowercase())),
      );
    }

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM alerts {}", filter.where_clause()),
          rusqlite::params_from_iter(filter.params.iter()),
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count as u64)
  }

  async fn group_alerts(
    &self,
    dimension: AlertDimension,
    limit: Option<usize>,
  ) -> Result<Vec<GroupCount>> {
    let (column, where_clause) = match dimension {
      AlertDimension::Type => ("alert_type", ""),
      AlertDimension::Severity => ("severity", ""),
      AlertDimension::Status => ("status", ""),
      AlertDimension::LocationName => {
        ("location_name", "WHERE location_name IS NOT NULL")
      }
    };
    let limit = limit_value(limit);

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {column}, COUNT(*) AS n FROM alerts {where_clause}
           GROUP BY {column}
           ORDER BY n DESC, {column} ASC
           LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(key, n)| GroupCount { key, count: n as u64 })
        .collect(),
    )
  }

  async fn daily_alert_counts(&self, since: DateTime<Utc>) -> Result<Vec<DailyCount>> {
    let since_str = encode_dt(since);

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM alerts
           WHERE created_at >= ?1
           GROUP BY day
           ORDER BY day ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![since_str], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(day, n)| {
        let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
          .map_err(|e| Error::DateParse(e.to_string()))?;
        Ok(DailyCount { date, count: n as u64 })
      })
      .collect()
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let now = Utc::now();
    self
      .conn
      .call(move |conn| Ok(create_user_tx(conn, input, now)))
      .await?
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
              rusqlite::params![id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self, query: &UserQuery) -> Result<UserPage> {
    let mut filter = Filter::default();
    if let Some(role) = &query.role {
      filter.push("role = ?", [text(role.as_str())]);
    }
    if !query.any_role.is_empty() {
      filter.push(
        format!("role IN ({})", placeholders(query.any_role.len())),
        query.any_role.iter().map(|r| text(r.as_str())),
      );
    }
    if let Some(a) = query.is_active {
      filter.push("is_active = ?", [Value::Integer(a.into())]);
    }
    let limit = limit_value(query.limit);
    let offset = Value::Integer(query.offset.unwrap_or(0) as i64);

    let (raws, total): (Vec<RawUser>, i64) = self
      .conn
      .call(move |conn| {
        let where_clause = filter.where_clause();

        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM users {where_clause}"),
          rusqlite::params_from_iter(filter.params.iter()),
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users {where_clause}
           ORDER BY id ASC
           LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(
              filter.params.iter().chain([&limit, &offset]),
            ),
            RawUser::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    Ok(UserPage {
      users: raws.into_iter().map(RawUser::into_user).collect::<Result<_>>()?,
      total: total as u64,
    })
  }

  async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User> {
    self
      .conn
      .call(move |conn| Ok(update_user_tx(conn, id, patch)))
      .await?
  }

  async fn delete_user(&self, id: i64) -> Result<()> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    if deleted == 0 {
      return Err(CoreError::UserNotFound(id).into());
    }
    Ok(())
  }

  // ── Locations ─────────────────────────────────────────────────────────────

  async fn create_location(&self, input: NewLocation) -> Result<Location> {
    let row = input.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO locations (
             name, city, state, country, latitude, longitude, location_type
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            row.name,
            row.city,
            row.state,
            row.country,
            row.latitude,
            row.longitude,
            row.location_type,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Location {
      id,
      name: input.name,
      city: input.city,
      state: input.state,
      country: input.country,
      latitude: input.latitude,
      longitude: input.longitude,
      location_type: input.location_type,
    })
  }

  async fn get_location(&self, id: i64) -> Result<Option<Location>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?1"),
                rusqlite::params![id],
                location_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn list_locations(&self) -> Result<Vec<Location>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn
            .prepare(&format!("SELECT {LOCATION_COLUMNS} FROM locations ORDER BY id"))?;
          let rows = stmt
            .query_map([], location_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  // ── Mirror outbox ─────────────────────────────────────────────────────────

  async fn enqueue_mirror(
    &self,
    alert_id: i64,
    payload: MirrorRecord,
    error: String,
  ) -> Result<PendingMirror> {
    let now = Utc::now();
    let payload_str = encode_payload(&payload)?;
    let at_str = encode_dt(now);
    let last_error = error.clone();

    let outbox_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO mirror_outbox (alert_id, payload, last_error, attempts, created_at)
           VALUES (?1, ?2, ?3, 1, ?4)",
          rusqlite::params![alert_id, payload_str, last_error, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(PendingMirror {
      outbox_id,
      alert_id,
      payload,
      last_error: error,
      attempts: 1,
      created_at: now,
    })
  }

  async fn pending_mirrors(&self) -> Result<Vec<PendingMirror>> {
    let raws: Vec<RawPending> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {OUTBOX_COLUMNS} FROM mirror_outbox ORDER BY id ASC"
        ))?;
        let rows = stmt
          .query_map([], RawPending::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPending::into_pending).collect()
  }

  async fn claim_mirror(
    &self,
    outbox_id: i64,
    stale_before: DateTime<Utc>,
  ) -> Result<bool> {
    let now_str = encode_dt(Utc::now());
    let stale_str = encode_dt(stale_before);

    let claimed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE mirror_outbox SET claimed_at = ?1
           WHERE id = ?2 AND (claimed_at IS NULL OR claimed_at < ?3)",
          rusqlite::params![now_str, outbox_id, stale_str],
        )?)
      })
      .await?;

    Ok(claimed == 1)
  }

  async fn record_mirror_attempt(&self, outbox_id: i64, error: String) -> Result<()> {
    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE mirror_outbox
           SET attempts = attempts + 1, last_error = ?1, claimed_at = NULL
           WHERE id = ?2",
          rusqlite::params![error, outbox_id],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(CoreError::OutboxEntryNotFound(outbox_id).into());
    }
    Ok(())
  }

  async fn resolve_mirror(&self, outbox_id: i64) -> Result<()> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM mirror_outbox WHERE id = ?1",
          rusqlite::params![outbox_id],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(CoreError::OutboxEntryNotFound(outbox_id).into());
    }
    Ok(())
  }
}
