//! Admin dashboard: aggregate views over alerts and users.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/admin/overview` | Today's counts by bucket, active responders |
//! | `GET`    | `/admin/alerts/all` | Filtered, paged listing |
//! | `GET`    | `/admin/alerts/stats` | Group-by type, severity, status |
//! | `GET`    | `/admin/users` | `?role=&status=&skip=&limit=` |
//! | `POST`   | `/admin/users` | `{message, id}` |
//! | `PUT`    | `/admin/users/{id}` | Partial update |
//! | `DELETE` | `/admin/users/{id}` | Hard delete |
//! | `GET`    | `/admin/insights` | Trends, hotspots, naive projection |
//! | `GET`    | `/admin/map/alerts` | Active alerts as map markers |
//! | `GET`    | `/admin/map/heatmap` | Per-alert crime risk and location density |
//!
//! Every view is computed fresh from the store; nothing is cached.

use std::collections::{BTreeMap, HashMap};

use alertline_core::{
  alert::{Alert, AlertStatus, Severity},
  mirror::AlertMirror,
  store::{
    AlertCount, AlertDimension, AlertQuery, AlertStore, GroupCount, UserQuery,
  },
  user::{RESPONDER_ROLES, User},
};
use alertline_risk::AreaInput;
use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{Duration, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  alerts::default_limit,
  error::ApiError,
  users::{CreateUserBody, UpdateUserBody},
};

/// Alert-type substrings for each overview bucket.
const CRIME_PATTERNS: &[&str] = &["crime"];
const FRAUD_PATTERNS: &[&str] = &["fraud"];
const WEATHER_PATTERNS: &[&str] = &["weather", "flood", "storm"];

/// Days covered by the insight trend window.
const TREND_DAYS: i64 = 7;
const HOTSPOT_LIMIT: usize = 5;
/// Projection used when the trend window holds no alerts.
const DEFAULT_NEXT_WEEK: u64 = 100;
const PROJECTION_CONFIDENCE: f64 = 0.85;

/// Label for alerts without a location name.
const UNKNOWN_LOCATION: &str = "Unknown";

fn rfc3339(dt: chrono::DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `None` for an absent or blank query value.
fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

// ─── Overview ────────────────────────────────────────────────────────────────

/// `GET /admin/overview`
pub async fn overview<S, M>(
  State(state): State<AppState<S, M>>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let today = Utc::now().date_naive();
  let count = |patterns: &[&str]| AlertCount {
    created_on:    today,
    type_patterns: patterns.iter().map(|p| (*p).to_owned()).collect(),
  };

  let store = &state.store;
  let total = store.count_alerts(&count(&[])).await.map_err(ApiError::store)?;
  let crime = store.count_alerts(&count(CRIME_PATTERNS)).await.map_err(ApiError::store)?;
  let fraud = store.count_alerts(&count(FRAUD_PATTERNS)).await.map_err(ApiError::store)?;
  let weather = store
    .count_alerts(&count(WEATHER_PATTERNS))
    .await
    .map_err(ApiError::store)?;

  let responders = UserQuery {
    any_role: RESPONDER_ROLES.iter().map(|r| (*r).to_owned()).collect(),
    is_active: Some(true),
    limit: Some(0),
    ..Default::default()
  };
  let active_responders = store
    .list_users(&responders)
    .await
    .map_err(ApiError::store)?
    .total;

  Ok(Json(json!({
    "totalAlertsToday": total,
    "crimeAlerts": crime,
    "fraudAlerts": fraud,
    "weatherAlerts": weather,
    "activeResponders": active_responders,
  })))
}

// ─── Alert listing ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AlertListParams {
  pub alert_type: Option<String>,
  pub severity:   Option<String>,
  pub status:     Option<String>,
  #[serde(default)]
  pub skip:       usize,
  #[serde(default = "default_limit")]
  pub limit:      usize,
}

fn admin_alert_row(alert: &Alert) -> Value {
  json!({
    "id": alert.id,
    "type": alert.alert_type,
    "title": alert.title,
    "location": alert.location_name.as_deref().unwrap_or(UNKNOWN_LOCATION),
    "severity": alert.severity,
    "status": alert.status,
    "reportedOn": rfc3339(alert.created_at),
    "latitude": alert.latitude,
    "longitude": alert.longitude,
    "description": alert.description,
  })
}

/// `GET /admin/alerts/all[?alert_type=&severity=&status=&skip=&limit=]`
///
/// `total` counts every matching row; `page` is `skip / limit + 1`.
pub async fn alerts_all<S, M>(
  State(state): State<AppState<S, M>>,
  Query(params): Query<AlertListParams>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  if params.limit == 0 {
    return Err(ApiError::BadRequest("limit must be at least 1".into()));
  }
  let query = AlertQuery {
    alert_type: non_blank(params.alert_type),
    severity:   non_blank(params.severity)
      .map(|s| s.parse::<Severity>())
      .transpose()?,
    status:     non_blank(params.status)
      .map(|s| s.parse::<AlertStatus>())
      .transpose()?,
    is_active:  None,
    offset:     Some(params.skip),
    limit:      Some(params.limit),
  };

  let page = state.store.list_alerts(&query).await.map_err(ApiError::store)?;
  Ok(Json(json!({
    "data": page.alerts.iter().map(admin_alert_row).collect::<Vec<_>>(),
    "total": page.total,
    "page": params.skip / params.limit + 1,
    "limit": params.limit,
  })))
}

// ─── Statistics ──────────────────────────────────────────────────────────────

fn name_value(groups: &[GroupCount]) -> Vec<Value> {
  groups
    .iter()
    .map(|g| json!({ "name": g.key, "value": g.count }))
    .collect()
}

/// `GET /admin/alerts/stats`: three independent group-bys, not a cross-tab.
pub async fn alerts_stats<S, M>(
  State(state): State<AppState<S, M>>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let group = |dimension| state.store.group_alerts(dimension, None);
  let by_type = group(AlertDimension::Type).await.map_err(ApiError::store)?;
  let by_severity = group(AlertDimension::Severity).await.map_err(ApiError::store)?;
  let by_status = group(AlertDimension::Status).await.map_err(ApiError::store)?;

  Ok(Json(json!({
    "byType": name_value(&by_type),
    "bySeverity": name_value(&by_severity),
    "byStatus": name_value(&by_status),
  })))
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserListParams {
  pub role:   Option<String>,
  /// `active` selects active users; any other value selects inactive ones.
  pub status: Option<String>,
  #[serde(default)]
  pub skip:   usize,
  #[serde(default = "default_limit")]
  pub limit:  usize,
}

fn admin_user_row(user: &User) -> Value {
  json!({
    "id": user.id,
    "name": user.display_name(),
    "email": user.email,
    "role": user.role,
    "phone": user.phone,
    "status": if user.is_active { "active" } else { "inactive" },
    "createdAt": rfc3339(user.created_at),
  })
}

/// `GET /admin/users[?role=&status=&skip=&limit=]`
pub async fn users_list<S, M>(
  State(state): State<AppState<S, M>>,
  Query(params): Query<UserListParams>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let query = UserQuery {
    role:      non_blank(params.role),
    any_role:  Vec::new(),
    is_active: non_blank(params.status).map(|s| s.eq_ignore_ascii_case("active")),
    offset:    Some(params.skip),
    limit:     Some(params.limit),
  };
  let page = state.store.list_users(&query).await.map_err(ApiError::store)?;
  Ok(Json(json!({
    "data": page.users.iter().map(admin_user_row).collect::<Vec<_>>(),
    "total": page.total,
  })))
}

/// `POST /admin/users`
pub async fn users_create<S, M>(
  State(state): State<AppState<S, M>>,
  Json(body): Json<CreateUserBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let user = state
    .store
    .create_user(body.into_new_user()?)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(user_id = user.id, role = %user.role, "user created by admin");
  Ok(Json(json!({ "message": "User created successfully", "id": user.id })))
}

/// `PUT /admin/users/{id}`
pub async fn users_update<S, M>(
  State(state): State<AppState<S, M>>,
  Path(id): Path<i64>,
  Json(body): Json<UpdateUserBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  state
    .store
    .update_user(id, body.into_patch()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "message": "User updated successfully" })))
}

/// `DELETE /admin/users/{id}`
pub async fn users_delete<S, M>(
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

// ─── Insights ────────────────────────────────────────────────────────────────

/// Average daily count over the whole trend window, scaled to a week.
///
/// Quiet days inside the window count as zero; `daily_counts` only lists
/// days that had alerts.
fn project_next_week(daily_counts: &[u64]) -> u64 {
  if daily_counts.is_empty() {
    return DEFAULT_NEXT_WEEK;
  }
  let total: u64 = daily_counts.iter().sum();
  let per_day = total as f64 / TREND_DAYS as f64;
  (per_day * 7.0).round() as u64
}

/// `GET /admin/insights`
pub async fn insights<S, M>(
  State(state): State<AppState<S, M>>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let since = Utc::now() - Duration::days(TREND_DAYS);
  let daily = state
    .store
    .daily_alert_counts(since)
    .await
    .map_err(ApiError::store)?;
  let hotspots = state
    .store
    .group_alerts(AlertDimension::LocationName, Some(HOTSPOT_LIMIT))
    .await
    .map_err(ApiError::store)?;
  let severities = state
    .store
    .group_alerts(AlertDimension::Severity, None)
    .await
    .map_err(ApiError::store)?;

  let counts: Vec<u64> = daily.iter().map(|d| d.count).collect();

  Ok(Json(json!({
    "trends": daily
      .iter()
      .map(|d| json!({ "date": d.date.format("%Y-%m-%d").to_string(), "count": d.count }))
      .collect::<Vec<_>>(),
    "hotspots": hotspots
      .iter()
      .map(|h| json!({ "location": h.key, "incidents": h.count }))
      .collect::<Vec<_>>(),
    "severityDistribution": severities
      .iter()
      .map(|s| json!({ "severity": s.key, "count": s.count }))
      .collect::<Vec<_>>(),
    "predictions": {
      "nextWeekAlerts": project_next_week(&counts),
      "highRiskAreas": hotspots.len(),
      "confidence": PROJECTION_CONFIDENCE,
    },
  })))
}

// ─── Map ─────────────────────────────────────────────────────────────────────

/// `GET /admin/map/alerts`: every active alert as a marker.
pub async fn map_alerts<S, M>(
  State(state): State<AppState<S, M>>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let query = AlertQuery { is_active: Some(true), ..Default::default() };
  let page = state.store.list_alerts(&query).await.map_err(ApiError::store)?;

  let markers: Vec<Value> = page
    .alerts
    .iter()
    .map(|a| {
      json!({
        "id": a.id,
        "type": a.alert_type,
        "title": a.title,
        "severity": a.severity,
        "latitude": a.latitude,
        "longitude": a.longitude,
        "location": a.location_name,
        "timestamp": rfc3339(a.created_at),
      })
    })
    .collect();

  Ok(Json(json!({ "total": markers.len(), "alerts": markers })))
}

/// Build one heatmap input per alert, oldest first.
///
/// `prior_incidents` is the number of alerts seen so far at the same
/// location name, the current one included. Unnamed alerts share no area, so
/// they carry no count. Every other crime feature keeps its default.
/// Returns the inputs and the per-location totals.
fn heatmap_inputs(alerts: &[Alert]) -> (Vec<AreaInput>, BTreeMap<String, u64>) {
  let mut running: HashMap<&str, u64> = HashMap::new();
  let mut density: BTreeMap<String, u64> = BTreeMap::new();

  let inputs = alerts
    .iter()
    .rev()
    .map(|alert| {
      let mut features = BTreeMap::new();
      if let Some(name) = alert.location_name.as_deref() {
        let seen = running.entry(name).or_default();
        *seen += 1;
        features.insert("prior_incidents".to_owned(), *seen as f64);
        *density.entry(name.to_owned()).or_default() += 1;
      }
      AreaInput {
        latitude:  alert.latitude,
        longitude: alert.longitude,
        area_name: alert.location_name.as_deref().unwrap_or(UNKNOWN_LOCATION).to_owned(),
        features,
      }
    })
    .collect();

  (inputs, density)
}

/// `GET /admin/map/heatmap`
pub async fn heatmap<S, M>(
  State(state): State<AppState<S, M>>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let page = state
    .store
    .list_alerts(&AlertQuery::default())
    .await
    .map_err(ApiError::store)?;

  let (inputs, density) = heatmap_inputs(&page.alerts);
  let heatmap = state.risk.score_areas(&inputs);

  Ok(Json(json!({
    "total": heatmap.len(),
    "heatmap": heatmap,
    "density": density,
  })))
}
