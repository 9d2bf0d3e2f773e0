use std::{collections::BTreeMap, io, time::Duration};

use alertline_core::{
  alert::{AlertPatch, NewAlert, Severity},
  mirror::{AlertMirror, MirrorRecord},
  store::AlertStore,
};
use alertline_mirror::MemoryMirror;
use alertline_risk::{Classifier, RiskDomain, RiskEngine};
use alertline_store_sqlite::SqliteStore;
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Answers the same probability for every input.
struct Fixed(f64);

impl Classifier for Fixed {
  fn probability(&self, _: &[f64]) -> f64 { self.0 }
}

/// A mirror whose every call fails, as if the remote were unreachable.
struct DownMirror;

fn unreachable_remote() -> io::Error {
  io::Error::new(io::ErrorKind::ConnectionRefused, "mirror unreachable")
}

impl AlertMirror for DownMirror {
  type Error = io::Error;

  async fn create(&self, _record: MirrorRecord) -> Result<String, io::Error> {
    Err(unreachable_remote())
  }

  async fn get(&self, _id: &str) -> Result<Option<MirrorRecord>, io::Error> {
    Err(unreachable_remote())
  }

  async fn get_all(&self) -> Result<BTreeMap<String, MirrorRecord>, io::Error> {
    Err(unreachable_remote())
  }

  async fn update(&self, _id: &str, _fields: MirrorRecord) -> Result<bool, io::Error> {
    Err(unreachable_remote())
  }

  async fn delete(&self, _id: &str) -> Result<bool, io::Error> {
    Err(unreachable_remote())
  }
}

/// An in-process mirror that takes a while to accept each write.
#[derive(Default)]
struct SlowMirror(MemoryMirror);

impl AlertMirror for SlowMirror {
  type Error = alertline_mirror::Error;

  async fn create(&self, record: MirrorRecord) -> Result<String, Self::Error> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    self.0.create(record).await
  }

  async fn get(&self, id: &str) -> Result<Option<MirrorRecord>, Self::Error> {
    self.0.get(id).await
  }

  async fn get_all(&self) -> Result<BTreeMap<String, MirrorRecord>, Self::Error> {
    self.0.get_all().await
  }

  async fn update(&self, id: &str, fields: MirrorRecord) -> Result<bool, Self::Error> {
    self.0.update(id, fields).await
  }

  async fn delete(&self, id: &str) -> Result<bool, Self::Error> {
    self.0.delete(id).await
  }
}

fn scored_engine(p: f64) -> RiskEngine {
  RiskDomain::ALL
    .into_iter()
    .fold(RiskEngine::empty(), |engine, domain| engine.with_classifier(domain, Fixed(p)))
}

async fn make_state() -> AppState<SqliteStore, MemoryMirror> {
  AppState::new(
    SqliteStore::open_in_memory().await.unwrap(),
    MemoryMirror::new(),
    scored_engine(0.61),
  )
}

async fn send<S, M>(state: AppState<S, M>, req: Request<Body>) -> (StatusCode, Value)
where
  S: AlertStore + 'static,
  M: AlertMirror + 'static,
{
  let resp = api_router(state).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, body)
}

fn get(uri: &str) -> Request<Body> {
  Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
  Request::builder()
    .method(method)
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
  Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "alertline-test-boundary";

/// Encode text fields and `files` parts as `multipart/form-data`.
fn multipart(fields: &[(&str, &str)], files: &[(&str, &[u8])]) -> Request<Body> {
  let mut body = Vec::new();
  for (name, value) in fields {
    body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
      )
      .as_bytes(),
    );
  }
  for (file_name, bytes) in files {
    body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; \
         filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
      )
      .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

  Request::builder()
    .method("POST")
    .uri("/submit-alert")
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={BOUNDARY}"),
    )
    .body(Body::from(body))
    .unwrap()
}

const FIRE_REPORT: &[(&str, &str)] = &[
  ("category", "fire"),
  ("pincode", "12345"),
  ("address", "742 Evergreen Terrace"),
  ("city", "Springfield"),
  ("date", "2024-05-01"),
  ("time", "08:30"),
  ("description", "Smoke from the garage"),
  ("urgency_level", "high"),
  ("latitude", "1.0"),
  ("longitude", "2.0"),
  ("captions", r#"["garage door"]"#),
];

fn new_alert(alert_type: &str, severity: Severity, location: Option<&str>) -> NewAlert {
  NewAlert {
    alert_type:    alert_type.into(),
    severity,
    title:         format!("{alert_type} alert"),
    description:   None,
    latitude:      12.97,
    longitude:     77.59,
    location_name: location.map(str::to_owned),
    radius:        None,
    created_by:    None,
  }
}

// ─── Service info ────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_connected_backends() {
  let (status, body) = send(make_state().await, get("/health")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "healthy");
  assert_eq!(body["database"], "connected");
  assert_eq!(body["models"], json!(["crime", "weather", "fraud"]));
}

#[tokio::test]
async fn health_degrades_when_mirror_is_down() {
  let state = AppState::new(
    SqliteStore::open_in_memory().await.unwrap(),
    DownMirror,
    RiskEngine::empty(),
  );
  let (status, body) = send(state, get("/health")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "degraded");
  assert_eq!(body["realtime"], "unavailable");
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn fire_report_lands_in_both_stores() {
  let state = make_state().await;
  let (status, body) = send(
    state.clone(),
    multipart(FIRE_REPORT, &[("garage.jpg", &b"\xff\xd8\xff"[..])]),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["status"], "active");

  let alert_id = body["postgresql_id"].as_i64().unwrap();
  let alert = state.store.get_alert(alert_id).await.unwrap().unwrap();
  assert_eq!(alert.severity, Severity::Critical);
  assert_eq!(alert.title, "Fire Alert in Springfield");
  assert_eq!((alert.latitude, alert.longitude), (1.0, 2.0));

  let mirror_id = body["firebase_id"].as_str().unwrap();
  let record = state.mirror.get(mirror_id).await.unwrap().unwrap();
  assert_eq!(record["status"], "active");
  assert_eq!(record["severity"], "critical");
  assert_eq!(
    record["files"],
    json!([{ "filename": "garage.jpg", "caption": "garage door" }])
  );
}

#[tokio::test]
async fn frontend_captions_and_verification_reach_the_mirror() {
  let state = make_state().await;
  let fields: Vec<_> = FIRE_REPORT
    .iter()
    .copied()
    .filter(|(k, _)| *k != "captions")
    .chain([("file_captions", r#"["back porch"]"#), ("is_verified", "false")])
    .collect();

  let (status, body) = send(
    state.clone(),
    multipart(&fields, &[("porch.jpg", &b"\xff\xd8\xff"[..])]),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  let mirror_id = body["firebase_id"].as_str().unwrap();
  let record = state.mirror.get(mirror_id).await.unwrap().unwrap();
  assert_eq!(
    record["files"],
    json!([{ "filename": "porch.jpg", "caption": "back porch" }])
  );
  assert_eq!(record["verified"], false);
}

#[tokio::test]
async fn submission_missing_a_field_writes_nothing() {
  let state = make_state().await;
  let fields: Vec<_> =
    FIRE_REPORT.iter().copied().filter(|(k, _)| *k != "city").collect();

  let (status, body) = send(state.clone(), multipart(&fields, &[])).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("city"));
  assert!(state.mirror.is_empty().await);
  let (_, alerts) = send(state, get("/alerts")).await;
  assert_eq!(alerts, json!([]));
}

#[tokio::test]
async fn mirror_outage_queues_and_replays() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let down = AppState::new(store.clone(), DownMirror, RiskEngine::empty());

  let (status, body) = send(down.clone(), multipart(FIRE_REPORT, &[])).await;
  assert_eq!(status, StatusCode::ACCEPTED, "{body}");
  assert_eq!(body["status"], "mirror_pending");
  assert_eq!(body["firebase_id"], Value::Null);
  let alert_id = body["postgresql_id"].as_i64().unwrap();
  assert!(store.get_alert(alert_id).await.unwrap().is_some());

  let (_, pending) = send(down.clone(), get("/admin/mirror/pending")).await;
  assert_eq!(pending["total"], 1);
  assert_eq!(pending["pending"][0]["alert_id"], alert_id);

  // Still down: the entry stays queued with one more attempt.
  let (_, retry) = send(down, json_request("POST", "/admin/mirror/retry", json!({}))).await;
  assert_eq!(retry["remaining"], 1);
  assert_eq!(retry["failed"][0]["attempts"], 2);

  // Back up: the replay lands and the queue drains.
  let up = AppState::new(store, MemoryMirror::new(), RiskEngine::empty());
  let (_, retry) =
    send(up.clone(), json_request("POST", "/admin/mirror/retry", json!({}))).await;
  assert_eq!(retry["remaining"], 0);
  assert_eq!(retry["replayed"][0]["alert_id"], alert_id);
  assert_eq!(up.mirror.len().await, 1);
  let (_, pending) = send(up, get("/admin/mirror/pending")).await;
  assert_eq!(pending["total"], 0);
}

#[tokio::test]
async fn overlapping_retries_mirror_each_entry_once() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let down = AppState::new(store.clone(), DownMirror, RiskEngine::empty());
  let (status, _) = send(down, multipart(FIRE_REPORT, &[])).await;
  assert_eq!(status, StatusCode::ACCEPTED);

  let up = AppState::new(store, SlowMirror::default(), RiskEngine::empty());
  let retry = || json_request("POST", "/admin/mirror/retry", json!({}));
  let ((first_status, first), (second_status, second)) =
    tokio::join!(send(up.clone(), retry()), send(up.clone(), retry()));

  assert_eq!(first_status, StatusCode::OK, "{first}");
  assert_eq!(second_status, StatusCode::OK, "{second}");
  let replayed = |body: &Value| body["replayed"].as_array().unwrap().len();
  assert_eq!(replayed(&first) + replayed(&second), 1);
  assert_eq!(up.mirror.0.len().await, 1);

  let (_, pending) = send(up, get("/admin/mirror/pending")).await;
  assert_eq!(pending["total"], 0);
}

// ─── Durable alerts ──────────────────────────────────────────────────────────

#[tokio::test]
async fn alert_lifecycle_keeps_is_active_in_step() {
  let state = make_state().await;
  let (status, created) = send(
    state.clone(),
    json_request(
      "POST",
      "/alerts",
      json!({
        "alert_type": "flood",
        "severity": "high",
        "title": "River rising",
        "latitude": 1.0,
        "longitude": 2.0,
      }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["status"], "active");
  let uri = format!("/alerts/{}", created["id"]);

  let (status, resolved) =
    send(state.clone(), json_request("PUT", &uri, json!({ "status": "resolved" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(resolved["is_active"], false);
  assert!(resolved["resolved_at"].is_string());

  let (status, _) = send(
    state.clone(),
    json_request("PUT", &uri, json!({ "status": "active", "is_active": false })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (_, active) = send(state, get("/alerts/active")).await;
  assert_eq!(active, json!([]));
}

#[tokio::test]
async fn deleting_missing_records_is_not_found() {
  let state = make_state().await;
  for uri in ["/alerts/999", "/users/999", "/admin/users/999"] {
    let (status, body) = send(state.clone(), delete(uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    assert!(body["error"].is_string());
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_conflicts_and_writes_nothing() {
  let state = make_state().await;
  let user = |username: &str| {
    json!({
      "username": username,
      "email": "asha@example.com",
      "password": "hunter22",
      "role": "police",
    })
  };

  let (status, first) =
    send(state.clone(), json_request("POST", "/admin/users", user("asha"))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["message"], "User created successfully");

  let (status, _) =
    send(state.clone(), json_request("POST", "/admin/users", user("asha2"))).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, listing) = send(state, get("/admin/users")).await;
  assert_eq!(listing["total"], 1);
  assert_eq!(listing["data"][0]["status"], "active");
  assert!(listing["data"][0].get("hashed_password").is_none());
}

#[tokio::test]
async fn user_endpoints_hide_the_password_hash() {
  let state = make_state().await;
  let (status, user) = send(
    state.clone(),
    json_request(
      "POST",
      "/users",
      json!({ "username": "ravi", "email": "ravi@example.com", "password": "pw" }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(user["role"], "user");
  assert!(user.get("hashed_password").is_none());

  let stored = state.store.get_user(user["id"].as_i64().unwrap()).await.unwrap().unwrap();
  assert!(stored.hashed_password.starts_with("$argon2"));
}

// ─── Admin ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_listing_pages_newest_first() {
  let state = make_state().await;
  let mut ids = Vec::new();
  for _ in 0..25 {
    ids.push(state.store.create_alert(new_alert("crime", Severity::High, None)).await.unwrap().id);
  }
  state.store.create_alert(new_alert("crime", Severity::Low, None)).await.unwrap();

  let (status, body) =
    send(state, get("/admin/alerts/all?severity=high&skip=0&limit=10")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["total"], 25);
  assert_eq!(body["page"], 1);
  assert_eq!(body["limit"], 10);

  let returned: Vec<i64> = body["data"]
    .as_array()
    .unwrap()
    .iter()
    .map(|row| row["id"].as_i64().unwrap())
    .collect();
  let newest: Vec<i64> = ids.iter().rev().take(10).copied().collect();
  assert_eq!(returned, newest);
  assert_eq!(body["data"][0]["location"], "Unknown");
}

#[tokio::test]
async fn admin_listing_rejects_bad_filters() {
  let state = make_state().await;
  let (status, _) = send(state.clone(), get("/admin/alerts/all?severity=extreme")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = send(state, get("/admin/alerts/all?limit=0")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_partitions_sum_to_total() {
  let state = make_state().await;
  for (kind, severity) in [
    ("crime", Severity::High),
    ("crime", Severity::Low),
    ("fraud", Severity::High),
    ("flood", Severity::Critical),
  ] {
    state.store.create_alert(new_alert(kind, severity, None)).await.unwrap();
  }

  let (_, stats) = send(state, get("/admin/alerts/stats")).await;
  for key in ["byType", "bySeverity", "byStatus"] {
    let sum: u64 = stats[key]
      .as_array()
      .unwrap()
      .iter()
      .map(|g| g["value"].as_u64().unwrap())
      .sum();
    assert_eq!(sum, 4, "{key}");
  }
  assert_eq!(stats["byType"][0], json!({ "name": "crime", "value": 2 }));
}

#[tokio::test]
async fn overview_buckets_todays_alerts() {
  let state = make_state().await;
  for kind in ["Street Crime", "card fraud", "flash flood", "fire"] {
    state.store.create_alert(new_alert(kind, Severity::Medium, None)).await.unwrap();
  }

  let (_, overview) = send(state, get("/admin/overview")).await;
  assert_eq!(overview["totalAlertsToday"], 4);
  assert_eq!(overview["crimeAlerts"], 1);
  assert_eq!(overview["fraudAlerts"], 1);
  assert_eq!(overview["weatherAlerts"], 1);
  assert_eq!(overview["activeResponders"], 0);
}

#[tokio::test]
async fn insights_surface_hotspots() {
  let state = make_state().await;
  for location in ["MG Road", "MG Road", "Indiranagar"] {
    state
      .store
      .create_alert(new_alert("crime", Severity::High, Some(location)))
      .await
      .unwrap();
  }

  let (_, insights) = send(state, get("/admin/insights")).await;
  assert_eq!(insights["hotspots"][0], json!({ "location": "MG Road", "incidents": 2 }));
  assert_eq!(insights["predictions"]["highRiskAreas"], 2);
  assert_eq!(insights["predictions"]["nextWeekAlerts"], 3);
  assert_eq!(insights["trends"][0]["count"], 3);
}

#[tokio::test]
async fn heatmap_buckets_by_score() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store.create_alert(new_alert("crime", Severity::High, Some("MG Road"))).await.unwrap();
  store.create_alert(new_alert("crime", Severity::High, Some("MG Road"))).await.unwrap();
  let state = AppState::new(store, MemoryMirror::new(), scored_engine(0.8));

  let (_, body) = send(state, get("/admin/map/heatmap")).await;
  assert_eq!(body["total"], 2);
  assert_eq!(body["density"], json!({ "MG Road": 2 }));
  assert_eq!(body["heatmap"][0]["risk_level"], "high");
  assert_eq!(body["heatmap"][0]["color"], "#ef4444");
}

#[tokio::test]
async fn map_markers_cover_active_alerts_only() {
  let state = make_state().await;
  let keep = state.store.create_alert(new_alert("crime", Severity::High, None)).await.unwrap();
  let gone = state.store.create_alert(new_alert("crime", Severity::High, None)).await.unwrap();
  state
    .store
    .update_alert(gone.id, AlertPatch { is_active: Some(false), ..Default::default() })
    .await
    .unwrap();

  let (_, body) = send(state, get("/admin/map/alerts")).await;
  assert_eq!(body["total"], 1);
  assert_eq!(body["alerts"][0]["id"], keep.id);
}

// ─── Risk scoring ────────────────────────────────────────────────────────────

#[tokio::test]
async fn crime_prediction_with_one_feature() {
  let (status, report) = send(
    make_state().await,
    json_request("POST", "/admin/predict/crime", json!({ "prior_incidents": 5 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let score = report["risk_score"].as_f64().unwrap();
  assert!((0.0..=1.0).contains(&score));
  assert_eq!(report["risk_level"], "high");
  assert!(!report["recommendations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_model_is_unavailable_not_an_error() {
  let state = AppState::new(
    SqliteStore::open_in_memory().await.unwrap(),
    MemoryMirror::new(),
    RiskEngine::empty(),
  );
  let (status, report) =
    send(state, json_request("POST", "/admin/predict/crime", json!({}))).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(report["risk_score"], 0.0);
  assert!(report["error"].is_string());
}

#[tokio::test]
async fn unknown_domain_is_not_found() {
  let (status, _) = send(
    make_state().await,
    json_request("POST", "/admin/predict/earthquake", json!({})),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Live mirror ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_alert_crud() {
  let state = make_state().await;
  let (status, body) = send(
    state.clone(),
    json_request("POST", "/firebase/alerts", json!({ "alert_type": "fire", "title": "x" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Missing required field: severity");

  let (status, created) = send(
    state.clone(),
    json_request(
      "POST",
      "/firebase/alerts",
      json!({
        "alert_type": "fire",
        "severity": "high",
        "title": "Warehouse fire",
        "latitude": 1.0,
        "longitude": 2.0,
      }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let uri = format!("/firebase/alerts/{}", created["alert_id"].as_str().unwrap());

  let (status, _) =
    send(state.clone(), json_request("PUT", &uri, json!({ "status": "resolved" }))).await;
  assert_eq!(status, StatusCode::OK);
  let (_, active) = send(state.clone(), get("/firebase/alerts/active")).await;
  assert_eq!(active["alerts"], json!({}));

  let (status, _) = send(state.clone(), delete(&uri)).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = send(state, get(&uri)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
