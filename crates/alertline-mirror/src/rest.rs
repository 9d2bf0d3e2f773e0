//! [`RestMirror`]: a mirror backed by a realtime-database REST endpoint.
//!
//! Records live at `{base}/alerts/{id}.json`. The endpoint answers `null` for
//! a path that holds nothing, which is read as "absent".

use std::{collections::BTreeMap, path::Path, time::Duration};

use alertline_core::mirror::{AlertMirror, MirrorRecord, stamp};
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result, new_id};

/// Shape of the credential file. Only the access token is read.
#[derive(Debug, Deserialize)]
struct Credentials {
  #[serde(default)]
  auth_token: Option<String>,
}

/// Read the access token from a JSON credential file.
///
/// A file without an `auth_token` yields `None`: the endpoint is then
/// addressed without authentication.
pub fn read_auth_token(path: &Path) -> Result<Option<String>> {
  let raw = std::fs::read_to_string(path).map_err(|source| Error::Credentials {
    path: path.to_owned(),
    source,
  })?;
  let creds: Credentials = serde_json::from_str(&raw)?;
  Ok(creds.auth_token.filter(|t| !t.is_empty()))
}

/// Keys that address exactly one child of `/alerts`.
///
/// The realtime database refuses `.#$[]/` in a key; `?` and `%` would change
/// the request URL itself. Generated ids are hex, so nothing legitimate is
/// lost.
fn is_valid_key(id: &str) -> bool {
  !id.is_empty()
    && !id.chars().any(|c| {
      matches!(c, '.' | '#' | '$' | '[' | ']' | '/' | '?' | '%')
        || c.is_whitespace()
        || c.is_control()
    })
}

/// Async HTTP client for the mirror's REST surface.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RestMirror {
  client:     Client,
  base_url:   String,
  auth_token: Option<String>,
}

impl RestMirror {
  pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_owned(),
      auth_token,
    })
  }

  fn path(id: Option<&str>) -> String {
    match id {
      Some(id) => format!("/alerts/{id}.json"),
      None => "/alerts.json".to_owned(),
    }
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.auth_token {
      Some(token) => req.query(&[("auth", token)]),
      None => req,
    }
  }

  async fn send(
    &self,
    method: &'static str,
    path: String,
    req: RequestBuilder,
  ) -> Result<Value> {
    let resp = self.auth(req).send().await?;
    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status { method, path, status });
    }
    if status == StatusCode::NO_CONTENT {
      return Ok(Value::Null);
    }
    Ok(resp.json().await?)
  }

  async fn fetch(&self, id: Option<&str>) -> Result<Value> {
    let path = Self::path(id);
    let url = format!("{}{path}", self.base_url);
    self.send("GET", path, self.client.get(url)).await
  }
}

fn into_record(value: Value) -> Result<Option<MirrorRecord>> {
  match value {
    Value::Null => Ok(None),
    Value::Object(map) => Ok(Some(map)),
    other => Err(Error::UnexpectedShape(other.to_string())),
  }
}

impl AlertMirror for RestMirror {
  type Error = Error;

  async fn create(&self, mut record: MirrorRecord) -> Result<String> {
    let id = new_id();
    stamp(&mut record, &id, Utc::now());

    let path = Self::path(Some(&id));
    let url = format!("{}{path}", self.base_url);
    self.send("PUT", path, self.client.put(url).json(&record)).await?;

    tracing::debug!(mirror_id = %id, "mirror record created");
    Ok(id)
  }

  async fn get(&self, id: &str) -> Result<Option<MirrorRecord>> {
    if !is_valid_key(id) {
      return Ok(None);
    }
    into_record(self.fetch(Some(id)).await?)
  }

  async fn get_all(&self) -> Result<BTreeMap<String, MirrorRecord>> {
    let Some(all) = into_record(self.fetch(None).await?)? else {
      return Ok(BTreeMap::new());
    };
    Ok(
      all
        .into_iter()
        .filter_map(|(id, value)| match value {
          Value::Object(record) => Some((id, record)),
          _ => None,
        })
        .collect(),
    )
  }

  async fn update(&self, id: &str, fields: MirrorRecord) -> Result<bool> {
    // PATCH on an absent path would create it; check first.
    if self.get(id).await?.is_none() {
      return Ok(false);
    }
    let path = Self::path(Some(id));
    let url = format!("{}{path}", self.base_url);
    self.send("PATCH", path, self.client.patch(url).json(&fields)).await?;
    Ok(true)
  }

  async fn delete(&self, id: &str) -> Result<bool> {
    if self.get(id).await?.is_none() {
      return Ok(false);
    }
    let path = Self::path(Some(id));
    let url = format!("{}{path}", self.base_url);
    self.send("DELETE", path, self.client.delete(url)).await?;
    Ok(true)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashMap,
    io::Write as _,
    sync::{Arc, Mutex},
  };

  use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
  };
  use serde_json::json;

  use super::*;

  // ─── In-process realtime database ──────────────────────────────────────────

  /// One request as the fake endpoint saw it.
  #[derive(Debug, Clone, PartialEq)]
  struct Seen {
    method: Method,
    path:   String,
    auth:   Option<String>,
  }

  /// Holds `/alerts` children in memory and answers the REST surface the
  /// mirror uses. `fail_with` makes every request answer that status.
  #[derive(Clone, Default)]
  struct FakeDb {
    alerts:    Arc<Mutex<BTreeMap<String, Value>>>,
    seen:      Arc<Mutex<Vec<Seen>>>,
    fail_with: Option<StatusCode>,
  }

  impl FakeDb {
    fn requests(&self) -> Vec<Seen> { self.seen.lock().unwrap().clone() }

    fn stored(&self, id: &str) -> Option<Value> { self.alerts.lock().unwrap().get(id).cloned() }
  }

  async fn handle(
    State(db): State<FakeDb>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
  ) -> Response {
    let path = uri.path().to_owned();
    db.seen.lock().unwrap().push(Seen {
      method: method.clone(),
      path:   path.clone(),
      auth:   query.get("auth").cloned(),
    });
    if let Some(status) = db.fail_with {
      return (status, Json(json!({ "error": "Permission denied" }))).into_response();
    }

    let mut alerts = db.alerts.lock().unwrap();
    if path == "/alerts.json" {
      let all: serde_json::Map<_, _> =
        alerts.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
      let body = if all.is_empty() { Value::Null } else { Value::Object(all) };
      return Json(body).into_response();
    }

    let Some(id) = path.strip_prefix("/alerts/").and_then(|p| p.strip_suffix(".json")) else {
      return StatusCode::NOT_FOUND.into_response();
    };
    let sent: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let reply = match method {
      Method::GET => alerts.get(id).cloned().unwrap_or(Value::Null),
      Method::PUT => {
        alerts.insert(id.to_owned(), sent.clone());
        sent
      }
      Method::PATCH => {
        let entry = alerts.entry(id.to_owned()).or_insert_with(|| json!({}));
        if let (Value::Object(existing), Value::Object(fields)) = (entry, &sent) {
          existing.extend(fields.clone());
        }
        sent
      }
      Method::DELETE => {
        alerts.remove(id);
        Value::Null
      }
      _ => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };
    Json(reply).into_response()
  }

  /// Serve `db` on an ephemeral local port and return its base URL.
  async fn serve(db: FakeDb) -> String {
    let app = Router::new().fallback(handle).with_state(db);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
  }

  fn record(value: Value) -> MirrorRecord {
    match value {
      Value::Object(map) => map,
      other => panic!("not an object: {other}"),
    }
  }

  #[tokio::test]
  async fn create_puts_a_stamped_record_under_its_id() {
    let db = FakeDb::default();
    let mirror = RestMirror::new(serve(db.clone()).await, None).unwrap();

    let id = mirror.create(record(json!({ "title": "Fire" }))).await.unwrap();

    let requests = db.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::PUT);
    assert_eq!(requests[0].path, format!("/alerts/{id}.json"));
    assert_eq!(requests[0].auth, None);

    let stored = db.stored(&id).unwrap();
    assert_eq!(stored["id"], json!(id));
    assert_eq!(stored["status"], "active");
    assert_eq!(stored["title"], "Fire");
    assert!(stored["timestamp"].is_string());

    assert_eq!(mirror.get(&id).await.unwrap(), Some(record(stored)));
    let all = mirror.get_all().await.unwrap();
    assert_eq!(all.keys().collect::<Vec<_>>(), vec![&id]);
  }

  #[tokio::test]
  async fn auth_token_rides_on_every_request() {
    let db = FakeDb::default();
    let mirror = RestMirror::new(serve(db.clone()).await, Some("s3cret".into())).unwrap();

    let id = mirror.create(record(json!({ "title": "Flood" }))).await.unwrap();
    assert!(mirror.update(&id, record(json!({ "status": "resolved" }))).await.unwrap());

    let requests = db.requests();
    assert_eq!(requests.len(), 3, "create, existence check, patch");
    assert!(requests.iter().all(|r| r.auth.as_deref() == Some("s3cret")));
    assert_eq!(db.stored(&id).unwrap()["status"], "resolved");
    assert_eq!(db.stored(&id).unwrap()["title"], "Flood");
  }

  #[tokio::test]
  async fn absent_records_are_never_written() {
    let db = FakeDb::default();
    let mirror = RestMirror::new(serve(db.clone()).await, None).unwrap();

    assert_eq!(mirror.get("missing").await.unwrap(), None);
    assert!(mirror.get_all().await.unwrap().is_empty());
    assert!(!mirror.update("missing", record(json!({ "status": "x" }))).await.unwrap());
    assert!(!mirror.delete("missing").await.unwrap());

    assert!(db.requests().iter().all(|r| r.method == Method::GET));
    assert!(db.alerts.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn delete_removes_an_existing_record() {
    let db = FakeDb::default();
    let mirror = RestMirror::new(serve(db.clone()).await, None).unwrap();
    let id = mirror.create(record(json!({ "title": "Storm" }))).await.unwrap();

    assert!(mirror.delete(&id).await.unwrap());
    assert_eq!(db.stored(&id), None);
    assert_eq!(db.requests().last().unwrap().method, Method::DELETE);
  }

  #[tokio::test]
  async fn keys_that_would_escape_the_path_send_nothing() {
    let db = FakeDb::default();
    let mirror = RestMirror::new(serve(db.clone()).await, None).unwrap();

    for id in ["a?b", "a%2Fb", "a b", "../alerts"] {
      assert_eq!(mirror.get(id).await.unwrap(), None, "{id}");
      assert!(!mirror.delete(id).await.unwrap(), "{id}");
    }
    assert!(db.requests().is_empty());
  }

  #[tokio::test]
  async fn error_status_is_reported_with_method_and_path() {
    let db = FakeDb { fail_with: Some(StatusCode::UNAUTHORIZED), ..Default::default() };
    let mirror = RestMirror::new(serve(db.clone()).await, Some("stale".into())).unwrap();

    let err = mirror.create(record(json!({ "title": "Fire" }))).await.unwrap_err();
    assert!(
      matches!(&err, Error::Status { method: "PUT", status, .. } if *status == StatusCode::UNAUTHORIZED),
      "{err}"
    );

    let err = mirror.get("abc").await.unwrap_err();
    assert!(
      matches!(&err, Error::Status { method: "GET", path, .. } if path == "/alerts/abc.json"),
      "{err}"
    );
  }

  #[tokio::test]
  async fn non_object_child_is_an_unexpected_shape() {
    let db = FakeDb::default();
    db.alerts.lock().unwrap().insert("n".into(), json!(7));
    let mirror = RestMirror::new(serve(db.clone()).await, None).unwrap();

    assert!(matches!(mirror.get("n").await, Err(Error::UnexpectedShape(_))));
    assert!(mirror.get_all().await.unwrap().is_empty(), "scalars are skipped in listings");
  }

  // ─── Keys, paths and credentials ───────────────────────────────────────────

  #[test]
  fn keys_with_path_characters_are_invalid() {
    assert!(is_valid_key("3f2a9c1e0b7d4e6a8c5b2d1f0e9a8b7c"));
    assert!(!is_valid_key(""));
    assert!(!is_valid_key("../alerts"));
    assert!(!is_valid_key("a.b"));
    assert!(!is_valid_key("x[0]"));
    assert!(!is_valid_key("a?b"));
    assert!(!is_valid_key("a%2Fb"));
    assert!(!is_valid_key("a b"));
    assert!(!is_valid_key("a\nb"));
  }

  #[test]
  fn paths_address_the_alerts_node() {
    assert_eq!(RestMirror::path(None), "/alerts.json");
    assert_eq!(RestMirror::path(Some("abc")), "/alerts/abc.json");
  }

  #[test]
  fn base_url_trailing_slash_is_trimmed() {
    let mirror = RestMirror::new("https://rtdb.example.com/", None).unwrap();
    assert_eq!(mirror.base_url, "https://rtdb.example.com");
  }

  #[test]
  fn null_is_absent_and_scalars_are_rejected() {
    assert!(into_record(Value::Null).unwrap().is_none());
    let record = into_record(json!({ "status": "active" })).unwrap().unwrap();
    assert_eq!(record["status"], json!("active"));
    assert!(matches!(into_record(json!(3)), Err(Error::UnexpectedShape(_))));
  }

  #[test]
  fn credential_file_token() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "auth_token": "s3cret", "project_id": "demo" }}"#).unwrap();
    assert_eq!(read_auth_token(file.path()).unwrap().as_deref(), Some("s3cret"));

    let mut empty = tempfile::NamedTempFile::new().unwrap();
    write!(empty, "{{}}").unwrap();
    assert_eq!(read_auth_token(empty.path()).unwrap(), None);
  }

  #[test]
  fn missing_credential_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_auth_token(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::Credentials { .. }));
  }
}
