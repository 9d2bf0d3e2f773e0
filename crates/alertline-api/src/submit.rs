//! `POST /submit-alert`: the citizen report pipeline.
//!
//! The durable write always happens first. If it fails nothing is mirrored.
//! If it succeeds and the mirror write then fails, the payload goes to the
//! store's mirror outbox and the caller gets a 202 that says so, with the
//! durable id, instead of a bare 500.

use std::collections::HashMap;

use alertline_core::{
  mirror::AlertMirror,
  store::AlertStore,
  submission::IncidentReport,
};
use axum::{
  Json,
  extract::{Multipart, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::{AppState, error::ApiError};

/// Form part carrying uploaded files.
const FILES_FIELD: &str = "files";

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// How far a submission got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
  /// Both writes succeeded.
  Complete { alert_id: i64, mirror_id: String },
  /// The durable write committed; the mirror write failed and was queued.
  MirrorPending { alert_id: i64, outbox_id: i64, error: String },
}

/// Persist `report` durably, then mirror it.
pub async fn submit<S, M>(
  store: &S,
  mirror: &M,
  report: &IncidentReport,
) -> Result<SubmissionOutcome, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let alert = store
    .create_alert(report.to_new_alert())
    .await
    .map_err(ApiError::store)?;

  let payload = report.to_mirror_payload();
  match mirror.create(payload.clone()).await {
    Ok(mirror_id) => {
      tracing::info!(alert_id = alert.id, %mirror_id, "alert submitted");
      Ok(SubmissionOutcome::Complete { alert_id: alert.id, mirror_id })
    }
    Err(e) => {
      let error = e.to_string();
      tracing::warn!(alert_id = alert.id, "mirror write failed, queueing: {error}");
      let pending = store
        .enqueue_mirror(alert.id, payload, error.clone())
        .await
        .map_err(|e| {
          tracing::error!(alert_id = alert.id, "alert committed but not queued for mirroring");
          ApiError::store(e)
        })?;
      Ok(SubmissionOutcome::MirrorPending {
        alert_id: alert.id,
        outbox_id: pending.outbox_id,
        error,
      })
    }
  }
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// Drain a multipart body into text fields and uploaded file names.
///
/// File bodies are read and discarded; only their names are kept.
async fn read_form(
  mut multipart: Multipart,
) -> Result<(HashMap<String, String>, Vec<String>), ApiError> {
  let mut fields = HashMap::new();
  let mut filenames = Vec::new();

  while let Some(field) = multipart.next_field().await? {
    let name = field.name().unwrap_or_default().to_owned();
    let file_name = field.file_name().map(str::to_owned);

    match file_name {
      Some(file_name) => {
        field.bytes().await?;
        // Browsers send an empty, nameless part when no file was picked.
        if !file_name.is_empty() {
          filenames.push(file_name);
        }
      }
      None if name == FILES_FIELD => {
        field.bytes().await?;
      }
      None => {
        let value = field.text().await?;
        fields.insert(name, value);
      }
    }
  }

  Ok((fields, filenames))
}

/// `POST /submit-alert`: multipart form, see [`IncidentReport::from_fields`].
pub async fn handler<S, M>(
  State(state): State<AppState<S, M>>,
  multipart: Multipart,
) -> Result<Response, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let (fields, filenames) = read_form(multipart).await?;
  let report = IncidentReport::from_fields(&fields, filenames)?;
  let outcome = submit(state.store.as_ref(), state.mirror.as_ref(), &report).await?;
  let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

  let response = match outcome {
    SubmissionOutcome::Complete { alert_id, mirror_id } => (
      StatusCode::OK,
      Json(json!({
        "message": "Alert submitted successfully",
        "postgresql_id": alert_id,
        "firebase_id": mirror_id,
        "status": "active",
        "timestamp": timestamp,
      })),
    ),
    SubmissionOutcome::MirrorPending { alert_id, outbox_id, error } => (
      StatusCode::ACCEPTED,
      Json(json!({
        "message": "Alert stored; live mirror update pending",
        "postgresql_id": alert_id,
        "firebase_id": null,
        "status": "mirror_pending",
        "outbox_id": outbox_id,
        "error": error,
        "timestamp": timestamp,
      })),
    ),
  };
  Ok(response.into_response())
}
