//! Mirror outbox inspection and replay.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/mirror/pending` | Entries awaiting a mirror write |
//! | `POST` | `/admin/mirror/retry` | Replay every entry once, oldest first |
//!
//! Each entry is claimed in the store before it is sent, so overlapping
//! retries never mirror the same alert twice. A claim left behind by a
//! crashed replay expires after [`REPLAY_LEASE`].

use alertline_core::{Error as CoreError, mirror::AlertMirror, store::AlertStore};
use axum::{Json, extract::State};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

/// How long a claimed entry is reserved for the replay that took it.
pub const REPLAY_LEASE: Duration = Duration::minutes(5);

/// `GET /admin/mirror/pending`
pub async fn pending<S, M>(
  State(state): State<AppState<S, M>>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let entries = state.store.pending_mirrors().await.map_err(ApiError::store)?;
  Ok(Json(json!({ "total": entries.len(), "pending": entries })))
}

/// `POST /admin/mirror/retry`
///
/// A successful replay removes the entry; a failed one bumps its attempt
/// count and stays queued. Entries held by a concurrent retry are listed
/// under `skipped`.
pub async fn retry<S, M>(
  State(state): State<AppState<S, M>>,
) -> Result<Json<Value>, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let entries = state.store.pending_mirrors().await.map_err(ApiError::store)?;
  let mut replayed = Vec::new();
  let mut failed = Vec::new();
  let mut skipped = Vec::new();

  for entry in entries {
    let claimed = state
      .store
      .claim_mirror(entry.outbox_id, Utc::now() - REPLAY_LEASE)
      .await
      .map_err(ApiError::store)?;
    if !claimed {
      tracing::debug!(outbox_id = entry.outbox_id, "outbox entry held by another replay");
      skipped.push(entry.outbox_id);
      continue;
    }

    match state.mirror.create(entry.payload.clone()).await {
      Ok(mirror_id) => {
        let resolved = state.store.resolve_mirror(entry.outbox_id).await;
        tolerate_gone(resolved, entry.outbox_id)?;
        tracing::info!(alert_id = entry.alert_id, %mirror_id, "outbox entry replayed");
        replayed.push(json!({ "alert_id": entry.alert_id, "firebase_id": mirror_id }));
      }
      Err(e) => {
        let error = e.to_string();
        let recorded = state
          .store
          .record_mirror_attempt(entry.outbox_id, error.clone())
          .await;
        tolerate_gone(recorded, entry.outbox_id)?;
        tracing::warn!(
          alert_id = entry.alert_id,
          attempts = entry.attempts + 1,
          "outbox replay failed: {error}"
        );
        failed.push(json!({
          "outbox_id": entry.outbox_id,
          "alert_id": entry.alert_id,
          "attempts": entry.attempts + 1,
          "error": error,
        }));
      }
    }
  }

  let remaining = failed.len();
  Ok(Json(json!({
    "replayed": replayed,
    "failed": failed,
    "skipped": skipped,
    "remaining": remaining,
  })))
}

/// An entry removed underneath a replay (its alert was deleted, or it was
/// already resolved) is not an error.
fn tolerate_gone<E: Into<CoreError>>(
  result: Result<(), E>,
  outbox_id: i64,
) -> Result<(), ApiError> {
  match result.map_err(Into::<CoreError>::into) {
    Ok(()) => Ok(()),
    Err(e) if e.is_not_found() => {
      tracing::debug!(outbox_id, "outbox entry already gone");
      Ok(())
    }
    Err(e) => Err(e.into()),
  }
}
