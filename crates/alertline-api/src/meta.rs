//! Service info and health.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/` | Name, version and endpoint map |
//! | `GET`  | `/health` | Probes the store and the mirror; lists loaded models |

use alertline_core::{
  mirror::AlertMirror,
  store::{AlertQuery, AlertStore},
};
use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::AppState;

/// `GET /`
pub async fn root() -> Json<Value> {
  Json(json!({
    "message": "Alertline API is running",
    "version": env!("CARGO_PKG_VERSION"),
    "status": "active",
    "endpoints": {
      "submit": "/submit-alert",
      "alerts": "/alerts",
      "realtime": "/firebase/alerts",
      "users": "/users",
      "locations": "/locations",
      "admin": "/admin/overview",
      "health": "/health",
    },
  }))
}

/// `GET /health`
///
/// Always 200; `status` is `degraded` when either store fails its probe.
pub async fn health<S, M>(State(state): State<AppState<S, M>>) -> Json<Value>
where
  S: AlertStore,
  M: AlertMirror,
{
  let probe = AlertQuery { limit: Some(0), ..Default::default() };
  let database = match state.store.list_alerts(&probe).await {
    Ok(_) => "connected",
    Err(e) => {
      tracing::warn!("store health probe failed: {e}");
      "unavailable"
    }
  };
  let realtime = match state.mirror.get("health-probe").await {
    Ok(_) => "connected",
    Err(e) => {
      tracing::warn!("mirror health probe failed: {e}");
      "unavailable"
    }
  };
  let healthy = database == "connected" && realtime == "connected";

  Json(json!({
    "status": if healthy { "healthy" } else { "degraded" },
    "database": database,
    "realtime": realtime,
    "models": state.risk.loaded_domains(),
  }))
}
