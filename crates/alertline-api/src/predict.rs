//! `POST /admin/predict/{crime|weather|fraud}`: the risk scoring façade.
//!
//! The body is a flat JSON object of feature values. Missing features take
//! the domain defaults. A domain whose model is not loaded answers 503 with
//! the zero-score report as the body.

use std::collections::BTreeMap;

use alertline_core::{mirror::AlertMirror, store::AlertStore};
use alertline_risk::RiskDomain;
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

use crate::{AppState, error::ApiError};

/// Read numeric feature values. Booleans count as `1`/`0`; `null` is the same
/// as leaving the feature out.
fn feature_values(body: Map<String, Value>) -> Result<BTreeMap<String, f64>, ApiError> {
  let mut out = BTreeMap::new();
  for (name, value) in body {
    let number = match &value {
      Value::Null => continue,
      Value::Bool(b) => f64::from(u8::from(*b)),
      Value::Number(n) => n.as_f64().ok_or_else(|| {
        ApiError::BadRequest(format!("feature {name} is out of range"))
      })?,
      _ => return Err(ApiError::BadRequest(format!("feature {name} must be a number"))),
    };
    out.insert(name, number);
  }
  Ok(out)
}

/// `POST /admin/predict/{domain}`
pub async fn handler<S, M>(
  State(state): State<AppState<S, M>>,
  Path(domain): Path<String>,
  Json(body): Json<Map<String, Value>>,
) -> Result<Response, ApiError>
where
  S: AlertStore,
  M: AlertMirror,
{
  let domain: RiskDomain = domain
    .parse()
    .map_err(|_| ApiError::NotFound(format!("no risk model for {domain:?}")))?;
  let report = state.risk.predict(domain, &feature_values(body)?);

  let status = if report.is_available() {
    StatusCode::OK
  } else {
    StatusCode::SERVICE_UNAVAILABLE
  };
  Ok((status, Json(report)).into_response())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn object(v: Value) -> Map<String, Value> {
    match v {
      Value::Object(m) => m,
      _ => unreachable!(),
    }
  }

  #[test]
  fn numbers_and_flags_are_read() {
    let values = feature_values(object(json!({
      "prior_incidents": 5,
      "is_night": true,
      "location_risk": null,
    })))
    .unwrap();
    assert_eq!(values.get("prior_incidents"), Some(&5.0));
    assert_eq!(values.get("is_night"), Some(&1.0));
    assert!(!values.contains_key("location_risk"));
  }

  #[test]
  fn text_values_are_rejected() {
    let err = feature_values(object(json!({ "amount": "lots" }))).unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(m) if m.contains("amount")));
  }
}
