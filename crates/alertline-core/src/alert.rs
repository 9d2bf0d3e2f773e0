//! Durable alerts: the authoritative record of every reported incident.
//!
//! An alert's `status` is canonical; `is_active` is kept in lock-step with it
//! by [`Alert::apply`], the only place lifecycle changes are computed.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// How serious an incident is.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

impl Severity {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
      Self::Critical => "critical",
    }
  }
}

impl FromStr for Severity {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "low" => Ok(Self::Low),
      "medium" => Ok(Self::Medium),
      "high" => Ok(Self::High),
      "critical" => Ok(Self::Critical),
      other => Err(Error::Validation(format!("unknown severity: {other:?}"))),
    }
  }
}

/// Where an alert sits in its lifecycle.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
  #[default]
  Active,
  Resolved,
  Archived,
}

impl AlertStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Resolved => "resolved",
      Self::Archived => "archived",
    }
  }
}

impl FromStr for AlertStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "active" => Ok(Self::Active),
      "resolved" => Ok(Self::Resolved),
      "archived" => Ok(Self::Archived),
      other => Err(Error::Validation(format!("unknown status: {other:?}"))),
    }
  }
}

// ─── Alert ───────────────────────────────────────────────────────────────────

/// A persisted alert. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
  pub id:            i64,
  pub alert_type:    String,
  pub severity:      Severity,
  pub title:         String,
  pub description:   Option<String>,
  pub latitude:      f64,
  pub longitude:     f64,
  pub location_name: Option<String>,
  /// Affected radius in kilometres.
  pub radius:        Option<f64>,
  pub status:        AlertStatus,
  pub is_active:     bool,
  pub created_by:    Option<i64>,
  pub created_at:    DateTime<Utc>,
  pub resolved_at:   Option<DateTime<Utc>>,
}

/// Input to [`crate::store::AlertStore::create_alert`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
  pub alert_type:    String,
  pub severity:      Severity,
  pub title:         String,
  #[serde(default)]
  pub description:   Option<String>,
  pub latitude:      f64,
  pub longitude:     f64,
  #[serde(default)]
  pub location_name: Option<String>,
  #[serde(default)]
  pub radius:        Option<f64>,
  #[serde(default)]
  pub created_by:    Option<i64>,
}

/// Partial update for an alert. `None` leaves a field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPatch {
  #[serde(default)]
  pub status:    Option<AlertStatus>,
  #[serde(default)]
  pub is_active: Option<bool>,
}

impl AlertPatch {
  pub fn is_empty(&self) -> bool {
    self.status.is_none() && self.is_active.is_none()
  }
}

impl Alert {
  /// Apply `patch` in place, keeping `is_active ⇔ status == active`.
  ///
  /// - An explicit `status` wins; an `is_active` that contradicts it in the
  ///   same patch is rejected.
  /// - A lone `is_active = true` reactivates; a lone `is_active = false`
  ///   archives an active alert and leaves a closed one alone.
  /// - Entering `resolved` stamps `resolved_at`; returning to `active` clears it.
  pub fn apply(&mut self, patch: AlertPatch, now: DateTime<Utc>) -> Result<()> {
    let next = match (patch.status, patch.is_active) {
      (Some(status), Some(active)) if active != (status == AlertStatus::Active) => {
        return Err(Error::Validation(format!(
          "is_active={active} contradicts status={}",
          status.as_str()
        )));
      }
      (Some(status), _) => status,
      (None, Some(true)) => AlertStatus::Active,
      (None, Some(false)) if self.status == AlertStatus::Active => {
        AlertStatus::Archived
      }
      (None, _) => self.status,
    };

    match next {
      AlertStatus::Resolved if self.status != AlertStatus::Resolved => {
        self.resolved_at = Some(now);
      }
      AlertStatus::Active => self.resolved_at = None,
      _ => {}
    }

    self.status = next;
    self.is_active = next == AlertStatus::Active;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn alert(status: AlertStatus) -> Alert {
    Alert {
      id:            1,
      alert_type:    "fire".into(),
      severity:      Severity::High,
      title:         "Fire Alert in Springfield".into(),
      description:   None,
      latitude:      1.0,
      longitude:     2.0,
      location_name: None,
      radius:        None,
      status,
      is_active:     status == AlertStatus::Active,
      created_by:    None,
      created_at:    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
      resolved_at:   None,
    }
  }

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() }

  #[test]
  fn resolving_deactivates_and_stamps() {
    let mut a = alert(AlertStatus::Active);
    a.apply(
      AlertPatch { status: Some(AlertStatus::Resolved), is_active: None },
      now(),
    )
    .unwrap();
    assert_eq!(a.status, AlertStatus::Resolved);
    assert!(!a.is_active);
    assert_eq!(a.resolved_at, Some(now()));
  }

  #[test]
  fn resolving_twice_keeps_first_stamp() {
    let mut a = alert(AlertStatus::Resolved);
    let first = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
    a.resolved_at = Some(first);
    a.apply(
      AlertPatch { status: Some(AlertStatus::Resolved), is_active: None },
      now(),
    )
    .unwrap();
    assert_eq!(a.resolved_at, Some(first));
  }

  #[test]
  fn reactivating_clears_resolved_at() {
    let mut a = alert(AlertStatus::Resolved);
    a.resolved_at = Some(now());
    a.apply(AlertPatch { status: None, is_active: Some(true) }, now())
      .unwrap();
    assert_eq!(a.status, AlertStatus::Active);
    assert!(a.is_active);
    assert!(a.resolved_at.is_none());
  }

  #[test]
  fn lone_deactivate_archives_active_alert() {
    let mut a = alert(AlertStatus::Active);
    a.apply(AlertPatch { status: None, is_active: Some(false) }, now())
      .unwrap();
    assert_eq!(a.status, AlertStatus::Archived);
    assert!(!a.is_active);
  }

  #[test]
  fn lone_deactivate_leaves_resolved_alone() {
    let mut a = alert(AlertStatus::Resolved);
    a.apply(AlertPatch { status: None, is_active: Some(false) }, now())
      .unwrap();
    assert_eq!(a.status, AlertStatus::Resolved);
  }

  #[test]
  fn contradicting_patch_is_rejected() {
    let mut a = alert(AlertStatus::Active);
    let err = a
      .apply(
        AlertPatch { status: Some(AlertStatus::Archived), is_active: Some(true) },
        now(),
      )
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(a.status, AlertStatus::Active, "rejected patch must not mutate");
  }
}
