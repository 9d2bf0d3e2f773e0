//! Reference locations (hospitals, shelters, police stations, ...).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub id:            i64,
  pub name:          String,
  pub city:          Option<String>,
  pub state:         Option<String>,
  pub country:       Option<String>,
  pub latitude:      f64,
  pub longitude:     f64,
  /// Free-text category, e.g. `hospital`, `shelter`, `police_station`.
  pub location_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
  pub name:          String,
  #[serde(default)]
  pub city:          Option<String>,
  #[serde(default)]
  pub state:         Option<String>,
  #[serde(default)]
  pub country:       Option<String>,
  pub latitude:      f64,
  pub longitude:     f64,
  #[serde(default)]
  pub location_type: Option<String>,
}
