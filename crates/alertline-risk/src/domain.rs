//! Risk domains and their fixed feature schemas.
//!
//! Each domain scores a feature vector of fixed length and order. Inputs are
//! matched by name; anything not supplied takes the schema default.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskDomain {
  Crime,
  Weather,
  Fraud,
}

/// One slot of a domain's feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
  pub name:    &'static str,
  pub default: f64,
}

/// A feature that, when supplied with a non-zero value, is reported as a
/// contributing factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorRule {
  pub feature: &'static str,
  pub label:   &'static str,
  pub weight:  f64,
}

const fn feature(name: &'static str, default: f64) -> Feature { Feature { name, default } }

const fn factor(feature: &'static str, label: &'static str, weight: f64) -> FactorRule {
  FactorRule { feature, label, weight }
}

// ── Crime ─────────────────────────────────────────────────────────────────

const CRIME_FEATURES: [Feature; 8] = [
  feature("population_density", 1000.0),
  feature("unemployment_rate", 5.0),
  feature("income_level", 50000.0),
  feature("prior_incidents", 0.0),
  feature("location_risk", 0.5),
  feature("economic_stress", 0.5),
  feature("is_night", 0.0),
  feature("is_weekend", 0.0),
];

const CRIME_FACTORS: [FactorRule; 5] = [
  factor("population_density", "Population Density", 0.2),
  factor("unemployment_rate", "Unemployment Rate", 0.15),
  factor("prior_incidents", "Prior Incidents", 0.3),
  factor("economic_stress", "Economic Stress", 0.2),
  factor("location_risk", "Location Risk", 0.15),
];

const CRIME_RECOMMENDATIONS: [&str; 4] = [
  "Increase community policing in high-risk areas",
  "Implement neighborhood watch programs",
  "Improve street lighting in vulnerable locations",
  "Deploy mobile surveillance units during peak hours",
];

// ── Weather ───────────────────────────────────────────────────────────────

const WEATHER_FEATURES: [Feature; 11] = [
  feature("temperature", 25.0),
  feature("precipitation", 0.0),
  feature("wind_speed", 10.0),
  feature("humidity", 60.0),
  feature("weather_encoded", 0.0),
  feature("hour", 12.0),
  feature("month", 6.0),
  feature("pressure", 1013.25),
  feature("visibility", 10.0),
  feature("wind_direction", 180.0),
  feature("cloud_cover", 50.0),
];

const WEATHER_FACTORS: [FactorRule; 5] = [
  factor("temperature", "Temperature", 0.2),
  factor("precipitation", "Precipitation", 0.2),
  factor("wind_speed", "Wind Speed", 0.3),
  factor("humidity", "Humidity", 0.15),
  factor("hour", "Time of Day", 0.15),
];

const WEATHER_RECOMMENDATIONS: [&str; 4] = [
  "Monitor severe weather alerts",
  "Prepare emergency evacuation routes",
  "Ensure proper drainage systems",
  "Stock emergency supplies",
];

// ── Fraud ─────────────────────────────────────────────────────────────────

const FRAUD_FEATURES: [Feature; 6] = [
  feature("amount", 1000.0),
  feature("victim_income", 50000.0),
  feature("previous_frauds", 0.0),
  feature("detection_time_hours", 24.0),
  feature("fraud_type_encoded", 0.0),
  feature("channel_encoded", 0.0),
];

const FRAUD_FACTORS: [FactorRule; 5] = [
  factor("amount", "Transaction Amount", 0.25),
  factor("victim_income", "Victim Income Level", 0.15),
  factor("previous_frauds", "Previous Fraud History", 0.3),
  factor("detection_time_hours", "Detection Time", 0.15),
  factor("channel_encoded", "Channel Risk", 0.15),
];

const FRAUD_RECOMMENDATIONS: [&str; 4] = [
  "Implement additional verification steps",
  "Monitor transaction patterns",
  "Set up fraud alerts and notifications",
  "Educate users about common fraud schemes",
];

// ─── RiskDomain ──────────────────────────────────────────────────────────────

impl RiskDomain {
  pub const ALL: [RiskDomain; 3] = [Self::Crime, Self::Weather, Self::Fraud];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Crime => "crime",
      Self::Weather => "weather",
      Self::Fraud => "fraud",
    }
  }

  /// The ordered feature vector the domain's classifier consumes.
  pub fn features(self) -> &'static [Feature] {
    match self {
      Self::Crime => &CRIME_FEATURES,
      Self::Weather => &WEATHER_FEATURES,
      Self::Fraud => &FRAUD_FEATURES,
    }
  }

  pub fn factor_rules(self) -> &'static [FactorRule] {
    match self {
      Self::Crime => &CRIME_FACTORS,
      Self::Weather => &WEATHER_FACTORS,
      Self::Fraud => &FRAUD_FACTORS,
    }
  }

  pub fn recommendations(self) -> &'static [&'static str] {
    match self {
      Self::Crime => &CRIME_RECOMMENDATIONS,
      Self::Weather => &WEATHER_RECOMMENDATIONS,
      Self::Fraud => &FRAUD_RECOMMENDATIONS,
    }
  }

  /// File name of the model artifact inside the models directory.
  pub fn artifact_name(self) -> String { format!("{}_risk_model.json", self.as_str()) }

  /// Build the classifier input from named values. Unknown names are ignored;
  /// missing ones take their default.
  pub fn assemble(self, inputs: &BTreeMap<String, f64>) -> Vec<f64> {
    self
      .features()
      .iter()
      .map(|f| inputs.get(f.name).copied().unwrap_or(f.default))
      .collect()
  }
}

impl fmt::Display for RiskDomain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for RiskDomain {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "crime" => Ok(Self::Crime),
      "weather" => Ok(Self::Weather),
      "fraud" => Ok(Self::Fraud),
      other => Err(Error::UnknownDomain(other.to_owned())),
    }
  }
}
