//! The [`Classifier`] seam and the logistic model read from JSON artifacts.
//!
//! Models are trained elsewhere. This crate only evaluates them, so an
//! artifact is a plain description of a fitted logistic regression:
//!
//! ```json
//! {
//!   "features":  ["population_density", "..."],
//!   "weights":   [0.0012, "..."],
//!   "intercept": -1.7,
//!   "mean":      [1000.0, "..."],
//!   "scale":     [250.0, "..."]
//! }
//! ```
//!
//! `mean` and `scale` are the optional standardisation the model was fitted
//! with; they are applied before the weights when present.

use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result, domain::RiskDomain};

/// A fitted binary classifier.
pub trait Classifier: Send + Sync {
  /// Probability of the positive ("at risk") class for one feature vector
  /// laid out in the domain's schema order.
  fn probability(&self, features: &[f64]) -> f64;
}

// ─── Artifact ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
  pub features:  Vec<String>,
  pub weights:   Vec<f64>,
  pub intercept: f64,
  #[serde(default)]
  pub mean:      Option<Vec<f64>>,
  #[serde(default)]
  pub scale:     Option<Vec<f64>>,
}

// ─── LogisticClassifier ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticClassifier {
  weights:   Vec<f64>,
  intercept: f64,
  mean:      Vec<f64>,
  scale:     Vec<f64>,
}

impl LogisticClassifier {
  /// Validate an artifact against `domain`'s schema.
  ///
  /// The artifact's feature names must match the schema exactly, in order;
  /// every per-feature array must have the schema's length.
  pub fn from_artifact(domain: RiskDomain, artifact: ModelArtifact) -> Result<Self> {
    let expected: Vec<&'static str> = domain.features().iter().map(|f| f.name).collect();
    if artifact.features.iter().map(String::as_str).ne(expected.iter().copied()) {
      return Err(Error::SchemaMismatch { domain, expected, found: artifact.features });
    }

    let n = expected.len();
    let check_len = |what: &str, len: usize| -> Result<()> {
      if len == n {
        Ok(())
      } else {
        Err(Error::Shape {
          domain,
          message: format!("{what} has {len} entries, expected {n}"),
        })
      }
    };

    check_len("weights", artifact.weights.len())?;
    let mean = artifact.mean.unwrap_or_else(|| vec![0.0; n]);
    check_len("mean", mean.len())?;
    let scale = artifact.scale.unwrap_or_else(|| vec![1.0; n]);
    check_len("scale", scale.len())?;

    Ok(Self { weights: artifact.weights, intercept: artifact.intercept, mean, scale })
  }

  /// Read and validate the artifact at `path`.
  pub fn load(domain: RiskDomain, path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .map_err(|source| Error::Io { path: path.to_owned(), source })?;
    let artifact: ModelArtifact = serde_json::from_str(&raw)
      .map_err(|source| Error::Json { path: path.to_owned(), source })?;
    Self::from_artifact(domain, artifact)
  }
}

impl Classifier for LogisticClassifier {
  fn probability(&self, features: &[f64]) -> f64 {
    let z = self.intercept
      + features
        .iter()
        .zip(&self.weights)
        .zip(self.mean.iter().zip(&self.scale))
        .map(|((x, w), (m, s))| {
          // A zero scale means the feature was constant during fitting.
          let s = if *s == 0.0 { 1.0 } else { *s };
          w * (x - m) / s
        })
        .sum::<f64>();
    1.0 / (1.0 + (-z).exp())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  fn crime_artifact() -> ModelArtifact {
    ModelArtifact {
      features:  RiskDomain::Crime
        .features()
        .iter()
        .map(|f| f.name.to_owned())
        .collect(),
      weights:   vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
      intercept: 0.0,
      mean:      None,
      scale:     None,
    }
  }

  #[test]
  fn zero_logit_is_even_odds() {
    let model =
      LogisticClassifier::from_artifact(RiskDomain::Crime, crime_artifact()).unwrap();
    let p = model.probability(&RiskDomain::Crime.assemble(&Default::default()));
    assert!((p - 0.5).abs() < 1e-12);
  }

  #[test]
  fn standardisation_is_applied() {
    let mut artifact = crime_artifact();
    artifact.mean = Some(vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
    artifact.scale = Some(vec![1.0, 1.0, 1.0, 0.5, 1.0, 1.0, 1.0, 0.0]);
    let model = LogisticClassifier::from_artifact(RiskDomain::Crime, artifact).unwrap();

    // (4 - 2) / 0.5 = 4
    let mut x = vec![0.0; 8];
    x[3] = 4.0;
    let expected = 1.0 / (1.0 + (-4.0f64).exp());
    assert!((model.probability(&x) - expected).abs() < 1e-12);
  }

  #[test]
  fn reordered_features_are_rejected() {
    let mut artifact = crime_artifact();
    artifact.features.swap(0, 1);
    let err = LogisticClassifier::from_artifact(RiskDomain::Crime, artifact).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { domain: RiskDomain::Crime, .. }));
  }

  #[test]
  fn weight_count_must_match() {
    let mut artifact = crime_artifact();
    artifact.weights.pop();
    let err = LogisticClassifier::from_artifact(RiskDomain::Crime, artifact).unwrap_err();
    assert!(matches!(err, Error::Shape { .. }));
  }

  #[test]
  fn load_reads_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
      file,
      r#"{{
        "features": ["amount", "victim_income", "previous_frauds",
                     "detection_time_hours", "fraud_type_encoded", "channel_encoded"],
        "weights": [0, 0, 0, 0, 0, 0],
        "intercept": 2.0
      }}"#
    )
    .unwrap();

    let model = LogisticClassifier::load(RiskDomain::Fraud, file.path()).unwrap();
    assert!(model.probability(&[0.0; 6]) > 0.88);

    let err = LogisticClassifier::load(RiskDomain::Weather, file.path()).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));
  }
}
