//! [`RiskEngine`]: turns named inputs into a [`RiskReport`].

use std::{collections::BTreeMap, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
  classifier::{Classifier, LogisticClassifier},
  domain::RiskDomain,
};

// ─── Report types ────────────────────────────────────────────────────────────

/// Probability bucket attached to crime reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
  Low,
  Medium,
  High,
  Critical,
}

impl RiskLevel {
  pub fn from_probability(p: f64) -> Self {
    if p > 0.7 {
      Self::Critical
    } else if p > 0.5 {
      Self::High
    } else if p > 0.3 {
      Self::Medium
    } else {
      Self::Low
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
  pub name:   String,
  pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
  pub domain:          RiskDomain,
  /// Probability of the at-risk class, in `[0, 1]`.
  pub risk_score:      f64,
  /// `risk_score` on a percentage scale.
  pub confidence:      f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub risk_level:      Option<RiskLevel>,
  pub factors:         Vec<Factor>,
  pub recommendations: Vec<String>,
  /// Set when the domain's model is not loaded.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:           Option<String>,
}

impl RiskReport {
  fn unavailable(domain: RiskDomain) -> Self {
    Self {
      domain,
      risk_score: 0.0,
      confidence: 0.0,
      risk_level: None,
      factors: Vec::new(),
      recommendations: Vec::new(),
      error: Some(format!("{domain} model not loaded")),
    }
  }

  pub fn is_available(&self) -> bool { self.error.is_none() }
}

// ─── Heat tiers ──────────────────────────────────────────────────────────────

/// Colour-coded tier used on the heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatTier {
  Low,
  Medium,
  High,
}

impl HeatTier {
  pub fn from_score(score: f64) -> Self {
    if score > 0.7 {
      Self::High
    } else if score > 0.4 {
      Self::Medium
    } else {
      Self::Low
    }
  }

  pub fn color(self) -> &'static str {
    match self {
      Self::High => "#ef4444",
      Self::Medium => "#f97316",
      Self::Low => "#22c55e",
    }
  }
}

/// One area to score for the heatmap.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaInput {
  pub latitude:  f64,
  pub longitude: f64,
  pub area_name: String,
  pub features:  BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRisk {
  pub latitude:   f64,
  pub longitude:  f64,
  pub risk_score: f64,
  pub risk_level: HeatTier,
  pub color:      String,
  pub area_name:  String,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Holds at most one classifier per domain. A domain without one answers
/// every prediction with an unavailable report.
#[derive(Clone, Default)]
pub struct RiskEngine {
  models: BTreeMap<RiskDomain, Arc<dyn Classifier>>,
}

fn round_to(x: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (x * factor).round() / factor
}

impl RiskEngine {
  /// An engine with no models loaded.
  pub fn empty() -> Self { Self::default() }

  pub fn with_classifier(
    mut self,
    domain: RiskDomain,
    classifier: impl Classifier + 'static,
  ) -> Self {
    self.models.insert(domain, Arc::new(classifier));
    self
  }

  /// Load every domain's artifact from `models_dir`.
  ///
  /// Never fails: a missing artifact leaves its domain disabled with a
  /// warning, an invalid one with an error.
  pub fn load(models_dir: &Path) -> Self {
    let mut engine = Self::empty();
    for domain in RiskDomain::ALL {
      let path = models_dir.join(domain.artifact_name());
      if !path.exists() {
        tracing::warn!(%domain, path = %path.display(), "model artifact not found");
        continue;
      }
      match LogisticClassifier::load(domain, &path) {
        Ok(model) => {
          tracing::info!(%domain, "model loaded");
          engine = engine.with_classifier(domain, model);
        }
        Err(e) => tracing::error!(%domain, "model rejected: {e}"),
      }
    }
    engine
  }

  pub fn is_loaded(&self, domain: RiskDomain) -> bool { self.models.contains_key(&domain) }

  /// Domains with a classifier, in schema order.
  pub fn loaded_domains(&self) -> Vec<RiskDomain> { self.models.keys().copied().collect() }

  /// Score `inputs` for `domain`.
  ///
  /// Missing features take their defaults, so this never rejects input.
  pub fn predict(&self, domain: RiskDomain, inputs: &BTreeMap<String, f64>) -> RiskReport {
    let Some(model) = self.models.get(&domain) else {
      return RiskReport::unavailable(domain);
    };

    let raw = model.probability(&domain.assemble(inputs));
    let p = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };

    let factors = domain
      .factor_rules()
      .iter()
      .filter(|rule| inputs.get(rule.feature).is_some_and(|v| *v != 0.0))
      .map(|rule| Factor { name: rule.label.to_owned(), weight: rule.weight })
      .collect();

    RiskReport {
      domain,
      risk_score: round_to(p, 3),
      confidence: round_to(p * 100.0, 1),
      risk_level: (domain == RiskDomain::Crime).then(|| RiskLevel::from_probability(p)),
      factors,
      recommendations: domain
        .recommendations()
        .iter()
        .map(|s| (*s).to_owned())
        .collect(),
      error: None,
    }
  }

  /// Score each area with the crime model and bucket it into a heat tier.
  pub fn score_areas(&self, areas: &[AreaInput]) -> Vec<AreaRisk> {
    areas
      .iter()
      .map(|area| {
        let score = self.predict(RiskDomain::Crime, &area.features).risk_score;
        let tier = HeatTier::from_score(score);
        AreaRisk {
          latitude:   area.latitude,
          longitude:  area.longitude,
          risk_score: score,
          risk_level: tier,
          color:      tier.color().to_owned(),
          area_name:  area.area_name.clone(),
        }
      })
      .collect()
  }
}
