//! Risk scoring over pre-trained classifiers.
//!
//! [`RiskEngine`] assembles a domain's fixed feature vector from named inputs,
//! asks that domain's [`Classifier`] for a probability, and shapes the answer
//! into a [`RiskReport`]. Models are loaded once from JSON artifacts; a domain
//! whose artifact is missing or invalid stays disabled and reports itself
//! unavailable instead of failing.

mod classifier;
mod domain;
mod engine;

pub mod error;

pub use classifier::{Classifier, LogisticClassifier, ModelArtifact};
pub use domain::{FactorRule, Feature, RiskDomain};
pub use engine::{
  AreaInput, AreaRisk, Factor, HeatTier, RiskEngine, RiskLevel, RiskReport,
};
pub use error::{Error, Result};
