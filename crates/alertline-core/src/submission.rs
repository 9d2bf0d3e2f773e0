//! Normalisation of a citizen's incident report.
//!
//! Turns the loosely-typed form fields of a submission into the durable
//! [`NewAlert`] and the live-mirror payload. Nothing here touches a store;
//! the write ordering lives in the API layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
  Error, Result,
  alert::{NewAlert, Severity},
  mirror::MirrorRecord,
};

/// Form fields that must be present and non-blank.
pub const REQUIRED_FIELDS: [&str; 8] = [
  "category",
  "pincode",
  "address",
  "city",
  "date",
  "time",
  "description",
  "urgency_level",
];

/// Form names for the caption list, current name first.
const CAPTION_FIELDS: [&str; 2] = ["file_captions", "captions"];

/// Form names for the verification flag, current name first.
const VERIFIED_FIELDS: [&str; 2] = ["is_verified", "verified"];

/// The category value that defers to `other_category`.
const OTHER_CATEGORY: &str = "other";

// ─── Report ──────────────────────────────────────────────────────────────────

/// A validated incident report.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentReport {
  pub category:       String,
  pub other_category: Option<String>,
  pub pincode:        String,
  pub address:        String,
  pub city:           String,
  pub date:           String,
  pub time:           String,
  pub description:    String,
  pub urgency_level:  String,
  pub latitude:       f64,
  pub longitude:      f64,
  pub verified:       bool,
  pub attachments:    Vec<Attachment>,
}

/// Metadata for one uploaded file. The file body is not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub filename: String,
  pub caption:  String,
}

impl IncidentReport {
  /// Build a report from raw form fields and the uploaded file names.
  ///
  /// `file_captions` (or `captions`), if present, is a JSON array of strings
  /// paired positionally with `filenames`; surplus captions are dropped and a
  /// malformed value is treated as no captions at all. Coordinates must be
  /// finite numbers.
  pub fn from_fields(
    fields: &HashMap<String, String>,
    filenames: Vec<String>,
  ) -> Result<Self> {
    let required = |name: &str| -> Result<String> {
      fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| Error::Validation(format!("missing required field: {name}")))
    };
    let coordinate = |name: &str| -> Result<f64> {
      let Some(raw) = fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
      else {
        return Ok(0.0);
      };
      match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::Validation(format!("{name} is not a finite number: {raw:?}"))),
      }
    };
    let first_of = |names: &[&str]| names.iter().find_map(|name| fields.get(*name));

    let captions = first_of(&CAPTION_FIELDS)
      .map(|raw| parse_captions(raw))
      .unwrap_or_default();
    let attachments = filenames
      .into_iter()
      .enumerate()
      .map(|(i, filename)| Attachment {
        filename,
        caption: captions.get(i).cloned().unwrap_or_default(),
      })
      .collect();

    Ok(Self {
      category:       required("category")?,
      other_category: fields
        .get("other_category")
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty()),
      pincode:        required("pincode")?,
      address:        required("address")?,
      city:           required("city")?,
      date:           required("date")?,
      time:           required("time")?,
      description:    required("description")?,
      urgency_level:  required("urgency_level")?,
      latitude:       coordinate("latitude")?,
      longitude:      coordinate("longitude")?,
      verified:       first_of(&VERIFIED_FIELDS)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(true),
      attachments,
    })
  }

  /// The alert type: `other_category` when the category is `other` and an
  /// override was given, otherwise the category itself.
  pub fn alert_type(&self) -> &str {
    match &self.other_category {
      Some(other) if self.category == OTHER_CATEGORY => other,
      _ => &self.category,
    }
  }

  pub fn severity(&self) -> Severity { severity_for_urgency(&self.urgency_level) }

  pub fn title(&self) -> String {
    format!("{} Alert in {}", title_case(&self.category), self.city)
  }

  pub fn location_name(&self) -> String { format!("{}, {}", self.address, self.city) }

  /// The durable record for this report.
  pub fn to_new_alert(&self) -> NewAlert {
    NewAlert {
      alert_type:    self.alert_type().to_owned(),
      severity:      self.severity(),
      title:         self.title(),
      description:   Some(self.description.clone()),
      latitude:      self.latitude,
      longitude:     self.longitude,
      location_name: Some(self.location_name()),
      radius:        None,
      created_by:    None,
    }
  }

  /// The full submission payload written to the live mirror.
  pub fn to_mirror_payload(&self) -> MirrorRecord {
    let value = json!({
      "alert_type":    self.alert_type(),
      "severity":      self.severity(),
      "title":         self.title(),
      "description":   self.description,
      "latitude":      self.latitude,
      "longitude":     self.longitude,
      "location_name": self.location_name(),
      "pincode":       self.pincode,
      "incident_date": self.date,
      "incident_time": self.time,
      "urgency_level": self.urgency_level,
      "files":         self.attachments,
      "verified":      self.verified,
    });
    match value {
      Value::Object(map) => map,
      _ => MirrorRecord::new(),
    }
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Map a reporter's urgency level onto an alert severity.
///
/// `high` urgency escalates straight to `critical`; unknown levels are
/// `medium`.
pub fn severity_for_urgency(urgency: &str) -> Severity {
  match urgency.trim().to_lowercase().as_str() {
    "low" => Severity::Low,
    "medium" => Severity::Medium,
    "high" => Severity::Critical,
    _ => Severity::Medium,
  }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut in_word = false;
  for c in s.chars() {
    if c.is_alphabetic() {
      if in_word {
        out.extend(c.to_lowercase());
      } else {
        out.extend(c.to_uppercase());
      }
      in_word = true;
    } else {
      out.push(c);
      in_word = false;
    }
  }
  out
}

/// Parse a JSON array of caption strings; anything else yields no captions.
pub fn parse_captions(raw: &str) -> Vec<String> {
  match serde_json::from_str::<Vec<String>>(raw) {
    Ok(captions) => captions,
    Err(e) => {
      tracing::debug!("ignoring malformed captions: {e}");
      Vec::new()
    }
  }
}
