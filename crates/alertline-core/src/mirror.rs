//! The `AlertMirror` trait: the live, low-latency copy of active alerts.
//!
//! The mirror has its own identity space: ids are opaque strings assigned by
//! the mirror and bear no relation to durable alert ids.

use std::{collections::BTreeMap, future::Future};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// A raw mirror record: whatever keys the producer wrote.
pub type MirrorRecord = serde_json::Map<String, Value>;

/// The status every mirror record carries at creation.
pub const ACTIVE_STATUS: &str = "active";

/// Stamp the mirror-owned fields onto a record about to be created.
pub fn stamp(record: &mut MirrorRecord, id: &str, now: DateTime<Utc>) {
  record.insert("id".into(), Value::String(id.to_owned()));
  record.insert(
    "timestamp".into(),
    Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
  );
  record.insert("status".into(), Value::String(ACTIVE_STATUS.into()));
}

pub fn is_active(record: &MirrorRecord) -> bool {
  record.get("status").and_then(Value::as_str) == Some(ACTIVE_STATUS)
}

/// Abstraction over a live mirror backend.
pub trait AlertMirror: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `record` under a freshly generated id and return that id.
  ///
  /// The stored record gains `id`, `timestamp` and `status = "active"`.
  fn create(
    &self,
    record: MirrorRecord,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  fn get<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<MirrorRecord>, Self::Error>> + Send + 'a;

  fn get_all(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<String, MirrorRecord>, Self::Error>>
  + Send
  + '_;

  /// Shallow-merge `fields` into an existing record. `false` if absent.
  fn update<'a>(
    &'a self,
    id: &'a str,
    fields: MirrorRecord,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Remove a record. `false` if absent.
  fn delete<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Records whose `status` is `active`.
  ///
  /// Filters the full listing client-side, so cost grows with everything the
  /// mirror has ever held.
  fn get_active(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<String, MirrorRecord>, Self::Error>>
  + Send
  + '_ {
    async move {
      let mut all = self.get_all().await?;
      all.retain(|_, record| is_active(record));
      Ok(all)
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;

  #[test]
  fn stamp_sets_mirror_fields() {
    let mut record = MirrorRecord::new();
    record.insert("status".into(), json!("resolved"));
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();

    stamp(&mut record, "abc", now);

    assert_eq!(record["id"], json!("abc"));
    assert_eq!(record["timestamp"], json!("2024-05-01T08:30:00.000000Z"));
    assert!(is_active(&record), "status is forced to active");
  }

  #[test]
  fn records_without_status_are_not_active() {
    assert!(!is_active(&MirrorRecord::new()));
  }
}
