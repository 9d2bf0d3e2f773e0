//! [`MemoryMirror`]: an in-process mirror held in a `BTreeMap`.
//!
//! Used when no remote mirror is configured, and in tests. Contents are lost
//! when the process exits.

use std::{collections::BTreeMap, sync::Arc};

use alertline_core::mirror::{AlertMirror, MirrorRecord, stamp};
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{Result, new_id};

#[derive(Clone, Default)]
pub struct MemoryMirror {
  records: Arc<RwLock<BTreeMap<String, MirrorRecord>>>,
}

impl MemoryMirror {
  pub fn new() -> Self { Self::default() }

  /// Number of records held, active or not.
  pub async fn len(&self) -> usize { self.records.read().await.len() }

  pub async fn is_empty(&self) -> bool { self.records.read().await.is_empty() }
}

impl AlertMirror for MemoryMirror {
  type Error = crate::Error;

  async fn create(&self, mut record: MirrorRecord) -> Result<String> {
    let id = new_id();
    stamp(&mut record, &id, Utc::now());
    self.records.write().await.insert(id.clone(), record);
    Ok(id)
  }

  async fn get(&self, id: &str) -> Result<Option<MirrorRecord>> {
    Ok(self.records.read().await.get(id).cloned())
  }

  async fn get_all(&self) -> Result<BTreeMap<String, MirrorRecord>> {
    Ok(self.records.read().await.clone())
  }

  async fn update(&self, id: &str, fields: MirrorRecord) -> Result<bool> {
    let mut records = self.records.write().await;
    let Some(record) = records.get_mut(id) else {
      return Ok(false);
    };
    record.extend(fields);
    Ok(true)
  }

  async fn delete(&self, id: &str) -> Result<bool> {
    Ok(self.records.write().await.remove(id).is_some())
  }
}
