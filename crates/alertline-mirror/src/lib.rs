//! Live alert mirror backends.
//!
//! [`MemoryMirror`] keeps records in-process; [`RestMirror`] talks to a
//! realtime-database REST endpoint. [`Mirror`] wraps either so the server can
//! pick one at startup without becoming generic over the choice.

mod memory;
mod rest;

pub mod error;

use std::collections::BTreeMap;

use alertline_core::mirror::{AlertMirror, MirrorRecord};

pub use error::{Error, Result};
pub use memory::MemoryMirror;
pub use rest::{RestMirror, read_auth_token};

/// A fresh, opaque, URL-safe record id.
fn new_id() -> String { uuid::Uuid::new_v4().simple().to_string() }

// ─── Mirror ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum Mirror {
  Memory(MemoryMirror),
  Rest(RestMirror),
}

impl Mirror {
  /// Short name of the active backend, for logs and health output.
  pub fn backend(&self) -> &'static str {
    match self {
      Self::Memory(_) => "memory",
      Self::Rest(_) => "rest",
    }
  }
}

impl AlertMirror for Mirror {
  type Error = Error;

  async fn create(&self, record: MirrorRecord) -> Result<String> {
    match self {
      Self::Memory(m) => m.create(record).await,
      Self::Rest(m) => m.create(record).await,
    }
  }

  async fn get(&self, id: &str) -> Result<Option<MirrorRecord>> {
    match self {
      Self::Memory(m) => m.get(id).await,
      Self::Rest(m) => m.get(id).await,
    }
  }

  async fn get_all(&self) -> Result<BTreeMap<String, MirrorRecord>> {
    match self {
      Self::Memory(m) => m.get_all().await,
      Self::Rest(m) => m.get_all().await,
    }
  }

  async fn update(&self, id: &str, fields: MirrorRecord) -> Result<bool> {
    match self {
      Self::Memory(m) => m.update(id, fields).await,
      Self::Rest(m) => m.update(id, fields).await,
    }
  }

  async fn delete(&self, id: &str) -> Result<bool> {
    match self {
      Self::Memory(m) => m.delete(id).await,
      Self::Rest(m) => m.delete(id).await,
    }
  }
}
