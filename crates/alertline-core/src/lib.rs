//! Core types and trait definitions for the Alertline incident platform.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! durable store, the live mirror and the API layer all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod alert;
pub mod error;
pub mod location;
pub mod mirror;
pub mod store;
pub mod submission;
pub mod user;

pub use error::{Error, Result};
