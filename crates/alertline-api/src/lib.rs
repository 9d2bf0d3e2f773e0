//! JSON REST API for Alertline.
//!
//! Exposes an axum [`Router`] backed by any [`AlertStore`] and
//! [`AlertMirror`]. TLS, CORS, tracing and body limits are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = alertline_api::api_router(state).layer(TraceLayer::new_for_http());
//! ```

pub mod admin;
pub mod alerts;
pub mod error;
pub mod live;
pub mod locations;
pub mod meta;
pub mod outbox;
pub mod password;
pub mod predict;
pub mod submit;
pub mod users;

use std::sync::Arc;

use alertline_core::{mirror::AlertMirror, store::AlertStore};
use alertline_risk::RiskEngine;
use axum::{
  Router,
  routing::{get, post, put},
};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Long-lived handles shared by every handler. Built once at startup.
pub struct AppState<S, M> {
  pub store:  Arc<S>,
  pub mirror: Arc<M>,
  pub risk:   Arc<RiskEngine>,
}

impl<S, M> AppState<S, M> {
  pub fn new(store: S, mirror: M, risk: RiskEngine) -> Self {
    Self {
      store:  Arc::new(store),
      mirror: Arc::new(mirror),
      risk:   Arc::new(risk),
    }
  }
}

// Derived `Clone` would demand `S: Clone` and `M: Clone`.
impl<S, M> Clone for AppState<S, M> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      mirror: Arc::clone(&self.mirror),
      risk:   Arc::clone(&self.risk),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn api_router<S, M>(state: AppState<S, M>) -> Router<()>
where
  S: AlertStore + 'static,
  M: AlertMirror + 'static,
{
  Router::new()
    // Service info
    .route("/", get(meta::root))
    .route("/health", get(meta::health::<S, M>))
    // Submission
    .route("/submit-alert", post(submit::handler::<S, M>))
    .route("/submit-alert/", post(submit::handler::<S, M>))
    // Durable alerts
    .route("/alerts", get(alerts::list::<S, M>).post(alerts::create::<S, M>))
    .route("/alerts/active", get(alerts::active::<S, M>))
    .route(
      "/alerts/{id}",
      get(alerts::get_one::<S, M>)
        .put(alerts::update::<S, M>)
        .delete(alerts::delete::<S, M>),
    )
    // Live mirror
    .route("/firebase/alerts", get(live::list::<S, M>).post(live::create::<S, M>))
    .route("/firebase/alerts/active", get(live::active::<S, M>))
    .route(
      "/firebase/alerts/{id}",
      get(live::get_one::<S, M>)
        .put(live::update::<S, M>)
        .delete(live::delete::<S, M>),
    )
    // Locations
    .route("/locations", get(locations::list::<S, M>).post(locations::create::<S, M>))
    .route("/locations/{id}", get(locations::get_one::<S, M>))
    // Users
    .route("/users", get(users::list::<S, M>).post(users::create::<S, M>))
    .route(
      "/users/{id}",
      get(users::get_one::<S, M>)
        .put(users::update::<S, M>)
        .delete(users::delete::<S, M>),
    )
    // Admin
    .route("/admin/overview", get(admin::overview::<S, M>))
    .route("/admin/alerts/all", get(admin::alerts_all::<S, M>))
    .route("/admin/alerts/stats", get(admin::alerts_stats::<S, M>))
    .route(
      "/admin/users",
      get(admin::users_list::<S, M>).post(admin::users_create::<S, M>),
    )
    .route(
      "/admin/users/{id}",
      put(admin::users_update::<S, M>).delete(admin::users_delete::<S, M>),
    )
    .route("/admin/insights", get(admin::insights::<S, M>))
    .route("/admin/map/alerts", get(admin::map_alerts::<S, M>))
    .route("/admin/map/heatmap", get(admin::heatmap::<S, M>))
    .route("/admin/predict/{domain}", post(predict::handler::<S, M>))
    .route("/admin/mirror/pending", get(outbox::pending::<S, M>))
    .route("/admin/mirror/retry", post(outbox::retry::<S, M>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
