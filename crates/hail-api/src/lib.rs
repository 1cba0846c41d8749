//! JSON REST API for the Hail trip matching service.
//!
//! Exposes an axum [`Router`] backed by any [`hail_core::store::TripStore`].
//! This is the polling gateway the rider and driver clients talk to; it
//! carries no business logic beyond input validation and status-code
//! mapping. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", hail_api::api_router(state))
//! ```

pub mod details;
pub mod error;
pub mod offers;
pub mod trips;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post, put},
};
use hail_core::{offer::DEFAULT_OFFER_WINDOW_SECS, store::TripStore};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
/// Every field has a demo-friendly default, so the file is optional.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  #[serde(default = "default_offer_window")]
  pub offer_window_secs: u32,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 5000 }
fn default_store_path() -> PathBuf { PathBuf::from("hail.db") }
fn default_offer_window() -> u32 { DEFAULT_OFFER_WINDOW_SECS }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct ApiState<S> {
  pub store: Arc<S>,
  /// Seconds a driver has to accept an offer.
  pub offer_window_secs: u32,
}

// Hand-written so `S` itself need not be `Clone`.
impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:             Arc::clone(&self.store),
      offer_window_secs: self.offer_window_secs,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: TripStore + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Trips
    .route("/trips", get(trips::list::<S>).post(trips::create::<S>))
    .route("/trips/active", get(trips::active::<S>))
    .route("/trips/{id}", get(trips::get_one::<S>))
    .route("/trips/{id}/assign-driver", put(trips::assign_driver::<S>))
    .route("/trips/{id}/accept", put(offers::accept::<S>))
    .route("/trips/{id}/end-user", put(trips::end_user::<S>))
    .route("/trips/{id}/end-driver", put(trips::end_driver::<S>))
    // Offers
    .route("/offers/next", get(offers::next::<S>))
    // Details
    .route(
      "/details/driver",
      get(details::first_driver::<S>).post(details::create_driver::<S>),
    )
    .route("/details/driver/{id}", get(details::get_driver::<S>))
    .route("/details/user", post(details::create_user::<S>))
    .route("/details/user/{id}", get(details::get_user::<S>))
    .with_state(state)
}
