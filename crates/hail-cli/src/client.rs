//! Async HTTP client wrapping the Hail JSON API.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use hail_core::{
  lifecycle::{Party, TripStatus},
  profile::{DriverProfile, NewDriver, NewUser, UserProfile},
  trip::{NewTrip, Trip},
};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Connection settings for the Hail API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Async HTTP client for the Hail JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

// ─── Wire types ───────────────────────────────────────────────────────────────

/// Error body returned by the gateway.
#[derive(Debug, Deserialize)]
pub struct ApiFailure {
  pub error:  String,
  pub reason: String,
}

/// An offer as served by `GET /offers/next`.
#[derive(Debug, Deserialize)]
pub struct OfferView {
  pub trip_id:           Uuid,
  pub driver_id:         Uuid,
  pub expires_at:        DateTime<Utc>,
  pub remaining_seconds: i64,
}

#[derive(Debug, Deserialize)]
pub struct OfferEnvelope {
  pub trip:  Trip,
  pub offer: OfferView,
}

#[derive(Debug, Deserialize)]
pub struct EndRideResponse {
  pub message: String,
  pub trip:    Trip,
}

// ─── Client ───────────────────────────────────────────────────────────────────

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Decode a 2xx body, or surface the gateway's `{error, reason}` payload.
  async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
      return resp
        .json::<T>()
        .await
        .context("failed to decode response body");
    }
    match resp.json::<ApiFailure>().await {
      Ok(failure) => bail!("{} [{}]", failure.error, failure.reason),
      Err(_) => bail!("request failed with {status}"),
    }
  }

  // ── Trips ─────────────────────────────────────────────────────────────────

  /// `POST /api/trips`
  pub async fn create_trip(&self, input: &NewTrip) -> Result<Trip> {
    let resp = self
      .client
      .post(self.url("/trips"))
      .json(input)
      .send()
      .await
      .context("POST /trips failed")?;
    Self::decode(resp).await
  }

  /// `GET /api/trips[?status=...]`
  pub async fn list_trips(&self, status: Option<TripStatus>) -> Result<Vec<Trip>> {
    let mut req = self.client.get(self.url("/trips"));
    if let Some(status) = status {
      req = req.query(&[("status", status.as_str())]);
    }
    let resp = req.send().await.context("GET /trips failed")?;
    Self::decode(resp).await
  }

  /// `GET /api/trips/active` — `None` when no trip is live.
  pub async fn active_trip(
    &self,
    party: Option<(Party, Uuid)>,
  ) -> Result<Option<Trip>> {
    let mut req = self.client.get(self.url("/trips/active"));
    if let Some((role, id)) = party {
      req = req
        .query(&[("role", role.as_str().to_owned()), ("id", id.to_string())]);
    }
    let resp = req.send().await.context("GET /trips/active failed")?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    Ok(Some(Self::decode(resp).await?))
  }

  /// `PUT /api/trips/:id/assign-driver`
  pub async fn assign_driver(
    &self,
    trip_id: Uuid,
    driver_id: Uuid,
  ) -> Result<Trip> {
    let resp = self
      .client
      .put(self.url(&format!("/trips/{trip_id}/assign-driver")))
      .json(&json!({ "driver_id": driver_id }))
      .send()
      .await
      .context("PUT /trips/:id/assign-driver failed")?;
    Self::decode(resp).await
  }

  /// `PUT /api/trips/:id/end-user` or `.../end-driver`
  pub async fn end_ride(
    &self,
    trip_id: Uuid,
    side: Party,
  ) -> Result<EndRideResponse> {
    let resp = self
      .client
      .put(self.url(&format!("/trips/{trip_id}/end-{}", side.as_str())))
      .send()
      .await
      .context("PUT /trips/:id/end-* failed")?;
    Self::decode(resp).await
  }

  // ── Offers ────────────────────────────────────────────────────────────────

  /// `GET /api/offers/next` — `None` while there is nothing to offer.
  pub async fn next_offer(&self, driver_id: Uuid) -> Result<Option<OfferEnvelope>> {
    let resp = self
      .client
      .get(self.url("/offers/next"))
      .query(&[("driver_id", driver_id.to_string())])
      .send()
      .await
      .context("GET /offers/next failed")?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    Ok(Some(Self::decode(resp).await?))
  }

  /// `PUT /api/trips/:id/accept`
  pub async fn accept_offer(
    &self,
    trip_id: Uuid,
    driver_id: Uuid,
  ) -> Result<Trip> {
    let resp = self
      .client
      .put(self.url(&format!("/trips/{trip_id}/accept")))
      .json(&json!({ "driver_id": driver_id }))
      .send()
      .await
      .context("PUT /trips/:id/accept failed")?;
    Self::decode(resp).await
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  /// `GET /api/details/driver`
  pub async fn first_driver(&self) -> Result<DriverProfile> {
    let resp = self
      .client
      .get(self.url("/details/driver"))
      .send()
      .await
      .context("GET /details/driver failed")?;
    Self::decode(resp).await
  }

  /// `GET /api/details/driver/:id`
  pub async fn get_driver(&self, driver_id: Uuid) -> Result<DriverProfile> {
    let resp = self
      .client
      .get(self.url(&format!("/details/driver/{driver_id}")))
      .send()
      .await
      .context("GET /details/driver/:id failed")?;
    Self::decode(resp).await
  }

  /// `GET /api/details/user/:id`
  pub async fn get_user(&self, user_id: Uuid) -> Result<UserProfile> {
    let resp = self
      .client
      .get(self.url(&format!("/details/user/{user_id}")))
      .send()
      .await
      .context("GET /details/user/:id failed")?;
    Self::decode(resp).await
  }

  /// `POST /api/details/driver`
  pub async fn register_driver(&self, input: &NewDriver) -> Result<DriverProfile> {
    let resp = self
      .client
      .post(self.url("/details/driver"))
      .json(input)
      .send()
      .await
      .context("POST /details/driver failed")?;
    Self::decode(resp).await
  }

  /// `POST /api/details/user`
  pub async fn register_user(&self, input: &NewUser) -> Result<UserProfile> {
    let resp = self
      .client
      .post(self.url("/details/user"))
      .json(input)
      .send()
      .await
      .context("POST /details/user failed")?;
    Self::decode(resp).await
  }
}
