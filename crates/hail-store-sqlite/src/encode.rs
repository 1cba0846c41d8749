//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, which compare
//! chronologically under SQLite's lexicographic TEXT ordering — offer expiry
//! is checked with a plain `<=` in SQL. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use hail_core::{
  lifecycle::TripStatus,
  offer::Offer,
  profile::{DriverProfile, UserProfile},
  trip::Trip,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── TripStatus
// ───────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<TripStatus> {
  TripStatus::parse(s)
    .ok_or_else(|| hail_core::Error::UnknownStatus(s.to_owned()).into())
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `trips` row.
pub struct RawTrip {
  pub trip_id:          String,
  pub rider_id:         String,
  pub source:           String,
  pub destination:      String,
  pub distance_km:      Option<f64>,
  pub driver_id:        Option<String>,
  pub status:           String,
  pub created_at:       String,
  pub assigned_at:      Option<String>,
  pub ended_at:         Option<String>,
  pub offer_driver_id:  Option<String>,
  pub offer_expires_at: Option<String>,
}

impl RawTrip {
  pub fn into_trip(self) -> Result<Trip> {
    Ok(Trip {
      trip_id:          decode_uuid(&self.trip_id)?,
      rider_id:         decode_uuid(&self.rider_id)?,
      source:           self.source,
      destination:      self.destination,
      distance_km:      self.distance_km,
      driver_id:        self.driver_id.as_deref().map(decode_uuid).transpose()?,
      status:           decode_status(&self.status)?,
      created_at:       decode_dt(&self.created_at)?,
      assigned_at:      self.assigned_at.as_deref().map(decode_dt).transpose()?,
      ended_at:         self.ended_at.as_deref().map(decode_dt).transpose()?,
      offer_driver_id:  self
        .offer_driver_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      offer_expires_at: self
        .offer_expires_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
    })
  }
}

/// The offer columns of one trip row, as stored.
pub struct RawOffer {
  pub trip_id:    String,
  pub driver_id:  String,
  pub expires_at: String,
}

impl RawOffer {
  pub fn into_offer(self) -> Result<Offer> {
    Ok(Offer {
      trip_id:    decode_uuid(&self.trip_id)?,
      driver_id:  decode_uuid(&self.driver_id)?,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}

/// Raw strings read directly from a `drivers` row.
pub struct RawDriver {
  pub driver_id:      String,
  pub name:           String,
  pub vehicle_number: String,
  pub license_number: String,
  pub total_trips:    i64,
  pub earnings:       f64,
  pub points:         i64,
  pub rating:         f64,
  pub created_at:     String,
}

impl RawDriver {
  pub fn into_profile(self) -> Result<DriverProfile> {
    Ok(DriverProfile {
      driver_id:      decode_uuid(&self.driver_id)?,
      name:           self.name,
      vehicle_number: self.vehicle_number,
      license_number: self.license_number,
      total_trips:    self.total_trips.max(0) as u64,
      earnings:       self.earnings,
      points:         self.points.max(0) as u64,
      rating:         self.rating,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub name:       String,
  pub rating:     f64,
  pub created_at: String,
}

impl RawUser {
  pub fn into_profile(self) -> Result<UserProfile> {
    Ok(UserProfile {
      user_id:    decode_uuid(&self.user_id)?,
      name:       self.name,
      rating:     self.rating,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
