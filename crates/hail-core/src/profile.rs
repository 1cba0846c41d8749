//! Rider and driver profile records served by the details endpoints.
//!
//! Profiles carry display data and the driver's running settlement totals.
//! They are not an identity system: authentication is out of scope and ids
//! are handed out at registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default rating for freshly registered parties.
pub const DEFAULT_RATING: f64 = 5.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverProfile {
  pub driver_id:      Uuid,
  pub name:           String,
  pub vehicle_number: String,
  pub license_number: String,
  /// Completed trips; incremented when a trip fully ends.
  pub total_trips:    u64,
  /// Accumulated fares, credited on trip completion.
  pub earnings:       f64,
  pub points:         u64,
  pub rating:         f64,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDriver {
  pub name:           String,
  pub vehicle_number: String,
  pub license_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id:    Uuid,
  pub name:       String,
  pub rating:     f64,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub name: String,
}
