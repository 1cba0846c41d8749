//! [`SqliteStore`] — the SQLite implementation of [`TripStore`].
//!
//! The single connection thread is the serialization point: a conditional
//! `UPDATE` and its precondition re-read run back to back inside one
//! [`tokio_rusqlite::Connection::call`] closure, so no second caller can
//! interleave. That is the compare-and-swap the matching protocol relies on.

use std::path::Path;

use chrono::{TimeDelta, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use hail_core::{
  Error as CoreError,
  lifecycle::{EndOutcome, Party, TripStatus},
  offer::Offer,
  pricing,
  profile::{DEFAULT_RATING, DriverProfile, NewDriver, NewUser, UserProfile},
  store::{TripQuery, TripStore},
  trip::{NewTrip, Trip},
};

use crate::{
  Error, Result,
  encode::{RawDriver, RawOffer, RawTrip, RawUser, encode_dt, encode_uuid},
  schema::SCHEMA,
};

/// Domain-rule outcome smuggled out of a connection closure. Database errors
/// travel on the outer `tokio_rusqlite` channel; lost races and lifecycle
/// violations travel here.
type DomainResult<T> = std::result::Result<T, CoreError>;

const TRIP_COLUMNS: &str = "trip_id, rider_id, source, destination, \
   distance_km, driver_id, status, created_at, assigned_at, ended_at, \
   offer_driver_id, offer_expires_at";

const LIVE_STATUSES: &str =
  "status IN ('assigned', 'active', 'ending_user', 'ending_driver')";

/// The sole mutation path that binds a driver: a conditional UPDATE that
/// only fires while the trip is still unclaimed.
const ASSIGN_SQL: &str = "UPDATE trips
   SET driver_id = ?2, status = 'assigned', assigned_at = ?3,
       offer_driver_id = NULL, offer_expires_at = NULL
   WHERE trip_id = ?1 AND status = 'pending' AND driver_id IS NULL";

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn raw_trip_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTrip> {
  Ok(RawTrip {
    trip_id:          row.get(0)?,
    rider_id:         row.get(1)?,
    source:           row.get(2)?,
    destination:      row.get(3)?,
    distance_km:      row.get(4)?,
    driver_id:        row.get(5)?,
    status:           row.get(6)?,
    created_at:       row.get(7)?,
    assigned_at:      row.get(8)?,
    ended_at:         row.get(9)?,
    offer_driver_id:  row.get(10)?,
    offer_expires_at: row.get(11)?,
  })
}

fn fetch_raw_trip(
  conn: &rusqlite::Connection,
  trip_id: &str,
) -> rusqlite::Result<Option<RawTrip>> {
  conn
    .query_row(
      &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE trip_id = ?1"),
      rusqlite::params![trip_id],
      raw_trip_from_row,
    )
    .optional()
}

fn raw_driver_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDriver> {
  Ok(RawDriver {
    driver_id:      row.get(0)?,
    name:           row.get(1)?,
    vehicle_number: row.get(2)?,
    license_number: row.get(3)?,
    total_trips:    row.get(4)?,
    earnings:       row.get(5)?,
    points:         row.get(6)?,
    rating:         row.get(7)?,
    created_at:     row.get(8)?,
  })
}

const DRIVER_COLUMNS: &str = "driver_id, name, vehicle_number, \
   license_number, total_trips, earnings, points, rating, created_at";

/// Classify a trip that a conditional assignment could not claim.
fn classify_unassignable(trip_id: Uuid, raw: &RawTrip) -> CoreError {
  if raw.status == "assigned" {
    return CoreError::AlreadyAssigned(trip_id);
  }
  match TripStatus::parse(&raw.status) {
    Some(status) => CoreError::InvalidState { trip_id, status },
    None => CoreError::UnknownStatus(raw.status.clone()),
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Hail trip store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── TripStore impl ──────────────────────────────────────────────────────────

impl TripStore for SqliteStore {
  type Error = Error;

  // ── Trips ─────────────────────────────────────────────────────────────────

  async fn create_trip(&self, input: NewTrip) -> Result<Trip> {
    let trip = Trip {
      trip_id:          Uuid::new_v4(),
      rider_id:         input.rider_id,
      source:           input.source,
      destination:      input.destination,
      distance_km:      input.distance_km,
      driver_id:        None,
      status:           TripStatus::Pending,
      created_at:       Utc::now(),
      assigned_at:      None,
      ended_at:         None,
      offer_driver_id:  None,
      offer_expires_at: None,
    };

    let trip_id_str    = encode_uuid(trip.trip_id);
    let rider_id_str   = encode_uuid(trip.rider_id);
    let source         = trip.source.clone();
    let destination    = trip.destination.clone();
    let distance_km    = trip.distance_km;
    let created_at_str = encode_dt(trip.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO trips (
             trip_id, rider_id, source, destination, distance_km,
             status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
          rusqlite::params![
            trip_id_str,
            rider_id_str,
            source,
            destination,
            distance_km,
            created_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(trip)
  }

  async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>> {
    let id_str = encode_uuid(trip_id);

    let raw: Option<RawTrip> = self
      .conn
      .call(move |conn| Ok(fetch_raw_trip(conn, &id_str)?))
      .await?;

    raw.map(RawTrip::into_trip).transpose()
  }

  async fn list_trips(&self, query: TripQuery) -> Result<Vec<Trip>> {
    let status_str = query.status.map(|s| s.as_str().to_owned());
    let rider_str  = query.rider_id.map(encode_uuid);
    let driver_str = query.driver_id.map(encode_uuid);
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val  = query.limit.map_or(-1, |l| l as i64);

    let raws: Vec<RawTrip> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<&'static str> = vec![];
        if status_str.is_some() {
          conds.push("status = ?1");
        }
        if rider_str.is_some() {
          conds.push("rider_id = ?2");
        }
        if driver_str.is_some() {
          conds.push("driver_id = ?3");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {TRIP_COLUMNS} FROM trips
           {where_clause}
           ORDER BY created_at ASC
           LIMIT ?4"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              status_str.as_deref(),
              rider_str.as_deref(),
              driver_str.as_deref(),
              limit_val,
            ],
            raw_trip_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTrip::into_trip).collect()
  }

  async fn active_trip(
    &self,
    party: Option<(Party, Uuid)>,
  ) -> Result<Option<Trip>> {
    let scope = party.map(|(party, id)| {
      let column = match party {
        Party::User => "rider_id",
        Party::Driver => "driver_id",
      };
      (column, encode_uuid(id))
    });

    let raw: Option<RawTrip> = self
      .conn
      .call(move |conn| {
        let found = if let Some((column, id_str)) = scope {
          conn
            .query_row(
              &format!(
                "SELECT {TRIP_COLUMNS} FROM trips
                 WHERE {LIVE_STATUSES} AND {column} = ?1
                 ORDER BY assigned_at DESC LIMIT 1"
              ),
              rusqlite::params![id_str],
              raw_trip_from_row,
            )
            .optional()?
        } else {
          conn
            .query_row(
              &format!(
                "SELECT {TRIP_COLUMNS} FROM trips
                 WHERE {LIVE_STATUSES}
                 ORDER BY assigned_at DESC LIMIT 1"
              ),
              [],
              raw_trip_from_row,
            )
            .optional()?
        };

        let Some(raw) = found else { return Ok(None) };

        // Fetching is the activation point: the first successful fetch
        // promotes `assigned` to `active`.
        if raw.status == "assigned" {
          conn.execute(
            "UPDATE trips SET status = 'active'
             WHERE trip_id = ?1 AND status = 'assigned'",
            rusqlite::params![raw.trip_id],
          )?;
          return Ok(fetch_raw_trip(conn, &raw.trip_id)?);
        }

        Ok(Some(raw))
      })
      .await?;

    raw.map(RawTrip::into_trip).transpose()
  }

  // ── Matching ──────────────────────────────────────────────────────────────

  async fn assign_driver(&self, trip_id: Uuid, driver_id: Uuid) -> Result<Trip> {
    let trip_id_str   = encode_uuid(trip_id);
    let driver_id_str = encode_uuid(driver_id);
    let now_str       = encode_dt(Utc::now());

    let out: DomainResult<RawTrip> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          ASSIGN_SQL,
          rusqlite::params![trip_id_str, driver_id_str, now_str],
        )?;

        if changed == 1 {
          let raw = fetch_raw_trip(conn, &trip_id_str)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
          return Ok(Ok(raw));
        }

        // Zero rows touched: the precondition failed. Re-read to classify.
        Ok(match fetch_raw_trip(conn, &trip_id_str)? {
          None => Err(CoreError::TripNotFound(trip_id)),
          Some(raw) => Err(classify_unassignable(trip_id, &raw)),
        })
      })
      .await?;

    out.map_err(Error::Core)?.into_trip()
  }

  // ── Offers ────────────────────────────────────────────────────────────────

  async fn next_offer(
    &self,
    driver_id: Uuid,
    window_secs: u32,
  ) -> Result<Option<Trip>> {
    let driver_id_str = encode_uuid(driver_id);
    let now = Utc::now();
    let now_str = encode_dt(now);
    let expires_str =
      encode_dt(now + TimeDelta::seconds(i64::from(window_secs)));

    let raw: Option<RawTrip> = self
      .conn
      .call(move |conn| {
        // Expired offers die on the next poll, not on a timer.
        conn.execute(
          "UPDATE trips SET offer_driver_id = NULL, offer_expires_at = NULL
           WHERE offer_expires_at IS NOT NULL AND offer_expires_at <= ?1",
          rusqlite::params![now_str],
        )?;

        // An offer this driver already holds is handed back unchanged;
        // polling does not extend the window.
        let held = conn
          .query_row(
            &format!(
              "SELECT {TRIP_COLUMNS} FROM trips
               WHERE status = 'pending' AND offer_driver_id = ?1"
            ),
            rusqlite::params![driver_id_str],
            raw_trip_from_row,
          )
          .optional()?;
        if held.is_some() {
          return Ok(held);
        }

        // Most recently created pending trip nobody else has a live offer
        // on.
        let candidate: Option<String> = conn
          .query_row(
            "SELECT trip_id FROM trips
             WHERE status = 'pending' AND offer_driver_id IS NULL
             ORDER BY created_at DESC LIMIT 1",
            [],
            |row| row.get(0),
          )
          .optional()?;
        let Some(trip_id_str) = candidate else { return Ok(None) };

        conn.execute(
          "UPDATE trips SET offer_driver_id = ?2, offer_expires_at = ?3
           WHERE trip_id = ?1",
          rusqlite::params![trip_id_str, driver_id_str, expires_str],
        )?;

        Ok(fetch_raw_trip(conn, &trip_id_str)?)
      })
      .await?;

    raw.map(RawTrip::into_trip).transpose()
  }

  async fn start_offer(
    &self,
    trip_id: Uuid,
    driver_id: Uuid,
    window_secs: u32,
  ) -> Result<Offer> {
    let trip_id_str   = encode_uuid(trip_id);
    let driver_id_str = encode_uuid(driver_id);
    let now = Utc::now();
    let now_str = encode_dt(now);
    let expires_str =
      encode_dt(now + TimeDelta::seconds(i64::from(window_secs)));

    let out: DomainResult<RawOffer> = self
      .conn
      .call(move |conn| {
        // Clear this trip's offer first if it has already lapsed.
        conn.execute(
          "UPDATE trips SET offer_driver_id = NULL, offer_expires_at = NULL
           WHERE trip_id = ?1
             AND offer_expires_at IS NOT NULL AND offer_expires_at <= ?2",
          rusqlite::params![trip_id_str, now_str],
        )?;

        let Some(raw) = fetch_raw_trip(conn, &trip_id_str)? else {
          return Ok(Err(CoreError::TripNotFound(trip_id)));
        };
        if raw.status != "pending" {
          return Ok(Err(match TripStatus::parse(&raw.status) {
            Some(status) => CoreError::InvalidState { trip_id, status },
            None => CoreError::UnknownStatus(raw.status),
          }));
        }

        match (raw.offer_driver_id, raw.offer_expires_at) {
          // This driver already holds the live offer.
          (Some(holder), Some(expires)) if holder == driver_id_str => {
            Ok(Ok(RawOffer {
              trip_id:    raw.trip_id,
              driver_id:  holder,
              expires_at: expires,
            }))
          }
          (Some(_), Some(_)) => Ok(Err(CoreError::OfferConflict(trip_id))),
          _ => {
            conn.execute(
              "UPDATE trips SET offer_driver_id = ?2, offer_expires_at = ?3
               WHERE trip_id = ?1",
              rusqlite::params![trip_id_str, driver_id_str, expires_str],
            )?;
            Ok(Ok(RawOffer {
              trip_id:    raw.trip_id,
              driver_id:  driver_id_str,
              expires_at: expires_str,
            }))
          }
        }
      })
      .await?;

    out.map_err(Error::Core)?.into_offer()
  }

  async fn accept_offer(&self, trip_id: Uuid, driver_id: Uuid) -> Result<Trip> {
    let trip_id_str   = encode_uuid(trip_id);
    let driver_id_str = encode_uuid(driver_id);
    let now_str       = encode_dt(Utc::now());

    let out: DomainResult<RawTrip> = self
      .conn
      .call(move |conn| {
        let Some(raw) = fetch_raw_trip(conn, &trip_id_str)? else {
          return Ok(Err(CoreError::TripNotFound(trip_id)));
        };
        if raw.status != "pending" {
          return Ok(Err(classify_unassignable(trip_id, &raw)));
        }

        match (raw.offer_driver_id.as_deref(), raw.offer_expires_at.as_deref())
        {
          (Some(holder), Some(expires)) if holder == driver_id_str => {
            // RFC 3339 strings compare chronologically; once the deadline
            // passes, expiry wins the race no matter how close the accept.
            if expires <= now_str.as_str() {
              conn.execute(
                "UPDATE trips
                 SET offer_driver_id = NULL, offer_expires_at = NULL
                 WHERE trip_id = ?1",
                rusqlite::params![trip_id_str],
              )?;
              return Ok(Err(CoreError::OfferExpired(trip_id)));
            }

            // Delegate to the matching engine in the same atomic step; its
            // verdict is authoritative.
            let changed = conn.execute(
              ASSIGN_SQL,
              rusqlite::params![trip_id_str, driver_id_str, now_str],
            )?;
            if changed == 1 {
              let raw = fetch_raw_trip(conn, &trip_id_str)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
              Ok(Ok(raw))
            } else {
              Ok(Err(CoreError::AlreadyAssigned(trip_id)))
            }
          }
          _ => Ok(Err(CoreError::OfferNotHeld { trip_id, driver_id })),
        }
      })
      .await?;

    out.map_err(Error::Core)?.into_trip()
  }

  // ── Ride ending ───────────────────────────────────────────────────────────

  async fn end_ride(&self, trip_id: Uuid, side: Party) -> Result<Trip> {
    let trip_id_str = encode_uuid(trip_id);
    let now_str     = encode_dt(Utc::now());

    let out: DomainResult<RawTrip> = self
      .conn
      .call(move |conn| {
        let Some(raw) = fetch_raw_trip(conn, &trip_id_str)? else {
          return Ok(Err(CoreError::TripNotFound(trip_id)));
        };
        let Some(status) = TripStatus::parse(&raw.status) else {
          return Ok(Err(CoreError::UnknownStatus(raw.status)));
        };

        match status.apply_end(side) {
          None => Ok(Err(CoreError::InvalidState { trip_id, status })),

          Some(EndOutcome::NoChange) => Ok(Ok(raw)),

          Some(EndOutcome::AwaitingOther(next)) => {
            conn.execute(
              "UPDATE trips SET status = ?2
               WHERE trip_id = ?1 AND status = ?3",
              rusqlite::params![trip_id_str, next.as_str(), status.as_str()],
            )?;
            let raw = fetch_raw_trip(conn, &trip_id_str)?
              .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            Ok(Ok(raw))
          }

          Some(EndOutcome::Completed) => {
            conn.execute(
              "UPDATE trips SET status = 'ended', ended_at = ?2
               WHERE trip_id = ?1",
              rusqlite::params![trip_id_str, now_str],
            )?;

            // Settle the driver in the same atomic step. Trips with no
            // computed distance credit a trip but no fare.
            if let Some(driver_str) = raw.driver_id.as_deref() {
              let fare = raw.distance_km.map_or(0.0, pricing::fare);
              conn.execute(
                "UPDATE drivers
                 SET total_trips = total_trips + 1, earnings = earnings + ?2
                 WHERE driver_id = ?1",
                rusqlite::params![driver_str, fare],
              )?;
            }

            let raw = fetch_raw_trip(conn, &trip_id_str)?
              .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            Ok(Ok(raw))
          }
        }
      })
      .await?;

    out.map_err(Error::Core)?.into_trip()
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn add_driver(&self, input: NewDriver) -> Result<DriverProfile> {
    let profile = DriverProfile {
      driver_id:      Uuid::new_v4(),
      name:           input.name,
      vehicle_number: input.vehicle_number,
      license_number: input.license_number,
      total_trips:    0,
      earnings:       0.0,
      points:         0,
      rating:         DEFAULT_RATING,
      created_at:     Utc::now(),
    };

    let id_str         = encode_uuid(profile.driver_id);
    let name           = profile.name.clone();
    let vehicle_number = profile.vehicle_number.clone();
    let license_number = profile.license_number.clone();
    let rating         = profile.rating;
    let at_str         = encode_dt(profile.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO drivers (
             driver_id, name, vehicle_number, license_number, rating,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            name,
            vehicle_number,
            license_number,
            rating,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(profile)
  }

  async fn get_driver(&self, driver_id: Uuid) -> Result<Option<DriverProfile>> {
    let id_str = encode_uuid(driver_id);

    let raw: Option<RawDriver> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {DRIVER_COLUMNS} FROM drivers WHERE driver_id = ?1"
              ),
              rusqlite::params![id_str],
              raw_driver_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDriver::into_profile).transpose()
  }

  async fn first_driver(&self) -> Result<Option<DriverProfile>> {
    let raw: Option<RawDriver> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {DRIVER_COLUMNS} FROM drivers
                 ORDER BY created_at ASC LIMIT 1"
              ),
              [],
              raw_driver_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDriver::into_profile).transpose()
  }

  async fn add_user(&self, input: NewUser) -> Result<UserProfile> {
    let profile = UserProfile {
      user_id:    Uuid::new_v4(),
      name:       input.name,
      rating:     DEFAULT_RATING,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(profile.user_id);
    let name   = profile.name.clone();
    let rating = profile.rating;
    let at_str = encode_dt(profile.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, name, rating, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, rating, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(profile)
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, name, rating, created_at FROM users
               WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawUser {
                  user_id:    row.get(0)?,
                  name:       row.get(1)?,
                  rating:     row.get(2)?,
                  created_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_profile).transpose()
  }
}
