//! SQL schema for the Hail SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS trips (
    trip_id          TEXT PRIMARY KEY,
    rider_id         TEXT NOT NULL,
    source           TEXT NOT NULL,
    destination      TEXT NOT NULL,
    distance_km      REAL,            -- NULL until a route is computed
    driver_id        TEXT,            -- set exactly once, by assignment
    status           TEXT NOT NULL DEFAULT 'pending',
    created_at       TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    assigned_at      TEXT,
    ended_at         TEXT,
    offer_driver_id  TEXT,            -- live offer, if any
    offer_expires_at TEXT,
    -- A trip has a driver iff it has left 'pending'.
    CHECK ((driver_id IS NULL) = (status = 'pending')),
    -- Offer columns are written and cleared together.
    CHECK ((offer_driver_id IS NULL) = (offer_expires_at IS NULL))
);

CREATE TABLE IF NOT EXISTS drivers (
    driver_id      TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    vehicle_number TEXT NOT NULL,
    license_number TEXT NOT NULL,
    total_trips    INTEGER NOT NULL DEFAULT 0,
    earnings       REAL NOT NULL DEFAULT 0,
    points         INTEGER NOT NULL DEFAULT 0,
    rating         REAL NOT NULL DEFAULT 5.0,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id    TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    rating     REAL NOT NULL DEFAULT 5.0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS trips_status_idx  ON trips(status);
CREATE INDEX IF NOT EXISTS trips_rider_idx   ON trips(rider_id);
CREATE INDEX IF NOT EXISTS trips_driver_idx  ON trips(driver_id);
CREATE INDEX IF NOT EXISTS trips_created_idx ON trips(created_at);

PRAGMA user_version = 1;
";
