//! SQLite backend for the Hail trip store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every conditional state transition
//! (assignment, offers, ride ending) executes inside a single connection
//! closure, which is the atomicity boundary that makes the matching race
//! safe.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
