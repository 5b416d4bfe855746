//! # rendezvous-store
//!
//! Persistence boundary for the appointment core.
//!
//! [`AppointmentStore`] is the adapter contract the client core is written
//! against. [`SqliteStore`] satisfies it on top of a local SQLite file through
//! the synchronous [`Database`] handle, which wraps a `rusqlite::Connection`
//! and provides typed CRUD helpers for every record kind.

pub mod appointments;
pub mod database;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod store;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
pub use store::{AppointmentStore, SqliteStore};
