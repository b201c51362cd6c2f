//! earmark Progress Store
//!
//! This crate persists listening progress in SQLite using sqlx.
//! It provides the durable keyed record per (user, item) the sync engine writes to.

pub mod connection;
pub mod migrations;
pub mod queries;
pub mod store;

pub use connection::{open, DatabaseConfig, DbPool};
pub use migrations::{current_version, run_migrations};
pub use store::SqliteProgressStore;
