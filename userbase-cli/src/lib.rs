//! The userbase demo driver.
//!
//! Resets a `users` table to five known rows, then walks through lookups,
//! ordering, pagination, comparison/substring/set filters, a relation-existence
//! filter and a keyed update, printing each result.

pub mod config;
pub mod driver;
pub mod models;
pub mod ops;
pub mod telemetry;

/// Backend the binary is built for. `postgres` wins when both features are on.
#[cfg(feature = "postgres")]
pub type Db = sqlx::Postgres;
#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type Db = sqlx::Sqlite;

pub type DbPool = sqlx::Pool<Db>;
