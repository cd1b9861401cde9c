//! # userbase-core
//!
//! Database plumbing for the userbase seed-and-query driver: a dialect trait for
//! SQLite and Postgres, an executor over pools and connections, the [`Model`] trait,
//! and a filter/query builder that renders parameterized SQL through `sqlx`.
//!
//! ```rust,no_run
//! # use userbase_core::prelude::*;
//! # async fn example<U>(pool: &sqlx::SqlitePool) -> UserbaseResult<()>
//! # where U: Model<sqlx::Sqlite> {
//! let johns = U::find_in_pool(pool)
//!     .filter_eq("name", "John")
//!     .order_by("age", Order::Asc)
//!     .offset(1)
//!     .limit(3)
//!     .all()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub use sqlx;

pub mod dialect;
pub mod error;
pub mod executor;
pub mod model;
pub mod query;
pub mod schema;
pub mod test_utils;

pub use dialect::SqlDialect;
pub use error::{UserbaseError, UserbaseResult, map_sqlx_error};
pub use executor::{Executor, IntoExecutor};
pub use model::{Model, Relation};
pub use query::{BindValue, Filter, Order, QueryBuilder};
pub use schema::SchemaTable;

pub mod prelude {
    pub use crate::{
        Executor, Filter, IntoExecutor, Model, Order, Relation, UserbaseError, UserbaseResult,
        Userbase,
    };
}

use sqlx::{Database, Executor as SqlxExecutor, IntoArguments};

/// Entry point for schema setup and connection helpers.
pub struct Userbase;

impl Userbase {
    /// Creates the table for `M` if it does not exist yet.
    pub async fn sync<DB, M>(pool: &sqlx::Pool<DB>) -> Result<(), sqlx::Error>
    where
        DB: SqlDialect,
        M: Model<DB>,
        for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
        for<'c> &'c mut <DB as Database>::Connection: SqlxExecutor<'c, Database = DB>,
    {
        let sql = M::create_table_sql();
        tracing::debug!(operation = "sync", table = M::table_name(), sql = %sql, "userbase schema");
        sqlx::query::<DB>(&sql).execute(pool).await?;
        Ok(())
    }

    /// Opens a SQLite pool, creating the file if missing, with WAL journaling and
    /// foreign keys enforced.
    ///
    /// `LIKE` is made case-sensitive so `contains` and `starts_with` match the same
    /// rows they would on Postgres.
    #[cfg(feature = "sqlite")]
    pub async fn sqlite_pool(url: &str) -> Result<sqlx::SqlitePool, sqlx::Error> {
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
        use std::str::FromStr;
        use std::time::Duration;

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .pragma("case_sensitive_like", "ON")
            .busy_timeout(Duration::from_secs(5));
        // In-memory databases are per-connection, so they get a single one.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
    }

    /// Opens a Postgres pool.
    #[cfg(feature = "postgres")]
    pub async fn postgres_pool(url: &str) -> Result<sqlx::PgPool, sqlx::Error> {
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
    }
}
