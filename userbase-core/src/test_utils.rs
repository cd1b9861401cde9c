use std::future::Future;
use std::pin::Pin;

use sqlx::Database;

/// Future returned by the body passed to [`with_test_transaction`].
pub type TxBody<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'c>>;

/// Runs `body` on a transaction connection, then rolls the transaction back.
///
/// An error from `body` wins over an error from the rollback.
pub async fn with_test_transaction<DB, T, E, F>(pool: &sqlx::Pool<DB>, body: F) -> Result<T, E>
where
    DB: Database,
    E: From<sqlx::Error>,
    F: for<'c> FnOnce(&'c mut DB::Connection) -> TxBody<'c, T, E>,
{
    let mut tx = pool.begin().await?;
    let outcome = body(&mut *tx).await;
    let rolled_back = tx.rollback().await;
    let value = outcome?;
    rolled_back?;
    Ok(value)
}

/// Owns a throwaway database for one test.
pub struct MockDatabase<DB: Database> {
    pool: sqlx::Pool<DB>,
}

impl<DB: Database> MockDatabase<DB> {
    pub fn pool(&self) -> &sqlx::Pool<DB> {
        &self.pool
    }

    pub fn into_pool(self) -> sqlx::Pool<DB> {
        self.pool
    }
}

#[cfg(feature = "sqlite")]
impl MockDatabase<sqlx::Sqlite> {
    /// An in-memory SQLite database opened with the same options as
    /// [`Userbase::sqlite_pool`](crate::Userbase::sqlite_pool).
    ///
    /// The pool holds a single connection, so every query sees the same database.
    pub async fn new_sqlite() -> Result<Self, sqlx::Error> {
        let pool = crate::Userbase::sqlite_pool("sqlite::memory:").await?;
        Ok(Self { pool })
    }
}
