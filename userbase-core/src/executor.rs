use crate::dialect::SqlDialect;
use sqlx::Database;

/// Where a query runs: a shared pool or one borrowed connection.
///
/// A connection borrowed out of a transaction lets several builder calls share
/// that transaction.
pub enum Executor<'a, DB: Database> {
    Pool(&'a sqlx::Pool<DB>),
    Conn(&'a mut DB::Connection),
}

impl<DB: Database> std::fmt::Debug for Executor<'_, DB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pool(_) => "Executor::Pool",
            Self::Conn(_) => "Executor::Conn",
        })
    }
}

// SAFETY: a pool reference is shareable across threads in sqlx and the connection
// is borrowed uniquely, so moving the executor is sound when the connection is Send.
unsafe impl<DB: Database> Send for Executor<'_, DB> where DB::Connection: Send {}

/// Converts pools, connections and executors into an [`Executor`].
pub trait IntoExecutor<'a>: Send + 'a {
    type DB: SqlDialect;
    fn into_executor(self) -> Executor<'a, Self::DB>;
}

impl<'a, DB: SqlDialect> IntoExecutor<'a> for &'a sqlx::Pool<DB> {
    type DB = DB;
    fn into_executor(self) -> Executor<'a, DB> {
        Executor::Pool(self)
    }
}

#[cfg(feature = "sqlite")]
impl<'a> IntoExecutor<'a> for &'a mut sqlx::SqliteConnection {
    type DB = sqlx::Sqlite;
    fn into_executor(self) -> Executor<'a, sqlx::Sqlite> {
        Executor::Conn(self)
    }
}

#[cfg(feature = "postgres")]
impl<'a> IntoExecutor<'a> for &'a mut sqlx::postgres::PgConnection {
    type DB = sqlx::Postgres;
    fn into_executor(self) -> Executor<'a, sqlx::Postgres> {
        Executor::Conn(self)
    }
}

impl<'a, DB: SqlDialect> IntoExecutor<'a> for Executor<'a, DB> {
    type DB = DB;
    fn into_executor(self) -> Executor<'a, DB> {
        self
    }
}

/// Anything a row of `DB` can be decoded into and handed across tasks.
pub trait FetchRow<DB: Database>: for<'r> sqlx::FromRow<'r, DB::Row> + Send + Unpin {}

impl<DB: Database, T> FetchRow<DB> for T where T: for<'r> sqlx::FromRow<'r, DB::Row> + Send + Unpin {}

// Runs `$query.$method(..)` against whichever side the executor holds.
macro_rules! dispatch {
    ($executor:expr, $query:ident.$method:ident()) => {
        match $executor {
            Executor::Pool(pool) => $query.$method(*pool).await,
            Executor::Conn(conn) => $query.$method(&mut **conn).await,
        }
    };
}

impl<'a, DB> Executor<'a, DB>
where
    DB: SqlDialect,
    for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
{
    pub async fn execute<'q, A>(
        &mut self,
        query: sqlx::query::Query<'q, DB, A>,
    ) -> Result<DB::QueryResult, sqlx::Error>
    where
        A: sqlx::IntoArguments<'q, DB> + 'q,
    {
        dispatch!(self, query.execute())
    }

    pub async fn fetch_all<'q, T, A>(
        &mut self,
        query: sqlx::query::QueryAs<'q, DB, T, A>,
    ) -> Result<Vec<T>, sqlx::Error>
    where
        T: FetchRow<DB>,
        A: sqlx::IntoArguments<'q, DB> + 'q,
    {
        dispatch!(self, query.fetch_all())
    }

    /// Runs a query that must yield exactly one row of one column (`COUNT(*)`, `RETURNING id`).
    pub async fn fetch_scalar<'q, O, A>(
        &mut self,
        query: sqlx::query::QueryScalar<'q, DB, O, A>,
    ) -> Result<O, sqlx::Error>
    where
        O: Send + Unpin,
        (O,): FetchRow<DB>,
        A: sqlx::IntoArguments<'q, DB> + 'q,
    {
        dispatch!(self, query.fetch_one())
    }

    /// Consumes the executor; the stream keeps the pool or connection borrowed.
    pub fn fetch_stream<'q, T, A>(
        self,
        query: sqlx::query::QueryAs<'q, DB, T, A>,
    ) -> futures_util::stream::BoxStream<'a, Result<T, sqlx::Error>>
    where
        T: FetchRow<DB> + 'a,
        A: sqlx::IntoArguments<'q, DB> + 'q,
        'q: 'a,
    {
        match self {
            Self::Pool(pool) => query.fetch(pool),
            Self::Conn(conn) => query.fetch(conn),
        }
    }
}
