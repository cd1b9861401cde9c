use crate::dialect::SqlDialect;
use crate::error::UserbaseResult;
use crate::executor::Executor;
use crate::executor::IntoExecutor;
use crate::query::QueryBuilder;
use sqlx::{Database, FromRow};
use std::future::Future;

/// A one-to-many link from a model to rows of another table.
///
/// `table.foreign_key` points at `local_key` on the owning model. Relation filters
/// render this as a correlated `EXISTS` sub-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Name the relation is looked up by (e.g. `written_posts`).
    pub name: &'static str,
    /// Table holding the related rows.
    pub table: &'static str,
    /// Column on the related table referencing the owner.
    pub foreign_key: &'static str,
    /// Column on the owning table the foreign key points at.
    pub local_key: &'static str,
}

/// The core trait for database models.
///
/// A model maps one table. Besides the row mapping (`FromRow`) it knows how to
/// create its table, insert itself and describe its relations.
pub trait Model<DB: Database>: Sized + Send + Sync + Unpin
where
    DB: SqlDialect,
    for<'r> Self: FromRow<'r, DB::Row>,
{
    /// Returns the name of the database table associated with this model.
    fn table_name() -> &'static str;
    /// Returns the SQL string required to create the table for this model.
    fn create_table_sql() -> String;
    /// Returns the column names for this model, primary key first.
    ///
    /// Queries select exactly these columns, in this order.
    fn columns() -> &'static [&'static str];

    /// Looks up a declared relation by name.
    fn relation(_name: &str) -> Option<Relation> {
        None
    }

    /// Inserts the current instance and stores the generated primary key on it.
    fn save<'a, E>(
        &'a mut self,
        executor: E,
    ) -> impl Future<Output = UserbaseResult<()>> + Send
    where
        E: IntoExecutor<'a, DB = DB>;

    /// Finds a record by its Primary Key.
    fn find_by_id<'a, E>(
        executor: E,
        id: i32,
    ) -> impl Future<Output = UserbaseResult<Option<Self>>> + Send
    where
        E: IntoExecutor<'a, DB = DB>;

    /// Creates a new [`QueryBuilder`] for this model.
    fn find<'a, E>(executor: E) -> QueryBuilder<'a, Self, DB>
    where
        E: IntoExecutor<'a, DB = DB>,
    {
        QueryBuilder::new(executor.into_executor())
    }

    /// Creates a new [`QueryBuilder`] using a connection pool.
    fn find_in_pool(pool: &sqlx::Pool<DB>) -> QueryBuilder<'_, Self, DB> {
        QueryBuilder::new(Executor::Pool(pool))
    }

    /// Creates a new [`QueryBuilder`] using an active database connection.
    fn find_in_tx(conn: &mut DB::Connection) -> QueryBuilder<'_, Self, DB> {
        QueryBuilder::new(Executor::Conn(conn))
    }
}
