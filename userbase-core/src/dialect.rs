use sqlx::Database;

/// Everything the query layer needs to know about a database backend.
///
/// Implementations cover placeholder style, identifier quoting, column types and
/// how generated keys come back from an `INSERT`.
pub trait SqlDialect: Database + Sized + Send + Sync
where
    Self::Connection: Send,
{
    /// Returns the placeholder for the `n`-th parameter in a query (e.g., "?" or "$1").
    fn placeholder(n: usize) -> String;
    /// Returns the SQL fragment for an auto-incrementing Primary Key.
    fn auto_increment_pk() -> &'static str;
    /// Returns the number of rows affected by a query result.
    fn rows_affected(res: &Self::QueryResult) -> u64;
    /// Returns the ID of the last inserted row, or 0 when the backend cannot report it.
    fn last_insert_id(res: &Self::QueryResult) -> i64;
    /// Returns true if the database supports the `RETURNING` clause.
    fn supports_returning() -> bool {
        false
    }
    /// Keyword accepted after `LIMIT` meaning "no limit".
    ///
    /// SQLite rejects a bare `OFFSET`, so an offset without a limit is rendered as
    /// `LIMIT <limit_all> OFFSET n`.
    fn limit_all() -> &'static str;

    /// Returns the native SQL type for 32-bit integers.
    fn int_type() -> &'static str {
        "INTEGER"
    }
    /// Returns the native SQL type for text strings.
    fn text_type() -> &'static str {
        "TEXT"
    }

    /// Quotes an identifier (table/column name) to prevent SQL injection.
    fn quote_identifier(ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }
}

#[cfg(feature = "sqlite")]
impl SqlDialect for sqlx::Sqlite {
    fn placeholder(_n: usize) -> String {
        "?".to_string()
    }
    fn auto_increment_pk() -> &'static str {
        "INTEGER PRIMARY KEY"
    }
    fn rows_affected(res: &sqlx::sqlite::SqliteQueryResult) -> u64 {
        res.rows_affected()
    }
    fn last_insert_id(res: &sqlx::sqlite::SqliteQueryResult) -> i64 {
        res.last_insert_rowid()
    }
    fn limit_all() -> &'static str {
        "-1"
    }
}

#[cfg(feature = "postgres")]
impl SqlDialect for sqlx::Postgres {
    fn placeholder(n: usize) -> String {
        format!("${}", n)
    }
    fn auto_increment_pk() -> &'static str {
        "SERIAL PRIMARY KEY"
    }
    fn rows_affected(res: &sqlx::postgres::PgQueryResult) -> u64 {
        res.rows_affected()
    }
    fn last_insert_id(_res: &sqlx::postgres::PgQueryResult) -> i64 {
        0
    }
    fn supports_returning() -> bool {
        true
    }
    fn limit_all() -> &'static str {
        "ALL"
    }
    fn quote_identifier(ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}
