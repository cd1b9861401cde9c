use crate::dialect::SqlDialect;
use crate::error::{UserbaseError, UserbaseResult};
use crate::executor::{Executor, FetchRow};
use crate::model::{Model, Relation};
use futures_util::StreamExt;
use sqlx::{Database, IntoArguments};
use std::fmt::Write;
use std::time::Instant;

#[doc(hidden)]
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    String(String),
    I64(i64),
    Bool(bool),
    Null,
}

impl std::fmt::Display for BindValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindValue::String(v) => f.write_str(v),
            BindValue::I64(v) => write!(f, "{}", v),
            BindValue::Bool(v) => write!(f, "{}", v),
            BindValue::Null => f.write_str("NULL"),
        }
    }
}

#[inline(always)]
fn bind_value_query<'q, DB>(
    query: sqlx::query::Query<'q, DB, <DB as Database>::Arguments<'q>>,
    value: BindValue,
) -> sqlx::query::Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    String: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    i64: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    bool: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    Option<String>: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
{
    match value {
        BindValue::String(v) => query.bind(v),
        BindValue::I64(v) => query.bind(v),
        BindValue::Bool(v) => query.bind(v),
        BindValue::Null => query.bind(Option::<String>::None),
    }
}

#[inline(always)]
fn bind_value_query_as<'q, DB, T>(
    query: sqlx::query::QueryAs<'q, DB, T, <DB as Database>::Arguments<'q>>,
    value: BindValue,
) -> sqlx::query::QueryAs<'q, DB, T, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    String: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    i64: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    bool: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    Option<String>: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
{
    match value {
        BindValue::String(v) => query.bind(v),
        BindValue::I64(v) => query.bind(v),
        BindValue::Bool(v) => query.bind(v),
        BindValue::Null => query.bind(Option::<String>::None),
    }
}

#[inline(always)]
fn bind_value_query_scalar<'q, DB, O>(
    query: sqlx::query::QueryScalar<'q, DB, O, <DB as Database>::Arguments<'q>>,
    value: BindValue,
) -> sqlx::query::QueryScalar<'q, DB, O, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    String: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    i64: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    bool: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    Option<String>: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
{
    match value {
        BindValue::String(v) => query.bind(v),
        BindValue::I64(v) => query.bind(v),
        BindValue::Bool(v) => query.bind(v),
        BindValue::Null => query.bind(Option::<String>::None),
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i32> for BindValue {
    fn from(value: i32) -> Self {
        Self::I64(i64::from(value))
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<bool> for BindValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Option<String>> for BindValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) => Self::String(v),
            None => Self::Null,
        }
    }
}

/// Escapes `LIKE` metacharacters so the operand matches literally under `ESCAPE '\'`.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Sort direction for [`QueryBuilder::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// A boolean filter expression over the columns of one table.
///
/// Leaves compare a column against bound values. `And`, `Or` and `Not` combine
/// filters, and `Some` holds when at least one row of a named relation matches
/// all of its inner filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        column: String,
        op: &'static str,
        value: BindValue,
    },
    In {
        column: String,
        values: Vec<BindValue>,
        negated: bool,
    },
    /// `column LIKE pattern ESCAPE '\'`; `pattern` is already escaped and wildcarded.
    Like { column: String, pattern: String },
    NullCheck { column: String, is_null: bool },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Some {
        relation: String,
        filters: Vec<Filter>,
    },
}

impl Filter {
    fn compare(column: &str, op: &'static str, value: impl Into<BindValue>) -> Self {
        Self::Compare {
            column: column.to_string(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, "=", value)
    }

    /// `column != value`
    pub fn ne(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, "!=", value)
    }

    /// `column < value`
    pub fn lt(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, "<", value)
    }

    /// `column <= value`
    pub fn lte(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, "<=", value)
    }

    /// `column > value`
    pub fn gt(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, ">", value)
    }

    /// `column >= value`
    pub fn gte(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, ">=", value)
    }

    /// `column IN (values...)`; an empty set matches nothing.
    pub fn is_in<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<BindValue>,
    {
        Self::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// `column NOT IN (values...)`; an empty set matches everything.
    pub fn not_in<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<BindValue>,
    {
        Self::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    /// Substring match.
    pub fn contains(column: &str, needle: &str) -> Self {
        Self::Like {
            column: column.to_string(),
            pattern: format!("%{}%", escape_like(needle)),
        }
    }

    /// Prefix match.
    pub fn starts_with(column: &str, prefix: &str) -> Self {
        Self::Like {
            column: column.to_string(),
            pattern: format!("{}%", escape_like(prefix)),
        }
    }

    /// Suffix match.
    pub fn ends_with(column: &str, suffix: &str) -> Self {
        Self::Like {
            column: column.to_string(),
            pattern: format!("%{}", escape_like(suffix)),
        }
    }

    pub fn is_null(column: &str) -> Self {
        Self::NullCheck {
            column: column.to_string(),
            is_null: true,
        }
    }

    pub fn is_not_null(column: &str) -> Self {
        Self::NullCheck {
            column: column.to_string(),
            is_null: false,
        }
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    /// Holds when at least one row of `relation` matches every filter in `filters`.
    pub fn some(relation: &str, filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Some {
            relation: relation.to_string(),
            filters: filters.into_iter().collect(),
        }
    }
}

fn write_joined(
    f: &mut std::fmt::Formatter<'_>,
    filters: &[Filter],
    sep: &str,
) -> std::fmt::Result {
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", filter)?;
    }
    Ok(())
}

// Log rendering: bound values inline, no quoting. Not valid SQL.
impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::Compare { column, op, value } => write!(f, "{} {} {}", column, op, value),
            Filter::In {
                column,
                values,
                negated,
            } => {
                let rendered = values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                let op = if *negated { "NOT IN" } else { "IN" };
                write!(f, "{} {} ({})", column, op, rendered)
            }
            Filter::Like { column, pattern } => write!(f, "{} LIKE {}", column, pattern),
            Filter::NullCheck { column, is_null } => {
                if *is_null {
                    write!(f, "{} IS NULL", column)
                } else {
                    write!(f, "{} IS NOT NULL", column)
                }
            }
            Filter::And(filters) => {
                f.write_str("(")?;
                write_joined(f, filters, " AND ")?;
                f.write_str(")")
            }
            Filter::Or(filters) => {
                f.write_str("(")?;
                write_joined(f, filters, " OR ")?;
                f.write_str(")")
            }
            Filter::Not(inner) => write!(f, "NOT ({})", inner),
            Filter::Some { relation, filters } => {
                write!(f, "{} SOME (", relation)?;
                write_joined(f, filters, " AND ")?;
                f.write_str(")")
            }
        }
    }
}

/// Where a filter is being rendered: the owning table, the table its bare column
/// names belong to, and how to resolve relation names.
struct Scope {
    owner: &'static str,
    qualifier: Option<&'static str>,
    relations: fn(&str) -> Option<Relation>,
}

fn render_column<DB: SqlDialect>(scope: &Scope, column: &str) -> String {
    match scope.qualifier {
        Some(table) => format!(
            "{}.{}",
            DB::quote_identifier(table),
            DB::quote_identifier(column)
        ),
        None => DB::quote_identifier(column),
    }
}

fn render_filter<DB: SqlDialect>(
    filter: &Filter,
    scope: &Scope,
    sql: &mut String,
    binds: &mut Vec<BindValue>,
    idx: &mut usize,
) -> UserbaseResult<()> {
    match filter {
        Filter::Compare { column, op, value } => {
            let _ = write!(
                sql,
                "{} {} {}",
                render_column::<DB>(scope, column),
                op,
                DB::placeholder(*idx)
            );
            *idx += 1;
            binds.push(value.clone());
        }
        Filter::In {
            column,
            values,
            negated,
        } => {
            if values.is_empty() {
                sql.push_str(if *negated { "1=1" } else { "1=0" });
                return Ok(());
            }
            let op = if *negated { "NOT IN" } else { "IN" };
            let _ = write!(sql, "{} {} (", render_column::<DB>(scope, column), op);
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&DB::placeholder(*idx));
                *idx += 1;
                binds.push(v.clone());
            }
            sql.push(')');
        }
        Filter::Like { column, pattern } => {
            let _ = write!(
                sql,
                "{} LIKE {} ESCAPE '\\'",
                render_column::<DB>(scope, column),
                DB::placeholder(*idx)
            );
            *idx += 1;
            binds.push(BindValue::String(pattern.clone()));
        }
        Filter::NullCheck { column, is_null } => {
            let check = if *is_null { "IS NULL" } else { "IS NOT NULL" };
            let _ = write!(sql, "{} {}", render_column::<DB>(scope, column), check);
        }
        Filter::And(filters) | Filter::Or(filters) => {
            let (sep, empty) = if matches!(filter, Filter::And(_)) {
                (" AND ", "1=1")
            } else {
                (" OR ", "1=0")
            };
            if filters.is_empty() {
                sql.push_str(empty);
                return Ok(());
            }
            sql.push('(');
            for (i, inner) in filters.iter().enumerate() {
                if i > 0 {
                    sql.push_str(sep);
                }
                render_filter::<DB>(inner, scope, sql, binds, idx)?;
            }
            sql.push(')');
        }
        Filter::Not(inner) => {
            sql.push_str("NOT (");
            render_filter::<DB>(inner, scope, sql, binds, idx)?;
            sql.push(')');
        }
        Filter::Some { relation, filters } => {
            if scope.qualifier.is_some() {
                return Err(UserbaseError::Message(format!(
                    "relation filter on {} cannot nest inside another relation filter",
                    relation
                )));
            }
            let rel = (scope.relations)(relation).ok_or_else(|| UserbaseError::UnknownRelation {
                table: scope.owner.to_string(),
                relation: relation.clone(),
            })?;
            let related = DB::quote_identifier(rel.table);
            let _ = write!(
                sql,
                "EXISTS (SELECT 1 FROM {} WHERE {}.{} = {}.{}",
                related,
                related,
                DB::quote_identifier(rel.foreign_key),
                DB::quote_identifier(scope.owner),
                DB::quote_identifier(rel.local_key)
            );
            let inner_scope = Scope {
                owner: rel.table,
                qualifier: Some(rel.table),
                relations: scope.relations,
            };
            for inner in filters {
                sql.push_str(" AND ");
                render_filter::<DB>(inner, &inner_scope, sql, binds, idx)?;
            }
            sql.push(')');
        }
    }
    Ok(())
}

/// A type-safe SQL query builder.
///
/// `QueryBuilder` provides a fluent interface for building SELECT, COUNT, UPDATE and
/// DELETE statements with filtering, ordering and offset pagination.
pub struct QueryBuilder<'a, T, DB: Database> {
    executor: Executor<'a, DB>,
    filters: Vec<Filter>,
    order: Vec<(String, Order)>,
    limit: Option<i32>,
    offset: Option<i32>,
    allow_unsafe: bool,
    _marker: std::marker::PhantomData<T>,
}

impl<'a, T, DB: Database> std::fmt::Debug for QueryBuilder<'a, T, DB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("filters", &self.filters)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("allow_unsafe", &self.allow_unsafe)
            .finish()
    }
}

impl<'a, T, DB> QueryBuilder<'a, T, DB>
where
    DB: SqlDialect,
    T: Model<DB>,
{
    /// Creates a new `QueryBuilder` using the provided [`Executor`].
    pub fn new(executor: Executor<'a, DB>) -> Self {
        Self {
            executor,
            filters: Vec::with_capacity(4),
            order: Vec::new(),
            limit: None,
            offset: None,
            allow_unsafe: false,
            _marker: std::marker::PhantomData,
        }
    }

    /// Adds an arbitrary [`Filter`] expression. Top-level filters are ANDed.
    pub fn filter_where(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds an equality filter (`column = value`).
    pub fn filter_eq(self, column: &str, value: impl Into<BindValue>) -> Self {
        self.filter_where(Filter::eq(column, value))
    }

    /// Adds a not-equal filter (`column != value`).
    pub fn filter_ne(self, column: &str, value: impl Into<BindValue>) -> Self {
        self.filter_where(Filter::ne(column, value))
    }

    /// Adds a less-than filter (`column < value`).
    pub fn filter_lt(self, column: &str, value: impl Into<BindValue>) -> Self {
        self.filter_where(Filter::lt(column, value))
    }

    /// Adds a less-than-or-equal filter (`column <= value`).
    pub fn filter_lte(self, column: &str, value: impl Into<BindValue>) -> Self {
        self.filter_where(Filter::lte(column, value))
    }

    /// Adds a greater-than filter (`column > value`).
    pub fn filter_gt(self, column: &str, value: impl Into<BindValue>) -> Self {
        self.filter_where(Filter::gt(column, value))
    }

    /// Adds a greater-than-or-equal filter (`column >= value`).
    pub fn filter_gte(self, column: &str, value: impl Into<BindValue>) -> Self {
        self.filter_where(Filter::gte(column, value))
    }

    /// Adds an IN filter (`column IN (values...)`).
    pub fn filter_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<BindValue>,
    {
        self.filter_where(Filter::is_in(column, values))
    }

    /// Adds a NOT IN filter (`column NOT IN (values...)`).
    pub fn filter_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<BindValue>,
    {
        self.filter_where(Filter::not_in(column, values))
    }

    /// Keeps rows whose column contains `needle`.
    pub fn filter_contains(self, column: &str, needle: &str) -> Self {
        self.filter_where(Filter::contains(column, needle))
    }

    /// Keeps rows whose column starts with `prefix`.
    pub fn filter_starts_with(self, column: &str, prefix: &str) -> Self {
        self.filter_where(Filter::starts_with(column, prefix))
    }

    /// Keeps rows whose column ends with `suffix`.
    pub fn filter_ends_with(self, column: &str, suffix: &str) -> Self {
        self.filter_where(Filter::ends_with(column, suffix))
    }

    /// Filters rows where the column IS NULL.
    pub fn filter_is_null(self, column: &str) -> Self {
        self.filter_where(Filter::is_null(column))
    }

    /// Filters rows where the column IS NOT NULL.
    pub fn filter_is_not_null(self, column: &str) -> Self {
        self.filter_where(Filter::is_not_null(column))
    }

    /// Keeps rows with at least one related row (via `relation`) matching `filters`.
    pub fn filter_some(self, relation: &str, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filter_where(Filter::some(relation, filters))
    }

    /// Appends an ORDER BY term. Terms apply in the order they were added.
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.order.push((column.to_string(), order));
        self
    }

    /// Sets the maximum number of rows to return.
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip. The offset is applied before the limit.
    pub fn offset(mut self, offset: i32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Allows bulk `update`/`delete` without any filter.
    pub fn allow_unsafe(mut self) -> Self {
        self.allow_unsafe = true;
        self
    }

    /// Returns the SELECT SQL that would be executed for this query.
    pub fn to_sql(&self) -> UserbaseResult<String> {
        self.render_select().map(|(sql, _binds)| sql)
    }

    fn format_filters_for_log(&self) -> String {
        self.filters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn render_where_clause_into(
        &self,
        sql: &mut String,
        binds: &mut Vec<BindValue>,
        start_index: usize,
    ) -> UserbaseResult<()> {
        let scope = Scope {
            owner: T::table_name(),
            qualifier: None,
            relations: <T as Model<DB>>::relation,
        };
        let mut idx = start_index;
        for (i, filter) in self.filters.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            render_filter::<DB>(filter, &scope, sql, binds, &mut idx)?;
        }
        Ok(())
    }

    fn render_tail_into(&self, sql: &mut String) {
        for (i, (column, order)) in self.order.iter().enumerate() {
            sql.push_str(if i == 0 { " ORDER BY " } else { ", " });
            let _ = write!(sql, "{} {}", DB::quote_identifier(column), order.as_sql());
        }

        match (self.limit, self.offset) {
            (Some(limit), _) => {
                let _ = write!(sql, " LIMIT {}", limit);
            }
            (None, Some(_)) => {
                let _ = write!(sql, " LIMIT {}", DB::limit_all());
            }
            (None, None) => {}
        }

        if let Some(offset) = self.offset {
            let _ = write!(sql, " OFFSET {}", offset);
        }
    }

    /// Selects the model's declared columns, in declaration order.
    fn render_select(&self) -> UserbaseResult<(String, Vec<BindValue>)> {
        let mut sql = String::with_capacity(128);
        sql.push_str("SELECT ");
        for (i, column) in T::columns().iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&DB::quote_identifier(column));
        }
        let _ = write!(sql, " FROM {}", T::table_name());
        let mut binds = Vec::with_capacity(self.filters.len());
        self.render_where_clause_into(&mut sql, &mut binds, 1)?;
        self.render_tail_into(&mut sql);
        Ok((sql, binds))
    }

    fn ensure_filtered(&self, operation: &str) -> UserbaseResult<()> {
        if self.filters.is_empty() && !self.allow_unsafe {
            return Err(UserbaseError::Message(format!(
                "Refusing bulk {} without filters",
                operation
            )));
        }
        Ok(())
    }
}

impl<'a, T, DB> QueryBuilder<'a, T, DB>
where
    DB: SqlDialect,
    T: Model<DB>,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
    for<'c> &'c mut <DB as Database>::Connection: sqlx::Executor<'c, Database = DB>,
    for<'c> &'c str: sqlx::ColumnIndex<DB::Row>,
    T: Send,
    String: for<'q> sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    i64: for<'q> sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    bool: for<'q> sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    Option<String>: for<'q> sqlx::Encode<'q, DB> + sqlx::Type<DB>,
{
    /// Executes the query and returns every matching row.
    #[tracing::instrument(skip(self), fields(table = T::table_name()))]
    pub async fn all(mut self) -> UserbaseResult<Vec<T>> {
        let (sql, binds) = self.render_select()?;
        tracing::debug!(
            operation = "select",
            sql = %sql,
            filters = %self.format_filters_for_log(),
            "userbase query"
        );

        let start = Instant::now();
        let query = binds
            .into_iter()
            .fold(sqlx::query_as::<DB, T>(&sql), bind_value_query_as);
        let rows = self.executor.fetch_all(query).await?;
        tracing::debug!(
            operation = "select",
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "userbase query done"
        );
        Ok(rows)
    }

    /// Executes the query with `LIMIT 1` and returns the first row, if any.
    #[tracing::instrument(skip(self), fields(table = T::table_name()))]
    pub async fn first(mut self) -> UserbaseResult<Option<T>> {
        self.limit = Some(1);
        let (sql, binds) = self.render_select()?;
        tracing::debug!(
            operation = "select_first",
            sql = %sql,
            filters = %self.format_filters_for_log(),
            "userbase query"
        );

        let query = binds
            .into_iter()
            .fold(sqlx::query_as::<DB, T>(&sql), bind_value_query_as);
        let rows = self.executor.fetch_all(query).await?;
        Ok(rows.into_iter().next())
    }

    /// Counts the matching rows with `COUNT(*)`.
    ///
    /// Ordering, limit and offset do not apply to the count.
    #[tracing::instrument(skip(self), fields(table = T::table_name()))]
    pub async fn count(mut self) -> UserbaseResult<i64>
    where
        (i64,): FetchRow<DB>,
    {
        let mut sql = String::with_capacity(96);
        let _ = write!(sql, "SELECT COUNT(*) FROM {}", T::table_name());
        let mut binds = Vec::with_capacity(self.filters.len());
        self.render_where_clause_into(&mut sql, &mut binds, 1)?;
        tracing::debug!(
            operation = "count",
            sql = %sql,
            filters = %self.format_filters_for_log(),
            "userbase query"
        );

        let query = binds
            .into_iter()
            .fold(sqlx::query_scalar::<DB, i64>(&sql), bind_value_query_scalar);
        Ok(self.executor.fetch_scalar(query).await?)
    }

    /// Executes the query and returns a stream of results.
    ///
    /// This is useful for processing large result sets without loading them all into memory.
    #[tracing::instrument(skip(self), fields(table = T::table_name()))]
    pub fn stream(
        self,
    ) -> UserbaseResult<futures_util::stream::BoxStream<'a, UserbaseResult<T>>>
    where
        T: 'a,
    {
        let (sql, binds) = self.render_select()?;
        tracing::debug!(
            operation = "stream",
            sql = %sql,
            filters = %self.format_filters_for_log(),
            "userbase query"
        );

        let executor = self.executor;
        Ok(Box::pin(async_stream::stream! {
            let mut query = sqlx::query_as::<DB, T>(&sql);
            for bind in binds {
                query = bind_value_query_as(query, bind);
            }
            let mut rows = executor.fetch_stream(query);
            while let Some(row) = rows.next().await {
                yield row.map_err(UserbaseError::from);
            }
        }))
    }

    /// Executes a bulk update of the matching rows and returns how many changed.
    ///
    /// `values` must be a JSON object of column -> scalar value.
    ///
    /// # Errors
    /// Returns an error if no filters are set (unless `allow_unsafe` is used), or if a
    /// value is not a string, number, bool or null.
    #[tracing::instrument(skip(self, values), fields(table = T::table_name()))]
    pub async fn update(mut self, values: serde_json::Value) -> UserbaseResult<u64> {
        self.ensure_filtered("update")?;
        let obj = values.as_object().ok_or_else(|| {
            UserbaseError::Message("Bulk update requires a JSON object".to_string())
        })?;
        if obj.is_empty() {
            return Err(UserbaseError::Message(
                "Bulk update requires at least one column".to_string(),
            ));
        }

        let mut sql = String::with_capacity(256);
        let _ = write!(sql, "UPDATE {} SET ", T::table_name());
        for (i, k) in obj.keys().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            let _ = write!(
                sql,
                "{} = {}",
                DB::quote_identifier(k),
                DB::placeholder(i + 1)
            );
        }

        let mut where_binds = Vec::new();
        self.render_where_clause_into(&mut sql, &mut where_binds, obj.len() + 1)?;

        tracing::debug!(
            operation = "bulk_update",
            sql = %sql,
            filters = %self.format_filters_for_log(),
            "userbase query"
        );

        let mut query = sqlx::query::<DB>(&sql);
        for val in obj.values() {
            match val {
                serde_json::Value::String(s) => query = query.bind(s.clone()),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(v) => query = query.bind(v),
                    None => {
                        return Err(UserbaseError::Message(
                            "Only integer numbers are supported in bulk update".to_string(),
                        ));
                    }
                },
                serde_json::Value::Bool(b) => query = query.bind(*b),
                serde_json::Value::Null => query = query.bind(Option::<String>::None),
                _ => {
                    return Err(UserbaseError::Message(
                        "Unsupported type in bulk update".to_string(),
                    ));
                }
            }
        }
        for bind in where_binds {
            query = bind_value_query(query, bind);
        }

        let res = self.executor.execute(query).await?;
        Ok(DB::rows_affected(&res))
    }

    /// Executes a bulk delete of the matching rows and returns how many were removed.
    #[tracing::instrument(skip(self), fields(table = T::table_name()))]
    pub async fn delete(mut self) -> UserbaseResult<u64> {
        self.ensure_filtered("delete")?;

        let mut sql = String::with_capacity(128);
        let _ = write!(sql, "DELETE FROM {}", T::table_name());
        let mut where_binds = Vec::new();
        self.render_where_clause_into(&mut sql, &mut where_binds, 1)?;

        tracing::debug!(
            operation = "bulk_delete",
            sql = %sql,
            filters = %self.format_filters_for_log(),
            "userbase query"
        );
        let query = where_binds
            .into_iter()
            .fold(sqlx::query::<DB>(&sql), bind_value_query);
        let res = self.executor.execute(query).await?;
        Ok(DB::rows_affected(&res))
    }
}
