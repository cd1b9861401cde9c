use serde::Serialize;
use userbase_core::prelude::*;
use userbase_core::{SchemaTable, SqlDialect};

use crate::Db;

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub age: i32,
}

/// A row of the `posts` table, owned by a [`User`] through `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
}

/// Column values for a user that has not been inserted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewUser {
    pub name: &'static str,
    pub email: &'static str,
    pub age: i32,
}

/// Rows written by the seed step, in insertion order.
pub const SEED_USERS: [NewUser; 5] = [
    NewUser {
        name: "Francisco",
        email: "fco.silva.dev@gmail.com",
        age: 27,
    },
    NewUser {
        name: "Dasha",
        email: "dasha@gmail.com",
        age: 26,
    },
    NewUser {
        name: "John",
        email: "john_white@gmail.com",
        age: 32,
    },
    NewUser {
        name: "John",
        email: "john_west@gmail.com",
        age: 40,
    },
    NewUser {
        name: "John",
        email: "john_brown@gmail.com",
        age: 60,
    },
];

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(Db::placeholder)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Model<Db> for User {
    fn table_name() -> &'static str {
        "users"
    }

    fn create_table_sql() -> String {
        SchemaTable::new("users")
            .column("name", Db::text_type())
            .column("email", Db::text_type())
            .column("age", Db::int_type())
            .unique(&["email"])
            .unique(&["name", "email"])
            .to_create_sql::<Db>()
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name", "email", "age"]
    }

    fn relation(name: &str) -> Option<Relation> {
        match name {
            "written_posts" => Some(Relation {
                name: "written_posts",
                table: "posts",
                foreign_key: "author_id",
                local_key: "id",
            }),
            _ => None,
        }
    }

    async fn save<'a, E>(&'a mut self, executor: E) -> UserbaseResult<()>
    where
        E: IntoExecutor<'a, DB = Db>,
    {
        let mut executor = executor.into_executor();
        let mut sql = format!(
            "INSERT INTO users (name, email, age) VALUES ({})",
            placeholders(1, 3)
        );
        if Db::supports_returning() {
            sql.push_str(" RETURNING id");
            let query = sqlx::query_scalar::<Db, i32>(&sql)
                .bind(self.name.clone())
                .bind(self.email.clone())
                .bind(self.age);
            self.id = executor.fetch_scalar(query).await?;
        } else {
            let query = sqlx::query::<Db>(&sql)
                .bind(self.name.clone())
                .bind(self.email.clone())
                .bind(self.age);
            let res = executor.execute(query).await?;
            self.id = Db::last_insert_id(&res) as i32;
        }
        tracing::debug!(table = "users", id = self.id, "inserted row");
        Ok(())
    }

    async fn find_by_id<'a, E>(executor: E, id: i32) -> UserbaseResult<Option<Self>>
    where
        E: IntoExecutor<'a, DB = Db>,
    {
        User::find(executor).filter_eq("id", id).first().await
    }
}

impl User {
    /// Inserts all `rows` with one multi-row `INSERT` and returns how many were written.
    pub async fn insert_many<'a, E>(executor: E, rows: &[NewUser]) -> UserbaseResult<u64>
    where
        E: IntoExecutor<'a, DB = Db>,
    {
        if rows.is_empty() {
            return Ok(0);
        }
        let values = (0..rows.len())
            .map(|i| format!("({})", placeholders(i * 3 + 1, 3)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("INSERT INTO users (name, email, age) VALUES {}", values);
        tracing::debug!(operation = "insert_many", sql = %sql, rows = rows.len(), "userbase query");

        let mut query = sqlx::query::<Db>(&sql);
        for row in rows {
            query = query.bind(row.name).bind(row.email).bind(row.age);
        }
        let mut executor = executor.into_executor();
        let res = executor.execute(query).await?;
        Ok(Db::rows_affected(&res))
    }

    /// Looks a user up by the composite `(name, email)` key.
    pub async fn find_by_name_email<'a, E>(
        executor: E,
        name: &str,
        email: &str,
    ) -> UserbaseResult<Option<User>>
    where
        E: IntoExecutor<'a, DB = Db>,
    {
        User::find(executor)
            .filter_eq("name", name)
            .filter_eq("email", email)
            .first()
            .await
    }

    /// Loads the posts this user wrote, oldest first.
    pub async fn written_posts<'a, E>(&self, executor: E) -> UserbaseResult<Vec<Post>>
    where
        E: IntoExecutor<'a, DB = Db>,
    {
        Post::find(executor)
            .filter_eq("author_id", self.id)
            .order_by("id", Order::Asc)
            .all()
            .await
    }
}

impl Model<Db> for Post {
    fn table_name() -> &'static str {
        "posts"
    }

    fn create_table_sql() -> String {
        SchemaTable::new("posts")
            .column("title", Db::text_type())
            .column("author_id", Db::int_type())
            .references_cascade("author_id", "users", "id")
            .to_create_sql::<Db>()
    }

    fn columns() -> &'static [&'static str] {
        &["id", "title", "author_id"]
    }

    async fn save<'a, E>(&'a mut self, executor: E) -> UserbaseResult<()>
    where
        E: IntoExecutor<'a, DB = Db>,
    {
        let mut executor = executor.into_executor();
        let mut sql = format!(
            "INSERT INTO posts (title, author_id) VALUES ({})",
            placeholders(1, 2)
        );
        if Db::supports_returning() {
            sql.push_str(" RETURNING id");
            let query = sqlx::query_scalar::<Db, i32>(&sql)
                .bind(self.title.clone())
                .bind(self.author_id);
            self.id = executor.fetch_scalar(query).await?;
        } else {
            let query = sqlx::query::<Db>(&sql)
                .bind(self.title.clone())
                .bind(self.author_id);
            let res = executor.execute(query).await?;
            self.id = Db::last_insert_id(&res) as i32;
        }
        tracing::debug!(table = "posts", id = self.id, "inserted row");
        Ok(())
    }

    async fn find_by_id<'a, E>(executor: E, id: i32) -> UserbaseResult<Option<Self>>
    where
        E: IntoExecutor<'a, DB = Db>,
    {
        Post::find(executor).filter_eq("id", id).first().await
    }
}

impl Post {
    /// Loads the user who wrote this post.
    pub async fn author<'a, E>(&self, executor: E) -> UserbaseResult<Option<User>>
    where
        E: IntoExecutor<'a, DB = Db>,
    {
        User::find_by_id(executor, self.author_id).await
    }
}
