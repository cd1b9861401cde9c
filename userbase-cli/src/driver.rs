use userbase_core::prelude::*;

use crate::config::Config;
use crate::models::{NewUser, Post, SEED_USERS, User};
use crate::ops;
use crate::{Db, DbPool};

/// Literal arguments for every step of the script.
#[derive(Debug, Clone)]
pub struct DemoInputs {
    pub seed: Vec<NewUser>,
    pub lookup_name: &'static str,
    pub lookup_email: &'static str,
    pub page_name: &'static str,
    pub page_skip: i32,
    pub page_take: i32,
    pub count_name: &'static str,
    pub name_set: Vec<&'static str>,
    pub age_threshold: i32,
    pub email_part: &'static str,
    pub first_name_prefix: &'static str,
    pub compound_name_prefix: &'static str,
    pub post_title_prefix: &'static str,
    pub update_from: &'static str,
    pub update_to: &'static str,
}

impl Default for DemoInputs {
    fn default() -> Self {
        Self {
            seed: SEED_USERS.to_vec(),
            lookup_name: "Francisco",
            lookup_email: "fco.silva.dev@gmail.com",
            page_name: "John",
            page_skip: 1,
            page_take: 3,
            count_name: "John",
            name_set: vec!["Francisco", "Dasha"],
            age_threshold: 30,
            email_part: "@gmail.com",
            first_name_prefix: "Fran",
            compound_name_prefix: "Das",
            post_title_prefix: "Test",
            update_from: "john_brown@gmail.com",
            update_to: "john_yellow@gmail.com",
        }
    }
}

/// What each step returned.
#[derive(Debug, Clone, Default)]
pub struct ScriptReport {
    /// `None` when the seed step failed.
    pub seeded: Option<u64>,
    pub composite_lookup: Option<User>,
    pub ordered_page: Vec<User>,
    pub count_by_name: i64,
    pub count_not_name: i64,
    pub count_name_in: i64,
    pub count_older: i64,
    pub count_younger: i64,
    pub count_email_contains: i64,
    pub name_prefix: Vec<User>,
    pub name_prefix_and_email: Vec<User>,
    pub post_title_prefix: Vec<User>,
    pub updated: Option<User>,
}

/// Creates the `users` and `posts` tables if they are missing.
pub async fn ensure_schema(pool: &DbPool) -> UserbaseResult<()> {
    Userbase::sync::<Db, User>(pool).await?;
    Userbase::sync::<Db, Post>(pool).await?;
    Ok(())
}

/// Runs every step in order, one at a time.
///
/// A failing seed step is logged and the remaining steps still run. Any later
/// failure stops the sequence and is returned.
pub async fn run_script(pool: &DbPool, inputs: &DemoInputs) -> UserbaseResult<ScriptReport> {
    let mut report = ScriptReport {
        seeded: match ops::reset_and_seed(pool, &inputs.seed).await {
            Ok(n) => Some(n),
            Err(err) => {
                tracing::error!(error = %err, "seed step failed");
                eprintln!("Error: {}", err);
                None
            }
        },
        ..ScriptReport::default()
    };

    report.composite_lookup =
        ops::find_by_composite_key(pool, inputs.lookup_name, inputs.lookup_email).await?;
    report.ordered_page =
        ops::list_ordered_page(pool, inputs.page_name, inputs.page_skip, inputs.page_take)
            .await?;
    report.count_by_name = ops::count_by_name(pool, inputs.count_name).await?;
    report.count_not_name = ops::count_not_name(pool, inputs.count_name).await?;
    report.count_name_in = ops::count_name_in(pool, &inputs.name_set).await?;
    report.count_older = ops::count_older_than(pool, inputs.age_threshold).await?;
    report.count_younger = ops::count_younger_than(pool, inputs.age_threshold).await?;
    report.count_email_contains = ops::count_email_contains(pool, inputs.email_part).await?;
    report.name_prefix = ops::find_name_prefix(pool, inputs.first_name_prefix).await?;
    report.name_prefix_and_email =
        ops::find_name_prefix_and_email(pool, inputs.compound_name_prefix, inputs.email_part)
            .await?;
    report.post_title_prefix =
        ops::find_with_post_title_prefix(pool, inputs.post_title_prefix).await?;
    report.updated = Some(ops::update_email(pool, inputs.update_from, inputs.update_to).await?);

    tracing::info!("script finished");
    Ok(report)
}

#[cfg(feature = "postgres")]
async fn connect(url: &str) -> Result<DbPool, sqlx::Error> {
    Userbase::postgres_pool(url).await
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
async fn connect(url: &str) -> Result<DbPool, sqlx::Error> {
    Userbase::sqlite_pool(url).await
}

/// Connects, runs the script, and closes the pool whether or not the script failed.
pub async fn run(config: &Config) -> UserbaseResult<ScriptReport> {
    tracing::info!(database = %config.database_url, "connecting");
    let pool = connect(&config.database_url).await?;

    let result = run_with_pool(&pool, config.sync).await;

    pool.close().await;
    println!("Disconnected from DB");
    result
}

async fn run_with_pool(pool: &DbPool, sync: bool) -> UserbaseResult<ScriptReport> {
    if sync {
        ensure_schema(pool).await?;
    }
    run_script(pool, &DemoInputs::default()).await
}
