//! One function per demo step. Each issues one query (the update issues two),
//! prints a line naming the step and its result, and returns the data.

use serde::Serialize;
use serde_json::json;
use userbase_core::prelude::*;

use crate::DbPool;
use crate::models::{NewUser, User};

fn render<T: Serialize>(value: &T) -> UserbaseResult<String> {
    serde_json::to_string(value).map_err(|err| UserbaseError::Message(err.to_string()))
}

/// Deletes every user (posts go with them) and inserts `rows`.
#[tracing::instrument(skip_all)]
pub async fn reset_and_seed(pool: &DbPool, rows: &[NewUser]) -> UserbaseResult<u64> {
    let removed = User::find_in_pool(pool).allow_unsafe().delete().await?;
    tracing::info!(removed, "cleared users");

    let created = User::insert_many(pool, rows).await?;
    println!("Created users: {{\"count\":{}}}", created);
    Ok(created)
}

/// Fetches the single user with this `(name, email)` pair.
pub async fn find_by_composite_key(
    pool: &DbPool,
    name: &str,
    email: &str,
) -> UserbaseResult<Option<User>> {
    let user = User::find_by_name_email(pool, name, email).await?;
    println!("User: {}", render(&user)?);
    Ok(user)
}

/// Users named `name`, youngest first, skipping `skip` and taking at most `take`.
pub async fn list_ordered_page(
    pool: &DbPool,
    name: &str,
    skip: i32,
    take: i32,
) -> UserbaseResult<Vec<User>> {
    let users = User::find_in_pool(pool)
        .filter_eq("name", name)
        .order_by("age", Order::Asc)
        .offset(skip)
        .limit(take)
        .all()
        .await?;
    println!("User: {}", render(&users)?);
    Ok(users)
}

pub async fn count_by_name(pool: &DbPool, name: &str) -> UserbaseResult<i64> {
    let n = User::find_in_pool(pool).filter_eq("name", name).count().await?;
    println!("Quantity of users: {}", n);
    Ok(n)
}

pub async fn count_not_name(pool: &DbPool, name: &str) -> UserbaseResult<i64> {
    let n = User::find_in_pool(pool).filter_ne("name", name).count().await?;
    println!("Quantity of users notThis: {}", n);
    Ok(n)
}

pub async fn count_name_in(pool: &DbPool, names: &[&str]) -> UserbaseResult<i64> {
    let n = User::find_in_pool(pool)
        .filter_in("name", names.iter().copied())
        .count()
        .await?;
    println!("Quantity of users In: {}", n);
    Ok(n)
}

pub async fn count_older_than(pool: &DbPool, age: i32) -> UserbaseResult<i64> {
    let n = User::find_in_pool(pool).filter_gt("age", age).count().await?;
    println!("Quantity of users older than {}: {}", age, n);
    Ok(n)
}

pub async fn count_younger_than(pool: &DbPool, age: i32) -> UserbaseResult<i64> {
    let n = User::find_in_pool(pool).filter_lt("age", age).count().await?;
    println!("Quantity of users younger than {}: {}", age, n);
    Ok(n)
}

pub async fn count_email_contains(pool: &DbPool, needle: &str) -> UserbaseResult<i64> {
    let n = User::find_in_pool(pool)
        .filter_contains("email", needle)
        .count()
        .await?;
    println!("These users have the same email: {}", n);
    Ok(n)
}

pub async fn find_name_prefix(pool: &DbPool, prefix: &str) -> UserbaseResult<Vec<User>> {
    let users = User::find_in_pool(pool)
        .filter_starts_with("name", prefix)
        .all()
        .await?;
    println!("Users that has this first name: {}", render(&users)?);
    Ok(users)
}

/// Name prefix AND email substring, as one grouped filter.
pub async fn find_name_prefix_and_email(
    pool: &DbPool,
    prefix: &str,
    email_part: &str,
) -> UserbaseResult<Vec<User>> {
    let users = User::find_in_pool(pool)
        .filter_where(Filter::and([
            Filter::starts_with("name", prefix),
            Filter::contains("email", email_part),
        ]))
        .all()
        .await?;
    println!(
        "Users that has this first name and uses this email provider: {}",
        render(&users)?
    );
    Ok(users)
}

/// Users with at least one post whose title starts with `prefix`.
pub async fn find_with_post_title_prefix(
    pool: &DbPool,
    prefix: &str,
) -> UserbaseResult<Vec<User>> {
    let users = User::find_in_pool(pool)
        .filter_some("written_posts", [Filter::starts_with("title", prefix)])
        .all()
        .await?;
    println!(
        "Users that has written posts with this title: {}",
        render(&users)?
    );
    Ok(users)
}

/// Changes the email of the user currently holding `from` and returns the updated row.
///
/// Fails with [`UserbaseError::NotFound`] when no user has that email.
pub async fn update_email(pool: &DbPool, from: &str, to: &str) -> UserbaseResult<User> {
    let not_found = || UserbaseError::NotFound {
        table: "users",
        key: format!("email = {}", from),
    };

    let changed = User::find_in_pool(pool)
        .filter_eq("email", from)
        .update(json!({ "email": to }))
        .await?;
    if changed == 0 {
        return Err(not_found());
    }

    let user = User::find_in_pool(pool)
        .filter_eq("email", to)
        .first()
        .await?
        .ok_or_else(not_found)?;
    println!("The email was updated with success: {}", render(&user)?);
    Ok(user)
}
