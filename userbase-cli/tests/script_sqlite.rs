#![cfg(all(feature = "sqlite", not(feature = "postgres")))]

use userbase_cli::DbPool;
use userbase_cli::driver::{DemoInputs, ensure_schema, run_script};
use userbase_cli::models::{NewUser, Post, SEED_USERS, User};
use userbase_cli::ops;
use userbase_core::prelude::*;
use userbase_core::test_utils::MockDatabase;

async fn seeded_pool() -> DbPool {
    let db = MockDatabase::new_sqlite().await.unwrap();
    let pool = db.into_pool();
    ensure_schema(&pool).await.unwrap();
    ops::reset_and_seed(&pool, &SEED_USERS).await.unwrap();
    pool
}

fn ages(users: &[User]) -> Vec<i32> {
    users.iter().map(|u| u.age).collect()
}

async fn stored_rows(pool: &DbPool) -> Vec<(String, String, i32)> {
    User::find_in_pool(pool)
        .order_by("id", Order::Asc)
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|u| (u.name, u.email, u.age))
        .collect()
}

fn seed_rows() -> Vec<(String, String, i32)> {
    SEED_USERS
        .iter()
        .map(|u| (u.name.to_string(), u.email.to_string(), u.age))
        .collect()
}

#[tokio::test]
async fn seed_leaves_exactly_the_five_seed_rows() {
    let pool = seeded_pool().await;
    let first = stored_rows(&pool).await;
    assert_eq!(first, seed_rows());

    ops::update_email(&pool, "john_brown@gmail.com", "john_yellow@gmail.com")
        .await
        .unwrap();
    let created = ops::reset_and_seed(&pool, &SEED_USERS).await.unwrap();
    assert_eq!(created, 5);
    assert_eq!(stored_rows(&pool).await, first);
}

#[tokio::test]
async fn substring_and_prefix_filters_respect_case() {
    let pool = seeded_pool().await;
    assert_eq!(ops::count_email_contains(&pool, "@GMAIL.COM").await.unwrap(), 0);
    assert!(ops::find_name_prefix(&pool, "fran").await.unwrap().is_empty());
    assert!(
        ops::find_name_prefix_and_email(&pool, "das", "@gmail.com")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn seed_clears_posts_with_their_authors() {
    let pool = seeded_pool().await;
    let author = ops::find_by_composite_key(&pool, "Dasha", "dasha@gmail.com")
        .await
        .unwrap()
        .unwrap();
    let mut post = Post {
        id: 0,
        title: "Draft".to_string(),
        author_id: author.id,
    };
    post.save(&pool).await.unwrap();

    ops::reset_and_seed(&pool, &SEED_USERS).await.unwrap();
    assert_eq!(Post::find_in_pool(&pool).count().await.unwrap(), 0);
}

#[tokio::test]
async fn composite_key_lookup() {
    let pool = seeded_pool().await;

    let found = ops::find_by_composite_key(&pool, "Francisco", "fco.silva.dev@gmail.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.age, 27);

    let missing = ops::find_by_composite_key(&pool, "Francisco", "dasha@gmail.com")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn ordered_page_skips_youngest_john() {
    let pool = seeded_pool().await;
    let page = ops::list_ordered_page(&pool, "John", 1, 3).await.unwrap();
    assert_eq!(ages(&page), vec![40, 60]);
    assert!(page.iter().all(|u| u.name == "John"));

    let empty = ops::list_ordered_page(&pool, "John", 5, 3).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn counts_match_seed_data() {
    let pool = seeded_pool().await;
    assert_eq!(ops::count_by_name(&pool, "John").await.unwrap(), 3);
    assert_eq!(ops::count_not_name(&pool, "John").await.unwrap(), 2);
    assert_eq!(
        ops::count_name_in(&pool, &["Francisco", "Dasha"]).await.unwrap(),
        2
    );
    assert_eq!(ops::count_name_in(&pool, &[]).await.unwrap(), 0);
    assert_eq!(ops::count_older_than(&pool, 30).await.unwrap(), 3);
    assert_eq!(ops::count_younger_than(&pool, 30).await.unwrap(), 2);
    assert_eq!(ops::count_email_contains(&pool, "@gmail.com").await.unwrap(), 5);
    assert_eq!(ops::count_email_contains(&pool, "_").await.unwrap(), 3);
}

#[tokio::test]
async fn prefix_searches() {
    let pool = seeded_pool().await;

    let fran = ops::find_name_prefix(&pool, "Fran").await.unwrap();
    assert_eq!(fran.len(), 1);
    assert_eq!(fran[0].name, "Francisco");

    let das = ops::find_name_prefix_and_email(&pool, "Das", "@gmail.com")
        .await
        .unwrap();
    assert_eq!(das.len(), 1);
    assert_eq!(das[0].email, "dasha@gmail.com");

    let none = ops::find_name_prefix_and_email(&pool, "Das", "@yahoo.com")
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn post_title_prefix_matches_authors() {
    let pool = seeded_pool().await;
    assert!(
        ops::find_with_post_title_prefix(&pool, "Test")
            .await
            .unwrap()
            .is_empty()
    );

    let author = ops::find_by_composite_key(&pool, "Francisco", "fco.silva.dev@gmail.com")
        .await
        .unwrap()
        .unwrap();
    for title in ["Testing sqlx", "Test drive", "Other"] {
        let mut post = Post {
            id: 0,
            title: title.to_string(),
            author_id: author.id,
        };
        post.save(&pool).await.unwrap();
    }

    let users = ops::find_with_post_title_prefix(&pool, "Test").await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, author.id);

    let posts = author.written_posts(&pool).await.unwrap();
    assert_eq!(posts.len(), 3);
    let back = posts[0].author(&pool).await.unwrap().unwrap();
    assert_eq!(back, author);
}

#[tokio::test]
async fn update_changes_exactly_one_row() {
    let pool = seeded_pool().await;
    let before = User::find_in_pool(&pool)
        .filter_eq("email", "john_brown@gmail.com")
        .first()
        .await
        .unwrap()
        .unwrap();

    let updated = ops::update_email(&pool, "john_brown@gmail.com", "john_yellow@gmail.com")
        .await
        .unwrap();
    assert_eq!(updated.id, before.id);
    assert_eq!(updated.email, "john_yellow@gmail.com");
    assert_eq!(updated.age, 60);

    let old = User::find_in_pool(&pool)
        .filter_eq("email", "john_brown@gmail.com")
        .count()
        .await
        .unwrap();
    assert_eq!(old, 0);
    assert_eq!(User::find_in_pool(&pool).count().await.unwrap(), 5);
    assert_eq!(ops::count_by_name(&pool, "John").await.unwrap(), 3);
}

#[tokio::test]
async fn update_of_missing_email_is_not_found() {
    let pool = seeded_pool().await;
    let err = ops::update_email(&pool, "nobody@gmail.com", "someone@gmail.com")
        .await
        .unwrap_err();
    assert!(matches!(err, UserbaseError::NotFound { table: "users", .. }));

    let emails: Vec<String> = User::find_in_pool(&pool)
        .order_by("id", Order::Asc)
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.email)
        .collect();
    let expected: Vec<String> = seed_rows().into_iter().map(|(_, email, _)| email).collect();
    assert_eq!(emails, expected);
}

#[tokio::test]
async fn update_into_taken_email_is_rejected() {
    let pool = seeded_pool().await;
    let err = ops::update_email(&pool, "john_brown@gmail.com", "dasha@gmail.com")
        .await
        .unwrap_err();
    assert!(matches!(err, UserbaseError::Sqlx(_)));
}

#[tokio::test]
async fn script_runs_end_to_end() {
    let db = MockDatabase::new_sqlite().await.unwrap();
    let pool = db.into_pool();
    ensure_schema(&pool).await.unwrap();

    let report = run_script(&pool, &DemoInputs::default()).await.unwrap();
    assert_eq!(report.seeded, Some(5));
    assert_eq!(report.composite_lookup.map(|u| u.age), Some(27));
    assert_eq!(ages(&report.ordered_page), vec![40, 60]);
    assert_eq!(report.count_by_name, 3);
    assert_eq!(report.count_not_name, 2);
    assert_eq!(report.count_name_in, 2);
    assert_eq!(report.count_older, 3);
    assert_eq!(report.count_younger, 2);
    assert_eq!(report.count_email_contains, 5);
    assert_eq!(report.name_prefix.len(), 1);
    assert_eq!(report.name_prefix_and_email.len(), 1);
    assert!(report.post_title_prefix.is_empty());
    assert_eq!(
        report.updated.map(|u| u.email),
        Some("john_yellow@gmail.com".to_string())
    );

    // Second run reseeds, so the update finds john_brown again.
    let again = run_script(&pool, &DemoInputs::default()).await.unwrap();
    assert_eq!(again.seeded, Some(5));
}

#[tokio::test]
async fn failed_seed_does_not_stop_later_steps() {
    let db = MockDatabase::new_sqlite().await.unwrap();
    let pool = db.into_pool();
    ensure_schema(&pool).await.unwrap();

    let duplicate = NewUser {
        name: "Dasha",
        email: "dasha@gmail.com",
        age: 26,
    };
    let inputs = DemoInputs {
        seed: vec![duplicate, duplicate],
        ..DemoInputs::default()
    };

    // The seed insert violates UNIQUE(email) and writes nothing; the script
    // carries on until the update finds no john_brown row.
    let err = run_script(&pool, &inputs).await.unwrap_err();
    assert!(matches!(err, UserbaseError::NotFound { table: "users", .. }));
    assert_eq!(User::find_in_pool(&pool).count().await.unwrap(), 0);
}
