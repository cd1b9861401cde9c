#![cfg(feature = "sqlite")]

use futures_util::StreamExt;
use serde_json::json;
use sqlx::{Row, Sqlite, SqlitePool, sqlite::SqliteRow};
use userbase_core::prelude::*;
use userbase_core::SchemaTable;
use userbase_core::test_utils::{MockDatabase, with_test_transaction};

#[derive(Debug, Clone)]
struct Team {
    id: i32,
    name: String,
    rank: i32,
}

#[derive(Debug, Clone)]
struct Player {
    id: i32,
    team_id: i32,
    handle: String,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Team {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            rank: row.try_get("rank")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Player {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            team_id: row.try_get("team_id")?,
            handle: row.try_get("handle")?,
        })
    }
}

impl Model<Sqlite> for Team {
    fn table_name() -> &'static str {
        "teams"
    }
    fn create_table_sql() -> String {
        SchemaTable::new("teams")
            .column("name", "TEXT")
            .column("rank", "INTEGER")
            .unique(&["name"])
            .to_create_sql::<Sqlite>()
    }
    fn columns() -> &'static [&'static str] {
        &["id", "name", "rank"]
    }
    fn relation(name: &str) -> Option<Relation> {
        match name {
            "players" => Some(Relation {
                name: "players",
                table: "players",
                foreign_key: "team_id",
                local_key: "id",
            }),
            _ => None,
        }
    }
    async fn save<'a, E>(&'a mut self, executor: E) -> UserbaseResult<()>
    where
        E: IntoExecutor<'a, DB = Sqlite>,
    {
        let mut executor = executor.into_executor();
        let query = sqlx::query::<Sqlite>("INSERT INTO teams (name, rank) VALUES (?, ?)")
            .bind(self.name.clone())
            .bind(self.rank);
        let res = executor.execute(query).await?;
        self.id = res.last_insert_rowid() as i32;
        Ok(())
    }
    async fn find_by_id<'a, E>(executor: E, id: i32) -> UserbaseResult<Option<Self>>
    where
        E: IntoExecutor<'a, DB = Sqlite>,
    {
        Self::find(executor).filter_eq("id", id).first().await
    }
}

impl Model<Sqlite> for Player {
    fn table_name() -> &'static str {
        "players"
    }
    fn create_table_sql() -> String {
        SchemaTable::new("players")
            .column("team_id", "INTEGER")
            .column("handle", "TEXT")
            .references_cascade("team_id", "teams", "id")
            .to_create_sql::<Sqlite>()
    }
    fn columns() -> &'static [&'static str] {
        &["id", "team_id", "handle"]
    }
    async fn save<'a, E>(&'a mut self, executor: E) -> UserbaseResult<()>
    where
        E: IntoExecutor<'a, DB = Sqlite>,
    {
        let mut executor = executor.into_executor();
        let query = sqlx::query::<Sqlite>("INSERT INTO players (team_id, handle) VALUES (?, ?)")
            .bind(self.team_id)
            .bind(self.handle.clone());
        let res = executor.execute(query).await?;
        self.id = res.last_insert_rowid() as i32;
        Ok(())
    }
    async fn find_by_id<'a, E>(executor: E, id: i32) -> UserbaseResult<Option<Self>>
    where
        E: IntoExecutor<'a, DB = Sqlite>,
    {
        Self::find(executor).filter_eq("id", id).first().await
    }
}

async fn setup_pool() -> SqlitePool {
    let pool = MockDatabase::new_sqlite().await.expect("pool").into_pool();
    Userbase::sync::<Sqlite, Team>(&pool).await.expect("sync");
    Userbase::sync::<Sqlite, Player>(&pool).await.expect("sync");
    pool
}

async fn seed_teams(pool: &SqlitePool, rows: &[(&str, i32)]) -> Vec<Team> {
    let mut teams = Vec::with_capacity(rows.len());
    for (name, rank) in rows {
        let mut team = Team {
            id: 0,
            name: name.to_string(),
            rank: *rank,
        };
        team.save(pool).await.expect("save");
        teams.push(team);
    }
    teams
}

#[tokio::test]
async fn save_assigns_ids_and_find_by_id_reads_back() {
    let pool = setup_pool().await;
    let teams = seed_teams(&pool, &[("red", 1), ("blue", 2)]).await;
    assert!(teams[0].id > 0);
    assert_ne!(teams[0].id, teams[1].id);

    let found = Team::find_by_id(&pool, teams[1].id).await.unwrap().unwrap();
    assert_eq!(found.name, "blue");
    assert!(Team::find_by_id(&pool, 999).await.unwrap().is_none());
}

#[tokio::test]
async fn count_ignores_pagination() {
    let pool = setup_pool().await;
    seed_teams(&pool, &[("a", 1), ("b", 2), ("c", 3)]).await;
    let n = Team::find_in_pool(&pool)
        .filter_gt("rank", 1)
        .limit(1)
        .offset(1)
        .count()
        .await
        .unwrap();
    assert_eq!(n, 2);
}

#[tokio::test]
async fn offset_applies_before_limit() {
    let pool = setup_pool().await;
    seed_teams(&pool, &[("a", 3), ("b", 1), ("c", 2), ("d", 4)]).await;
    let page = Team::find_in_pool(&pool)
        .order_by("rank", Order::Asc)
        .offset(1)
        .limit(2)
        .all()
        .await
        .unwrap();
    let ranks: Vec<i32> = page.iter().map(|t| t.rank).collect();
    assert_eq!(ranks, vec![2, 3]);

    let tail = Team::find_in_pool(&pool)
        .order_by("rank", Order::Desc)
        .offset(3)
        .all()
        .await
        .unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].rank, 1);
}

#[tokio::test]
async fn like_metacharacters_match_literally() {
    let pool = setup_pool().await;
    seed_teams(&pool, &[("red_team", 1), ("redXteam", 2), ("100%", 3)]).await;

    let underscored = Team::find_in_pool(&pool)
        .filter_contains("name", "d_t")
        .all()
        .await
        .unwrap();
    assert_eq!(underscored.len(), 1);
    assert_eq!(underscored[0].name, "red_team");

    let percent = Team::find_in_pool(&pool)
        .filter_ends_with("name", "0%")
        .count()
        .await
        .unwrap();
    assert_eq!(percent, 1);
}

#[tokio::test]
async fn substring_filters_are_case_sensitive() {
    let pool = setup_pool().await;
    seed_teams(&pool, &[("Red", 1), ("red", 2)]).await;

    let upper = Team::find_in_pool(&pool)
        .filter_starts_with("name", "R")
        .all()
        .await
        .unwrap();
    assert_eq!(upper.len(), 1);
    assert_eq!(upper[0].name, "Red");

    let shouted = Team::find_in_pool(&pool)
        .filter_contains("name", "ED")
        .count()
        .await
        .unwrap();
    assert_eq!(shouted, 0);
}

#[tokio::test]
async fn relation_filter_keeps_only_owners_with_matching_rows() {
    let pool = setup_pool().await;
    let teams = seed_teams(&pool, &[("red", 1), ("blue", 2), ("green", 3)]).await;
    for (team, handle) in [(&teams[0], "TestPilot"), (&teams[1], "Ace")] {
        let mut player = Player {
            id: 0,
            team_id: team.id,
            handle: handle.to_string(),
        };
        player.save(&pool).await.unwrap();
    }

    let matched = Team::find_in_pool(&pool)
        .filter_some("players", [Filter::starts_with("handle", "Test")])
        .all()
        .await
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "red");

    let with_any_player = Team::find_in_pool(&pool)
        .filter_some("players", [])
        .count()
        .await
        .unwrap();
    assert_eq!(with_any_player, 2);
}

#[tokio::test]
async fn unknown_relation_fails_at_execution() {
    let pool = setup_pool().await;
    let err = Team::find_in_pool(&pool)
        .filter_some("coaches", [])
        .all()
        .await
        .unwrap_err();
    match err {
        UserbaseError::UnknownRelation { table, relation } => {
            assert_eq!(table, "teams");
            assert_eq!(relation, "coaches");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn bulk_update_and_delete_report_rows_affected() {
    let pool = setup_pool().await;
    seed_teams(&pool, &[("a", 1), ("b", 2), ("c", 3)]).await;

    let updated = Team::find_in_pool(&pool)
        .filter_in("name", ["a", "b"])
        .update(json!({ "rank": 10 }))
        .await
        .unwrap();
    assert_eq!(updated, 2);

    let missing = Team::find_in_pool(&pool)
        .filter_eq("name", "zzz")
        .update(json!({ "rank": 0 }))
        .await
        .unwrap();
    assert_eq!(missing, 0);

    let deleted = Team::find_in_pool(&pool)
        .filter_eq("rank", 10)
        .delete()
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    let cleared = Team::find_in_pool(&pool)
        .allow_unsafe()
        .delete()
        .await
        .unwrap();
    assert_eq!(cleared, 1);
}

#[tokio::test]
async fn deleting_owner_cascades_to_related_rows() {
    let pool = setup_pool().await;
    let teams = seed_teams(&pool, &[("red", 1)]).await;
    let mut player = Player {
        id: 0,
        team_id: teams[0].id,
        handle: "solo".to_string(),
    };
    player.save(&pool).await.unwrap();

    Team::find_in_pool(&pool)
        .allow_unsafe()
        .delete()
        .await
        .unwrap();
    assert_eq!(Player::find_in_pool(&pool).count().await.unwrap(), 0);
}

#[tokio::test]
async fn unique_constraint_rejects_duplicates() {
    let pool = setup_pool().await;
    seed_teams(&pool, &[("red", 1)]).await;
    let mut dup = Team {
        id: 0,
        name: "red".to_string(),
        rank: 2,
    };
    let err = dup.save(&pool).await.unwrap_err();
    assert!(matches!(err, UserbaseError::Sqlx(_)));
}

#[tokio::test]
async fn queries_run_inside_rolled_back_transaction() {
    let pool = setup_pool().await;
    let inside = with_test_transaction(&pool, |conn| {
        Box::pin(async move {
            let mut team = Team {
                id: 0,
                name: "temp".to_string(),
                rank: 1,
            };
            team.save(&mut *conn).await?;
            Team::find_in_tx(conn).count().await
        })
    })
    .await
    .unwrap();
    assert_eq!(inside, 1);
    assert_eq!(Team::find_in_pool(&pool).count().await.unwrap(), 0);
}

#[tokio::test]
async fn stream_yields_filtered_rows() {
    let pool = setup_pool().await;
    seed_teams(&pool, &[("a", 1), ("b", 2), ("c", 3)]).await;
    let mut stream = Team::find_in_pool(&pool)
        .filter_gte("rank", 2)
        .stream()
        .unwrap();
    let mut names = Vec::new();
    while let Some(row) = stream.next().await {
        names.push(row.unwrap().name);
    }
    names.sort();
    assert_eq!(names, vec!["b", "c"]);
}
