/// Storage-level tests for the report flow
///
/// Note: These exercise the SQLite schema invariants directly — the unique
/// reporter index and the insert-count-act transaction shape. End-to-end
/// behavior is covered by the unit tests inside the crate.
use sqlx::SqlitePool;

async fn setup_pool() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();

    sqlx::query(
        r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        r#"
        CREATE TABLE posts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id)
        );
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        r#"
        CREATE TABLE reports (
            id INTEGER PRIMARY KEY,
            post_id INTEGER NOT NULL REFERENCES posts(id),
            reporter_user_id INTEGER NOT NULL REFERENCES users(id),
            UNIQUE(post_id, reporter_user_id)
        );
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO users (id, name, is_active) VALUES (1, 'Owner', 1)")
        .execute(&pool)
        .await
        .unwrap();
    for i in 2..=10 {
        sqlx::query("INSERT INTO users (id, name, is_active) VALUES (?1, 'Reporter', 1)")
            .bind(i)
            .execute(&pool)
            .await
            .unwrap();
    }
    sqlx::query("INSERT INTO posts (id, user_id) VALUES (10, 1)")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

#[tokio::test]
async fn unique_index_rejects_second_report_from_same_user() {
    let pool = setup_pool().await;

    sqlx::query("INSERT INTO reports (post_id, reporter_user_id) VALUES (10, 2)")
        .execute(&pool)
        .await
        .unwrap();

    let err = sqlx::query("INSERT INTO reports (post_id, reporter_user_id) VALUES (10, 2)")
        .execute(&pool)
        .await
        .unwrap_err();

    match err {
        sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
        other => panic!("expected database error, got {:?}", other),
    }
}

#[tokio::test]
async fn same_user_may_report_different_posts() {
    let pool = setup_pool().await;

    sqlx::query("INSERT INTO posts (id, user_id) VALUES (11, 1)")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO reports (post_id, reporter_user_id) VALUES (10, 2)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO reports (post_id, reporter_user_id) VALUES (11, 2)")
        .execute(&pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn insert_count_deactivate_runs_as_one_transaction() {
    let pool = setup_pool().await;

    // Four prior reports
    for reporter in 2..=5 {
        sqlx::query("INSERT INTO reports (post_id, reporter_user_id) VALUES (10, ?1)")
            .bind(reporter)
            .execute(&pool)
            .await
            .unwrap();
    }

    // The fifth report and the owner deactivation commit together
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("INSERT INTO reports (post_id, reporter_user_id) VALUES (10, 6)")
        .execute(&mut *tx)
        .await
        .unwrap();
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE post_id = 10")
        .fetch_one(&mut *tx)
        .await
        .unwrap();
    assert_eq!(total, 5);
    sqlx::query("UPDATE users SET is_active = 0 WHERE id = 1")
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let active: bool = sqlx::query_scalar("SELECT is_active FROM users WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!active);
}

#[tokio::test]
async fn rolled_back_report_leaves_no_trace() {
    let pool = setup_pool().await;

    let mut tx = pool.begin().await.unwrap();
    sqlx::query("INSERT INTO reports (post_id, reporter_user_id) VALUES (10, 2)")
        .execute(&mut *tx)
        .await
        .unwrap();
    drop(tx); // implicit rollback

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE post_id = 10")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 0);
}
