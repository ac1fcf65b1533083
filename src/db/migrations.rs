use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        debug!("Running migration v2");
        run_migration_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM _schema_version")
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(&mut *tx)
        .await?;
    tx.commit().await.context("Failed to record schema version")?;
    Ok(())
}

async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v1: creating posts and replies");

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL DEFAULT '',
            created_at_raw TEXT NOT NULL DEFAULT '',
            created_at_epoch REAL NOT NULL DEFAULT 0.0,
            reposts_count INTEGER NOT NULL DEFAULT 0,
            comments_count INTEGER NOT NULL DEFAULT 0,
            attitudes_count INTEGER NOT NULL DEFAULT 0,
            image_urls TEXT NOT NULL DEFAULT '[]',
            raw_payload TEXT NOT NULL DEFAULT '{}'
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create posts table")?;

    // Only comments the tracked account answered are stored.
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS replies (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL REFERENCES posts(id),
            commenter_name TEXT NOT NULL DEFAULT '',
            commenter_text TEXT NOT NULL DEFAULT '',
            commenter_created_at TEXT NOT NULL DEFAULT '',
            reply_text TEXT,
            reply_created_at TEXT
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create replies table")?;

    Ok(())
}

async fn run_migration_v2(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v2: listing indexes");

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_created_at_epoch ON posts(created_at_epoch)")
        .execute(pool)
        .await
        .context("Failed to create posts epoch index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_replies_post_id ON replies(post_id)")
        .execute(pool)
        .await
        .context("Failed to create replies post index")?;

    Ok(())
}
