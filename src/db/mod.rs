//! SQLite persistence for planner snapshots.
//!
//! The core works on in-memory snapshots; only the binary loads and saves them.

mod repository;

pub use repository::*;

use std::future::Future;
use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::errors::Result;
use crate::models::Snapshot;

pub const SCHEMA_VERSION: i64 = 1;

/// Where snapshots are loaded from and saved to.
pub trait SnapshotStore {
    fn load(&self) -> impl Future<Output = Result<Snapshot>> + Send;

    /// Replace the persisted snapshot with `snapshot`.
    fn save(&self, snapshot: &Snapshot) -> impl Future<Output = Result<()>> + Send;
}

/// Open (or create) the database and run migrations.
pub async fn init_database(db_path: &Path) -> std::result::Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            owner TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS areas (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            contact TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS topics (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT,
            cadence TEXT,
            start_date TEXT,
            due_strategy TEXT,
            due_offset_days INTEGER,
            expected_deliverable TEXT NOT NULL DEFAULT '',
            priority TEXT NOT NULL,
            status TEXT NOT NULL,
            tags TEXT,
            last_request_date TEXT,
            next_request_date TEXT
        );

        CREATE TABLE IF NOT EXISTS topic_areas (
            topic_id TEXT NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
            area_id TEXT NOT NULL REFERENCES areas(id) ON DELETE CASCADE,
            PRIMARY KEY (topic_id, area_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS request_logs (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            topic_id TEXT NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
            to_area_id TEXT NOT NULL REFERENCES areas(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            sent_by TEXT NOT NULL,
            notes TEXT,
            outcome TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS undo_history (
            seq INTEGER PRIMARY KEY,
            payload TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_topics_team_id ON topics(team_id);
        CREATE INDEX IF NOT EXISTS idx_topics_next_request_date ON topics(next_request_date);
        CREATE INDEX IF NOT EXISTS idx_topic_areas_area_id ON topic_areas(area_id);
        CREATE INDEX IF NOT EXISTS idx_request_logs_topic_id ON request_logs(topic_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
