//! SQLite store implementation
//!
//! One pool backs every persistence port. Vote toggles run in their own
//! transaction, see [`votes`].

mod accounts;
mod comments;
mod news;
mod votes;

use newsdesk_domain::StoreError;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;

/// How long a connection waits for the database write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        uid INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        profile_pic TEXT,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS news (
        newsid INTEGER PRIMARY KEY AUTOINCREMENT,
        createdby INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
        title TEXT NOT NULL,
        category TEXT NOT NULL,
        banner_url TEXT NOT NULL,
        image_url TEXT NOT NULL,
        content TEXT NOT NULL,
        summary TEXT NOT NULL,
        likes INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comment (
        commentid INTEGER PRIMARY KEY AUTOINCREMENT,
        uid INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
        newsid INTEGER NOT NULL REFERENCES news(newsid) ON DELETE CASCADE,
        comment TEXT NOT NULL,
        votes INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS likednews (
        uid INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
        newsid INTEGER NOT NULL REFERENCES news(newsid) ON DELETE CASCADE,
        like_status TEXT NOT NULL CHECK (like_status IN ('Like', 'Dislike')),
        PRIMARY KEY (uid, newsid)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS likedcomment (
        uid INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
        commentid INTEGER NOT NULL REFERENCES comment(commentid) ON DELETE CASCADE,
        like_status TEXT NOT NULL CHECK (like_status IN ('Like', 'Dislike')),
        PRIMARY KEY (uid, commentid)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS savednews (
        uid INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
        newsid INTEGER NOT NULL REFERENCES news(newsid) ON DELETE CASCADE,
        PRIMARY KEY (uid, newsid)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_news_created ON news(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_news_category ON news(category, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_comment_news ON comment(newsid, created_at)",
];

/// SQLite-backed store for accounts, news, comments and votes
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and apply the schema
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = "sqlite::memory:"
            .parse::<SqliteConnectOptions>()
            .map_err(|e| StoreError::Database(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Apply the schema; every statement is idempotent
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        tracing::debug!(statements = SCHEMA.len(), "Applied schema");
        Ok(())
    }

    /// Cheap round trip used by `doctor`
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Map a driver error, surfacing constraint failures as domain errors
pub(crate) fn db_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return StoreError::NotFound(format!("referenced row does not exist: {}", db.message()));
        }
        if db.is_unique_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Database(err.to_string())
}

/// Timestamps are stored as integer nanoseconds since the epoch so they sort numerically
pub(crate) fn to_nanos(at: OffsetDateTime) -> Result<i64, StoreError> {
    i64::try_from(at.unix_timestamp_nanos())
        .map_err(|_| StoreError::Serialization(format!("timestamp {} out of range", at)))
}

pub(crate) fn from_nanos(nanos: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .map_err(|e| StoreError::Serialization(e.to_string()))
}
