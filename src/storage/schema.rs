use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::CacheError;

// ============================================================================
// Database
// ============================================================================

/// SQLite-backed cache store.
///
/// Holds two collections: `feed_items` keyed by item id and `blog_summaries`
/// keyed by source id. Both are written wholesale by the pipeline and read
/// back newest-first through their timestamp indexes.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open the cache file (created if missing) and make sure the schema exists.
    ///
    /// `":memory:"` opens a private in-memory database backed by a single
    /// connection, which is what the tests use.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if the file cannot be opened and
    /// `CacheError::Migration` if table or index creation fails.
    pub async fn open(path: &str) -> Result<Self, CacheError> {
        let in_memory = path == ":memory:";
        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        // busy_timeout=5000: a second process refreshing the same cache waits
        // for the write lock instead of failing immediately.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| CacheError::Unavailable(e.to_string()))?
            .pragma("busy_timeout", "5000");

        // Every in-memory connection is its own database, so pin the pool to one.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let db = Self { pool };
        db.migrate()
            .await
            .map_err(|e| CacheError::Migration(e.to_string()))?;
        tracing::debug!(path = %path, "Cache store opened");
        Ok(db)
    }

    /// Close every pooled connection. Further operations fail with
    /// `CacheError::Transaction`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create tables and indexes in one transaction.
    ///
    /// Everything is `IF NOT EXISTS`; there is no versioned migration beyond
    /// first-open creation.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_items (
                id TEXT PRIMARY KEY,
                source_id INTEGER NOT NULL,
                source_title TEXT NOT NULL,
                source_description TEXT NOT NULL,
                source_link TEXT NOT NULL,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                content TEXT NOT NULL,
                link TEXT NOT NULL,
                published_at TEXT NOT NULL,
                published_ts INTEGER,
                categories TEXT NOT NULL DEFAULT '[]'
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_feed_items_published ON feed_items(published_ts DESC)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_feed_items_source ON feed_items(source_id)")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blog_summaries (
                source_id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                link TEXT NOT NULL,
                latest_author TEXT NOT NULL,
                latest_post_date TEXT NOT NULL,
                latest_post_ts INTEGER
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_blog_summaries_latest ON blog_summaries(latest_post_ts DESC)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_creates_schema() {
        let db = Database::open(":memory:").await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["blog_summaries", "feed_items"]);
    }

    #[tokio::test]
    async fn test_reopen_file_is_idempotent() {
        let dir = std::env::temp_dir().join("framefeed_schema_test_reopen");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cache.db");
        let path_str = path.to_str().unwrap();

        let db = Database::open(path_str).await.unwrap();
        db.close().await;
        let db = Database::open(path_str).await.unwrap();
        db.close().await;

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_open_unwritable_path_is_unavailable() {
        let result = Database::open("/nonexistent-framefeed-dir/sub/cache.db").await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }
}
