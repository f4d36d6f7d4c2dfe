use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{source_key, CacheError, FeedItem, FeedItemRow};

/// 12 columns * 50 rows = 600 bind parameters, under SQLite's 999 limit.
const BATCH_SIZE: usize = 50;

/// Ids per DELETE statement in the prune pass.
const PRUNE_CHUNK_SIZE: usize = 500;

impl Database {
    // ========================================================================
    // Feed Item Collection
    // ========================================================================

    /// Read every cached feed item, newest first.
    ///
    /// Ordered through the `published_ts` index; items whose date could not be
    /// parsed come last, in insertion order.
    pub async fn get_feed_items(&self) -> Result<Vec<FeedItem>, CacheError> {
        let rows = sqlx::query_as::<_, FeedItemRow>(
            r#"
            SELECT id, source_id, source_title, source_description, source_link,
                   title, author, content, link, published_at, categories
            FROM feed_items
            ORDER BY published_ts IS NULL, published_ts DESC, rowid
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FeedItemRow::into_item).collect()
    }

    /// Upsert feed items by id in a single transaction.
    ///
    /// Returns the number of records written. Existing rows absent from
    /// `items` are left untouched; duplicate ids inside one batch collapse to
    /// the last occurrence.
    pub async fn put_feed_items(&self, items: &[FeedItem]) -> Result<usize, CacheError> {
        if items.is_empty() {
            return Ok(0);
        }

        let encoded = items
            .iter()
            .map(|item| {
                let categories =
                    serde_json::to_string(&item.categories).map_err(|e| CacheError::Corrupt {
                        id: item.id.clone(),
                        reason: e.to_string(),
                    })?;
                let published_ts = item.published_instant().map(|dt| dt.timestamp());
                Ok((item, source_key(item.source_id)?, published_ts, categories))
            })
            .collect::<Result<Vec<_>, CacheError>>()?;

        let mut tx = self.pool.begin().await?;
        let mut written = 0usize;

        for chunk in encoded.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT INTO feed_items (id, source_id, source_title, source_description, \
                 source_link, title, author, content, link, published_at, published_ts, categories) ",
            );

            builder.push_values(chunk, |mut b, (item, source_id, published_ts, categories)| {
                b.push_bind(&item.id)
                    .push_bind(*source_id)
                    .push_bind(&item.source_title)
                    .push_bind(&item.source_description)
                    .push_bind(&item.source_link)
                    .push_bind(&item.title)
                    .push_bind(&item.author)
                    .push_bind(&item.content)
                    .push_bind(&item.link)
                    .push_bind(&item.published_at)
                    .push_bind(*published_ts)
                    .push_bind(categories);
            });

            builder.push(
                " ON CONFLICT(id) DO UPDATE SET \
                 source_id = excluded.source_id, \
                 source_title = excluded.source_title, \
                 source_description = excluded.source_description, \
                 source_link = excluded.source_link, \
                 title = excluded.title, \
                 author = excluded.author, \
                 content = excluded.content, \
                 link = excluded.link, \
                 published_at = excluded.published_at, \
                 published_ts = excluded.published_ts, \
                 categories = excluded.categories",
            );

            builder.build().execute(&mut *tx).await?;
            written += chunk.len();
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Delete cached items whose id is not in `keep_ids`.
    ///
    /// An empty `keep_ids` is treated as "nothing fetched" and deletes nothing.
    pub async fn prune_feed_items(&self, keep_ids: &[String]) -> Result<u64, CacheError> {
        if keep_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("CREATE TEMP TABLE IF NOT EXISTS keep_ids (id TEXT PRIMARY KEY)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM keep_ids").execute(&mut *tx).await?;

        for chunk in keep_ids.chunks(PRUNE_CHUNK_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("INSERT OR IGNORE INTO keep_ids (id) ");
            builder.push_values(chunk, |mut b, id| {
                b.push_bind(id);
            });
            builder.build().execute(&mut *tx).await?;
        }

        let result =
            sqlx::query("DELETE FROM feed_items WHERE id NOT IN (SELECT id FROM keep_ids)")
                .execute(&mut *tx)
                .await?;
        sqlx::query("DELETE FROM keep_ids").execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, FeedItem};
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn test_item(id: &str, published_at: &str) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            source_id: 7,
            source_title: "Test Blog".to_string(),
            source_description: "A blog".to_string(),
            source_link: "https://blog.example.com".to_string(),
            title: format!("Post {}", id),
            author: "Ada".to_string(),
            content: "Summary".to_string(),
            link: format!("https://blog.example.com/{}", id),
            published_at: published_at.to_string(),
            categories: vec!["rust".to_string()],
        }
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip_newest_first() {
        let db = test_db().await;
        let items = vec![
            test_item("a", "2024-01-01T00:00:00Z"),
            test_item("b", "2024-03-01T00:00:00Z"),
            test_item("c", "2024-02-01T00:00:00Z"),
        ];

        let written = db.put_feed_items(&items).await.unwrap();
        assert_eq!(written, 3);

        let stored = db.get_feed_items().await.unwrap();
        let ids: Vec<&str> = stored.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(stored[0], items[1]);
    }

    #[tokio::test]
    async fn test_undated_items_sort_last() {
        let db = test_db().await;
        db.put_feed_items(&[
            test_item("undated", ""),
            test_item("dated", "Wed, 01 May 2024 10:00:00 GMT"),
        ])
        .await
        .unwrap();

        let stored = db.get_feed_items().await.unwrap();
        assert_eq!(stored[0].id, "dated");
        assert_eq!(stored[1].id, "undated");
        assert_eq!(stored[1].published_at, "");
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let db = test_db().await;
        db.put_feed_items(&[test_item("a", "2024-01-01")]).await.unwrap();

        let mut updated = test_item("a", "2024-01-02");
        updated.title = "Retitled".to_string();
        db.put_feed_items(&[updated.clone()]).await.unwrap();

        let stored = db.get_feed_items().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], updated);
    }

    #[tokio::test]
    async fn test_duplicate_ids_in_one_batch_keep_last() {
        let db = test_db().await;
        let first = test_item("dup", "2024-01-01");
        let mut second = test_item("dup", "2024-01-01");
        second.author = "Grace".to_string();

        let written = db.put_feed_items(&[first, second]).await.unwrap();
        assert_eq!(written, 2);

        let stored = db.get_feed_items().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].author, "Grace");
    }

    #[tokio::test]
    async fn test_put_does_not_delete_missing_ids() {
        let db = test_db().await;
        db.put_feed_items(&[test_item("old", "2024-01-01")])
            .await
            .unwrap();
        db.put_feed_items(&[test_item("new", "2024-02-01")])
            .await
            .unwrap();

        assert_eq!(db.get_feed_items().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_put_empty_batch() {
        let db = test_db().await;
        assert_eq!(db.put_feed_items(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_large_batch_spans_chunks() {
        let db = test_db().await;
        let items: Vec<_> = (0..120)
            .map(|i| test_item(&format!("item-{}", i), "2024-01-01"))
            .collect();

        assert_eq!(db.put_feed_items(&items).await.unwrap(), 120);
        assert_eq!(db.get_feed_items().await.unwrap().len(), 120);
    }

    #[tokio::test]
    async fn test_prune_removes_ids_absent_from_fetch() {
        let db = test_db().await;
        db.put_feed_items(&[
            test_item("keep", "2024-01-01"),
            test_item("stale", "2024-01-02"),
        ])
        .await
        .unwrap();

        let removed = db.prune_feed_items(&["keep".to_string()]).await.unwrap();
        assert_eq!(removed, 1);

        let stored = db.get_feed_items().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "keep");
    }

    #[tokio::test]
    async fn test_prune_with_empty_keep_list_is_noop() {
        let db = test_db().await;
        db.put_feed_items(&[test_item("a", "2024-01-01")]).await.unwrap();

        assert_eq!(db.prune_feed_items(&[]).await.unwrap(), 0);
        assert_eq!(db.get_feed_items().await.unwrap().len(), 1);
    }
}
