use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{source_key, BlogSummary, BlogSummaryRow, CacheError};

const BATCH_SIZE: usize = 100;

impl Database {
    // ========================================================================
    // Blog Summary Collection
    // ========================================================================

    /// Read every cached blog summary, most recently updated blog first.
    pub async fn get_blog_summaries(&self) -> Result<Vec<BlogSummary>, CacheError> {
        let rows = sqlx::query_as::<_, BlogSummaryRow>(
            r#"
            SELECT source_id, title, description, link, latest_author, latest_post_date
            FROM blog_summaries
            ORDER BY latest_post_ts IS NULL, latest_post_ts DESC, source_id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BlogSummaryRow::into_summary).collect()
    }

    /// Upsert blog summaries by source id, returns the number written.
    pub async fn put_blog_summaries(&self, blogs: &[BlogSummary]) -> Result<usize, CacheError> {
        if blogs.is_empty() {
            return Ok(0);
        }

        let keyed = blogs
            .iter()
            .map(|blog| {
                let ts = blog.latest_post_instant().map(|dt| dt.timestamp());
                Ok((blog, source_key(blog.source_id)?, ts))
            })
            .collect::<Result<Vec<_>, CacheError>>()?;

        let mut tx = self.pool.begin().await?;
        let mut written = 0usize;

        for chunk in keyed.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT INTO blog_summaries (source_id, title, description, link, \
                 latest_author, latest_post_date, latest_post_ts) ",
            );

            builder.push_values(chunk, |mut b, (blog, source_id, ts)| {
                b.push_bind(*source_id)
                    .push_bind(&blog.title)
                    .push_bind(&blog.description)
                    .push_bind(&blog.link)
                    .push_bind(&blog.latest_author)
                    .push_bind(&blog.latest_post_date)
                    .push_bind(*ts);
            });

            builder.push(
                " ON CONFLICT(source_id) DO UPDATE SET \
                 title = excluded.title, \
                 description = excluded.description, \
                 link = excluded.link, \
                 latest_author = excluded.latest_author, \
                 latest_post_date = excluded.latest_post_date, \
                 latest_post_ts = excluded.latest_post_ts",
            );

            builder.build().execute(&mut *tx).await?;
            written += chunk.len();
        }

        tx.commit().await?;
        Ok(written)
    }
}
