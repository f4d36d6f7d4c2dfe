use async_trait::async_trait;

use super::schema::Database;
use super::types::{BlogSummary, CacheError, FeedItem};

/// Read-through cache contract the pipeline is written against.
///
/// Each method is scoped to one collection and runs as one transaction.
/// Writes are wholesale upserts by primary key and never delete, except for
/// the explicit [`CacheStore::prune_feed_items`] reconciliation pass.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// All cached feed items, newest first.
    async fn feed_items(&self) -> Result<Vec<FeedItem>, CacheError>;

    /// Upsert by `id`, returns the number of records written.
    async fn put_feed_items(&self, items: &[FeedItem]) -> Result<usize, CacheError>;

    /// All cached blog summaries, most recent post first.
    async fn blog_summaries(&self) -> Result<Vec<BlogSummary>, CacheError>;

    /// Upsert by `source_id`, returns the number of records written.
    async fn put_blog_summaries(&self, blogs: &[BlogSummary]) -> Result<usize, CacheError>;

    /// Delete feed items whose id is not in `keep_ids`, returns rows removed.
    async fn prune_feed_items(&self, keep_ids: &[String]) -> Result<u64, CacheError>;
}

#[async_trait]
impl CacheStore for Database {
    async fn feed_items(&self) -> Result<Vec<FeedItem>, CacheError> {
        self.get_feed_items().await
    }

    async fn put_feed_items(&self, items: &[FeedItem]) -> Result<usize, CacheError> {
        Database::put_feed_items(self, items).await
    }

    async fn blog_summaries(&self) -> Result<Vec<BlogSummary>, CacheError> {
        self.get_blog_summaries().await
    }

    async fn put_blog_summaries(&self, blogs: &[BlogSummary]) -> Result<usize, CacheError> {
        Database::put_blog_summaries(self, blogs).await
    }

    async fn prune_feed_items(&self, keep_ids: &[String]) -> Result<u64, CacheError> {
        Database::prune_feed_items(self, keep_ids).await
    }
}
