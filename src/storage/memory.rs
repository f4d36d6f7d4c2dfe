use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use super::store::CacheStore;
use super::types::{BlogSummary, CacheError, FeedItem};

/// Stored record plus the insertion sequence used as the ordering tie-break
/// (the in-memory counterpart of SQLite's rowid).
struct Slot<T> {
    seq: u64,
    record: T,
}

#[derive(Default)]
struct Collections {
    next_seq: u64,
    items: HashMap<String, Slot<FeedItem>>,
    blogs: HashMap<u64, BlogSummary>,
}

impl Collections {
    fn claim_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn upsert_items(&mut self, items: &[FeedItem]) {
        for item in items {
            let seq = match self.items.get(&item.id) {
                Some(slot) => slot.seq,
                None => self.claim_seq(),
            };
            self.items.insert(
                item.id.clone(),
                Slot {
                    seq,
                    record: item.clone(),
                },
            );
        }
    }

    fn upsert_blogs(&mut self, blogs: &[BlogSummary]) {
        for blog in blogs {
            self.blogs.insert(blog.source_id, blog.clone());
        }
    }
}

/// Session-only cache with the same contract as the SQLite store.
///
/// Used when the cache file cannot be opened and as the fake store in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store already holding `items`, as if a previous session wrote them.
    pub fn with_feed_items(items: &[FeedItem]) -> Self {
        let mut collections = Collections::default();
        collections.upsert_items(items);
        Self {
            inner: RwLock::new(collections),
        }
    }
}

/// Newest first, undated last, then ascending `tie` among equals.
fn newest_first<'a, T: Clone + 'a>(
    records: impl Iterator<Item = (u64, &'a T)>,
    instant: impl Fn(&T) -> Option<DateTime<Utc>>,
) -> Vec<T> {
    let mut keyed: Vec<_> = records
        .map(|(tie, record)| (instant(record).map(|dt| dt.timestamp()), tie, record))
        .collect();
    keyed.sort_by(|(a_ts, a_tie, _), (b_ts, b_tie, _)| match (a_ts, b_ts) {
        (Some(x), Some(y)) => y.cmp(x).then(a_tie.cmp(b_tie)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a_tie.cmp(b_tie),
    });
    keyed.into_iter().map(|(_, _, record)| record.clone()).collect()
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn feed_items(&self) -> Result<Vec<FeedItem>, CacheError> {
        let inner = self.inner.read().await;
        // Insertion order among equals, like SQLite's rowid.
        Ok(newest_first(
            inner.items.values().map(|slot| (slot.seq, &slot.record)),
            FeedItem::published_instant,
        ))
    }

    async fn put_feed_items(&self, items: &[FeedItem]) -> Result<usize, CacheError> {
        self.inner.write().await.upsert_items(items);
        Ok(items.len())
    }

    async fn blog_summaries(&self) -> Result<Vec<BlogSummary>, CacheError> {
        let inner = self.inner.read().await;
        Ok(newest_first(
            inner.blogs.values().map(|blog| (blog.source_id, blog)),
            BlogSummary::latest_post_instant,
        ))
    }

    async fn put_blog_summaries(&self, blogs: &[BlogSummary]) -> Result<usize, CacheError> {
        self.inner.write().await.upsert_blogs(blogs);
        Ok(blogs.len())
    }

    async fn prune_feed_items(&self, keep_ids: &[String]) -> Result<u64, CacheError> {
        if keep_ids.is_empty() {
            return Ok(0);
        }
        let keep: HashSet<&str> = keep_ids.iter().map(String::as_str).collect();
        let mut inner = self.inner.write().await;
        let before = inner.items.len();
        inner.items.retain(|id, _| keep.contains(id.as_str()));
        Ok((before - inner.items.len()) as u64)
    }
}
