use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feed::parse_timestamp;

// ============================================================================
// Error Types
// ============================================================================

/// Cache store errors.
///
/// None of these reach the user: the pipeline logs them and carries on as if
/// no cache existed.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be opened.
    #[error("Cache store unavailable: {0}")]
    Unavailable(String),

    /// Schema creation failed on first open.
    #[error("Cache schema setup failed: {0}")]
    Migration(String),

    /// A read or write transaction failed.
    #[error("Cache transaction failed: {0}")]
    Transaction(#[from] sqlx::Error),

    /// A stored column could not be decoded back into a record.
    #[error("Corrupt cache record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

// ============================================================================
// Data Structures
// ============================================================================

/// Canonical feed item: one flattened upstream RSS/Atom entry.
///
/// `published_at` keeps the upstream string as-is (empty when the item carried
/// no date); [`FeedItem::published_instant`] is the parsed view used for
/// ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub source_id: u64,
    pub source_title: String,
    pub source_description: String,
    pub source_link: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub link: String,
    pub published_at: String,
    pub categories: Vec<String>,
}

impl FeedItem {
    pub fn published_instant(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.published_at)
    }
}

/// One summary per subscribed source, derived from its most recent item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogSummary {
    pub source_id: u64,
    pub title: String,
    pub description: String,
    pub link: String,
    pub latest_author: String,
    pub latest_post_date: String,
}

impl BlogSummary {
    pub fn latest_post_instant(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.latest_post_date)
    }
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for `feed_items` queries.
/// `source_id` is stored as INTEGER (i64) and categories as a JSON array.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedItemRow {
    pub id: String,
    pub source_id: i64,
    pub source_title: String,
    pub source_description: String,
    pub source_link: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub link: String,
    pub published_at: String,
    pub categories: String,
}

impl FeedItemRow {
    pub(crate) fn into_item(self) -> Result<FeedItem, CacheError> {
        let categories: Vec<String> =
            serde_json::from_str(&self.categories).map_err(|e| CacheError::Corrupt {
                id: self.id.clone(),
                reason: e.to_string(),
            })?;
        let source_id = u64::try_from(self.source_id).map_err(|e| CacheError::Corrupt {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;

        Ok(FeedItem {
            id: self.id,
            source_id,
            source_title: self.source_title,
            source_description: self.source_description,
            source_link: self.source_link,
            title: self.title,
            author: self.author,
            content: self.content,
            link: self.link,
            published_at: self.published_at,
            categories,
        })
    }
}

/// Internal row type for `blog_summaries` queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BlogSummaryRow {
    pub source_id: i64,
    pub title: String,
    pub description: String,
    pub link: String,
    pub latest_author: String,
    pub latest_post_date: String,
}

impl BlogSummaryRow {
    pub(crate) fn into_summary(self) -> Result<BlogSummary, CacheError> {
        let source_id = u64::try_from(self.source_id).map_err(|e| CacheError::Corrupt {
            id: self.source_id.to_string(),
            reason: e.to_string(),
        })?;

        Ok(BlogSummary {
            source_id,
            title: self.title,
            description: self.description,
            link: self.link,
            latest_author: self.latest_author,
            latest_post_date: self.latest_post_date,
        })
    }
}

/// SQLite stores INTEGER as i64; source ids above i64::MAX cannot be keyed.
pub(crate) fn source_key(source_id: u64) -> Result<i64, CacheError> {
    i64::try_from(source_id).map_err(|e| CacheError::Corrupt {
        id: source_id.to_string(),
        reason: e.to_string(),
    })
}
