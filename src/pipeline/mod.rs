//! Feed pipeline orchestrator.
//!
//! Each load runs "read cache, publish; fetch; transform; publish; persist"
//! as one sequence and exposes the result through `watch` channels. Cache
//! failures are logged and otherwise ignored; fetch failures become an error
//! on the published state while the previous items stay visible.

mod state;
mod subscribe;

pub use state::{Origin, ViewState};
pub use subscribe::{
    AddFeedCall, CallRecorder, SubmissionReceipt, SubmitError, SubscribeError,
    SubscriptionSubmitter,
};

use std::sync::Arc;
use tokio::sync::watch;

use crate::feed::{extract_blog_summaries, merge_feed, FeedApi};
use crate::storage::{BlogSummary, CacheStore, FeedItem};
use crate::subscription::SubscriptionRequest;
use state::Collection;

pub type FeedState = ViewState<FeedItem>;
pub type BlogState = ViewState<BlogSummary>;

/// Outcome of asking the remote validator about a feed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedValidation {
    pub valid: bool,
    pub reason: Option<String>,
}

pub struct FeedPipeline {
    store: Arc<dyn CacheStore>,
    api: FeedApi,
    prune_stale_items: bool,
    feeds: Collection<FeedItem>,
    blogs: Collection<BlogSummary>,
}

impl FeedPipeline {
    pub fn new(store: Arc<dyn CacheStore>, api: FeedApi) -> Self {
        Self {
            store,
            api,
            prune_stale_items: false,
            feeds: Collection::new("feeds"),
            blogs: Collection::new("blogs"),
        }
    }

    /// Delete cached items missing from each successful full fetch.
    pub fn with_pruning(mut self, enabled: bool) -> Self {
        self.prune_stale_items = enabled;
        self
    }

    pub fn feed_state(&self) -> FeedState {
        self.feeds.snapshot()
    }

    pub fn blog_state(&self) -> BlogState {
        self.blogs.snapshot()
    }

    pub fn watch_feeds(&self) -> watch::Receiver<FeedState> {
        self.feeds.subscribe()
    }

    pub fn watch_blogs(&self) -> watch::Receiver<BlogState> {
        self.blogs.subscribe()
    }

    /// Load the merged feed: cached items first, then the network result.
    ///
    /// Safe to call again as a manual refresh. Returns the state published
    /// once this run completes.
    pub async fn load_feeds(&self) -> FeedState {
        let generation = self.feeds.begin();

        match self.store.feed_items().await {
            Ok(cached) if !cached.is_empty() => {
                tracing::debug!(count = cached.len(), "Publishing cached feed items");
                self.feeds.publish(generation, cached, Origin::Cache);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Could not load cached feed items"),
        }

        match self.api.fetch_sources().await {
            Ok(sources) => {
                let items = merge_feed(&sources);
                tracing::info!(count = items.len(), generation, "Fetched feed items");
                if self.feeds.publish(generation, items.clone(), Origin::Network) {
                    self.persist_feed_items(&items).await;
                } else {
                    tracing::debug!(generation, "Newer feed load already published, not caching");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching feeds");
                self.feeds.fail(generation, e.to_string());
            }
        }

        self.feeds.finish(generation);
        self.feeds.snapshot()
    }

    /// Load blog summaries with the same cache-then-network sequence.
    pub async fn load_blog_summaries(&self) -> BlogState {
        let generation = self.blogs.begin();

        match self.store.blog_summaries().await {
            Ok(cached) if !cached.is_empty() => {
                tracing::debug!(count = cached.len(), "Publishing cached blog summaries");
                self.blogs.publish(generation, cached, Origin::Cache);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Could not load cached blog summaries"),
        }

        match self.api.fetch_sources().await {
            Ok(sources) => {
                let summaries = extract_blog_summaries(&sources);
                tracing::info!(count = summaries.len(), generation, "Fetched blog summaries");
                if self.blogs.publish(generation, summaries.clone(), Origin::Network) {
                    match self.store.put_blog_summaries(&summaries).await {
                        Ok(written) => tracing::debug!(written, "Cached blog summaries"),
                        Err(e) => tracing::warn!(error = %e, "Failed to cache blog summaries"),
                    }
                } else {
                    tracing::debug!(generation, "Newer blog load already published, not caching");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching blog summaries");
                self.blogs.fail(generation, e.to_string());
            }
        }

        self.blogs.finish(generation);
        self.blogs.snapshot()
    }

    /// Ask the remote validator about `url`. Never fails: any transport,
    /// status or decode error comes back as `valid: false` with its text.
    pub async fn validate_feed_url(&self, url: &str) -> FeedValidation {
        match self.api.validate_feed(url).await {
            Ok(response) => FeedValidation {
                valid: response.is_valid,
                reason: response.error.filter(|reason| !reason.is_empty()),
            },
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Feed validation failed");
                FeedValidation {
                    valid: false,
                    reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Validate, submit, then refresh feeds and blog summaries once the
    /// submission is confirmed. An unconfirmed receipt skips the refresh.
    pub async fn subscribe(
        &self,
        request: &SubscriptionRequest,
        submitter: &dyn SubscriptionSubmitter,
    ) -> Result<SubmissionReceipt, SubscribeError> {
        let validation = self.validate_feed_url(&request.feed_url).await;
        if !validation.valid {
            return Err(SubscribeError::Rejected {
                reason: validation
                    .reason
                    .unwrap_or_else(|| "Feed URL is not a valid RSS or Atom feed".to_string()),
            });
        }

        let receipt = submitter.submit(request).await?;
        if !receipt.confirmed {
            tracing::info!(
                fid = request.owner_id,
                reference = %receipt.reference,
                "Subscription awaiting wallet confirmation"
            );
            return Ok(receipt);
        }

        tracing::info!(
            fid = request.owner_id,
            feed_url = %request.feed_url,
            reference = %receipt.reference,
            "Subscription confirmed, refreshing"
        );
        self.load_feeds().await;
        self.load_blog_summaries().await;
        Ok(receipt)
    }

    async fn persist_feed_items(&self, items: &[FeedItem]) {
        match self.store.put_feed_items(items).await {
            Ok(written) => tracing::debug!(written, "Cached feed items"),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to cache feed items");
                return;
            }
        }

        if self.prune_stale_items && !items.is_empty() {
            let keep: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
            match self.store.prune_feed_items(&keep).await {
                Ok(removed) if removed > 0 => tracing::info!(removed, "Pruned stale feed items"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Failed to prune stale feed items"),
            }
        }
    }
}
