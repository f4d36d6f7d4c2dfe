use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::date::{parse_timestamp, resolve_published};
use super::normalize::sort_by_published;
use super::wire::{FeedContent, RawItem, RemoteSource};
use crate::storage::BlogSummary;

const UNTITLED_BLOG: &str = "Untitled Blog";
const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Derive one summary per source from its most recent item.
///
/// Blocks without items contribute nothing. When a source has several
/// blocks, the one whose latest item is newest wins; if either side has no
/// usable date the later block wins. The result is ordered newest first.
pub fn extract_blog_summaries(sources: &[RemoteSource]) -> Vec<BlogSummary> {
    let mut order: Vec<u64> = Vec::new();
    let mut best: HashMap<u64, (BlogSummary, Option<DateTime<Utc>>)> = HashMap::new();

    for source in sources {
        for block in &source.feed_contents {
            let Some(latest) = latest_item(&block.items) else {
                continue;
            };
            let summary = summarize(source.fid, block, latest);
            let instant = summary.latest_post_instant();

            let current = best.get(&source.fid).map(|(_, ts)| *ts);
            let replace = match current {
                None => {
                    order.push(source.fid);
                    true
                }
                Some(Some(current)) => instant.map_or(true, |new| new >= current),
                Some(None) => true,
            };
            if replace {
                best.insert(source.fid, (summary, instant));
            }
        }
    }

    let mut summaries: Vec<BlogSummary> = order
        .into_iter()
        .filter_map(|fid| best.remove(&fid).map(|(summary, _)| summary))
        .collect();
    sort_by_published(&mut summaries, BlogSummary::latest_post_instant);
    summaries
}

/// Newest dated item; the first item when none carries a date.
fn latest_item(items: &[RawItem]) -> Option<&RawItem> {
    let mut newest: Option<(DateTime<Utc>, &RawItem)> = None;
    for item in items {
        let published = resolve_published(item.iso_date.as_deref(), item.pub_date.as_deref());
        if let Some(ts) = parse_timestamp(&published) {
            if newest.map_or(true, |(current, _)| ts > current) {
                newest = Some((ts, item));
            }
        }
    }
    newest.map(|(_, item)| item).or_else(|| items.first())
}

fn summarize(source_id: u64, block: &FeedContent, latest: &RawItem) -> BlogSummary {
    BlogSummary {
        source_id,
        title: non_empty_or(block.title.as_deref(), UNTITLED_BLOG),
        description: non_empty_or(block.description.as_deref(), ""),
        link: non_empty_or(block.link.as_deref(), ""),
        latest_author: non_empty_or(latest.author.as_deref(), UNKNOWN_AUTHOR),
        latest_post_date: resolve_published(latest.iso_date.as_deref(), latest.pub_date.as_deref()),
    }
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}
