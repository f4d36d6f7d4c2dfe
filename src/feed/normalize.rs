use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::date::{first_non_empty, resolve_published};
use super::wire::{FeedContent, RawItem, RemoteSource};
use crate::storage::FeedItem;

/// Flatten the nested source list into canonical feed items.
///
/// One item per raw entry, in traversal order (source, block, entry), each
/// stamped with its source id and its block's metadata. Pure: the same
/// input always yields the same output.
pub fn normalize(sources: &[RemoteSource]) -> Vec<FeedItem> {
    let capacity = sources
        .iter()
        .flat_map(|s| &s.feed_contents)
        .map(|block| block.items.len())
        .sum();
    let mut items = Vec::with_capacity(capacity);

    for source in sources {
        for block in &source.feed_contents {
            items.extend(
                block
                    .items
                    .iter()
                    .map(|raw| canonical_item(source.fid, block, raw)),
            );
        }
    }

    items
}

fn canonical_item(source_id: u64, block: &FeedContent, raw: &RawItem) -> FeedItem {
    let title = raw.title.clone().unwrap_or_default();
    let link = raw.link.clone().unwrap_or_default();
    let published_at = resolve_published(raw.iso_date.as_deref(), raw.pub_date.as_deref());
    let content = first_non_empty(raw.content_snippet.as_deref(), raw.content.as_deref())
        .unwrap_or_default()
        .to_string();
    let id = derive_id(raw.guid.as_deref(), &link, &title, &published_at);

    FeedItem {
        id,
        source_id,
        source_title: block.title.clone().unwrap_or_default(),
        source_description: block.description.clone().unwrap_or_default(),
        source_link: block.link.clone().unwrap_or_default(),
        title,
        author: raw.author.clone().unwrap_or_default(),
        content,
        link,
        published_at,
        categories: raw.categories.clone(),
    }
}

/// Upstream guid when present, otherwise a content hash so the record still
/// has a stable primary key across fetches.
fn derive_id(guid: Option<&str>, link: &str, title: &str, published_at: &str) -> String {
    if let Some(guid) = guid {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!("{}|{}|{}", link, title, published_at);
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Stable descending sort by effective publish date.
///
/// Dated entries are ordered newest first among themselves (ties keep input
/// order). An entry without a parseable date expresses no preference and
/// stays at its input position; dated entries fill the remaining positions.
pub fn sort_by_published<T>(records: &mut Vec<T>, instant: impl Fn(&T) -> Option<DateTime<Utc>>) {
    let mut dated_slots = Vec::new();
    let mut dated = Vec::new();
    let mut slots: Vec<Option<T>> = Vec::with_capacity(records.len());

    for (idx, record) in records.drain(..).enumerate() {
        match instant(&record) {
            Some(ts) => {
                dated_slots.push(idx);
                dated.push((ts, record));
                slots.push(None);
            }
            None => slots.push(Some(record)),
        }
    }

    // Vec::sort_by is stable; comparing by instant alone is a total order.
    dated.sort_by(|(a, _), (b, _)| b.cmp(a));

    for (slot, (_, record)) in dated_slots.into_iter().zip(dated) {
        slots[slot] = Some(record);
    }
    records.extend(slots.into_iter().flatten());
}

/// Normalize then sort: the flat newest-first list the feed view renders.
///
/// No deduplication happens here; repeated ids collapse only when the list is
/// written to the cache.
pub fn merge_feed(sources: &[RemoteSource]) -> Vec<FeedItem> {
    let mut items = normalize(sources);
    sort_by_published(&mut items, FeedItem::published_instant);
    items
}

/// Route form of a blog title (`"Dev Blog"` -> `"Dev_Blog"`).
///
/// Literal `%` and `_` are percent-escaped first, so distinct titles never
/// share a slug.
pub fn blog_slug(title: &str) -> String {
    title
        .replace('%', "%25")
        .replace('_', "%5F")
        .replace(' ', "_")
}

/// Items belonging to the blog whose title maps to `slug`.
pub fn items_for_blog<'a>(items: &'a [FeedItem], slug: &str) -> Vec<&'a FeedItem> {
    items
        .iter()
        .filter(|item| blog_slug(&item.source_title) == slug)
        .collect()
}
