//! Remote feed source access and the pure transforms applied to its payload.
//!
//! - [`client`] - HTTP access to `GET /feeds` and `POST /feeds/validate`
//! - [`wire`] - typed schema for everything the API sends
//! - [`normalize`] - flattening into [`FeedItem`](crate::storage::FeedItem)s and
//!   the newest-first merge
//! - [`blogs`] - one [`BlogSummary`](crate::storage::BlogSummary) per source
//!
//! Everything except the client is synchronous and side-effect free.

mod blogs;
mod client;
mod date;
mod normalize;
mod wire;

pub use blogs::extract_blog_summaries;
pub use client::{FeedApi, FetchError};
pub use date::parse_timestamp;
pub use normalize::{blog_slug, items_for_blog, merge_feed, normalize, sort_by_published};
pub use wire::{FeedContent, RawItem, RemoteSource, ValidateResponse};
