//! Feed pipeline for a Farcaster RSS mini-app.
//!
//! Fetches the aggregated source list from the feed API, flattens it into
//! newest-first [`storage::FeedItem`]s, derives one [`storage::BlogSummary`]
//! per source, and keeps both in a local cache that is shown while the
//! network request is in flight.

pub mod config;
pub mod feed;
pub mod pipeline;
pub mod storage;
pub mod subscription;
pub mod util;
