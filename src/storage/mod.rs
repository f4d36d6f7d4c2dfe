mod blog_summaries;
mod feed_items;
mod memory;
mod schema;
mod store;
mod types;

pub use memory::MemoryStore;
pub use schema::Database;
pub use store::CacheStore;
pub use types::{BlogSummary, CacheError, FeedItem};
