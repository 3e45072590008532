//! Whole-page response cache for the home feed.
//!
//! A rendered `200 OK` response for a cached route is kept for a fixed time
//! window and replayed byte-for-byte to every request in that window, no
//! matter who asks or which `?page=` they ask for. Behaviour is controlled via
//! the `[cache]` table:
//!
//! ```toml
//! [cache]
//! enabled = true
//! index_ttl_seconds = 20
//! key_prefix = "index_page"
//! capacity = 64
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use keys::PageKey;
pub use middleware::{CacheState, page_cache_layer};
pub use store::{CachedResponse, PageCache};

pub const PAGE_CACHE_HIT_TOTAL: &str = "quire_page_cache_hit_total";
pub const PAGE_CACHE_MISS_TOTAL: &str = "quire_page_cache_miss_total";
pub const PAGE_CACHE_STORE_TOTAL: &str = "quire_page_cache_store_total";
