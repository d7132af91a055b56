//! Usage snapshot cache: record model, file store and freshness policy.
//!
//! Snapshots are replaced wholesale after each fully successful fetch and
//! age out through [`freshness`]; nothing ever deletes them.

pub mod freshness;
pub mod record;
pub mod store;

pub use freshness::{
    evaluate, is_fresh, is_stale_allowed, Freshness, DEFAULT_CACHE_TTL_SECONDS,
    STALE_FALLBACK_SECONDS,
};
pub use record::{
    build_cache_record, build_fingerprint, CacheRecord, CachedWindow, FORMAT_VERSION,
};
pub use store::{cache_path, CacheStore};
