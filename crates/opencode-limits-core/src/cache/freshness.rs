//! Freshness decisions over a loaded [`CacheRecord`].
//!
//! A record is only ever usable when its schema version and credential
//! fingerprint match and none of its windows has rolled over. One expired
//! window invalidates the whole record.

use chrono::{DateTime, Utc};

use super::record::{CacheRecord, FORMAT_VERSION};

/// Default time-to-live for a cached snapshot
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 180;

/// Maximum age of a snapshot served after a failed refresh
pub const STALE_FALLBACK_SECONDS: u64 = 24 * 60 * 60;

/// Verdict for a cached record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve without touching the network
    Fresh,
    /// Refresh, but serve this if the refresh fails
    StaleUsable,
    /// Never serve
    Invalid,
}

/// Whether `record` can be served without a refresh
pub fn is_fresh(
    record: &CacheRecord,
    ttl_seconds: u64,
    auth_fingerprint: &str,
    now: DateTime<Utc>,
) -> bool {
    is_usable(record, ttl_seconds, auth_fingerprint, FORMAT_VERSION, now)
}

/// Whether `record` may be served as a fallback after a failed refresh
pub fn is_stale_allowed(
    record: &CacheRecord,
    max_age_seconds: u64,
    auth_fingerprint: &str,
    now: DateTime<Utc>,
) -> bool {
    is_usable(record, max_age_seconds, auth_fingerprint, FORMAT_VERSION, now)
}

/// Classify a record against both thresholds at once
pub fn evaluate(
    record: &CacheRecord,
    ttl_seconds: u64,
    max_age_seconds: u64,
    auth_fingerprint: &str,
    now: DateTime<Utc>,
) -> Freshness {
    if is_fresh(record, ttl_seconds, auth_fingerprint, now) {
        Freshness::Fresh
    } else if is_stale_allowed(record, max_age_seconds, auth_fingerprint, now) {
        Freshness::StaleUsable
    } else {
        Freshness::Invalid
    }
}

/// Shared predicate behind both entry points
fn is_usable(
    record: &CacheRecord,
    max_age_seconds: u64,
    auth_fingerprint: &str,
    format_version: u32,
    now: DateTime<Utc>,
) -> bool {
    if record.format_version != format_version {
        return false;
    }
    if record.auth_fingerprint != auth_fingerprint {
        return false;
    }
    let age = now.signed_duration_since(record.fetched_at);
    if age.num_milliseconds() > (max_age_seconds as i64).saturating_mul(1000) {
        return false;
    }
    !has_reset_passed(record, now)
}

/// Any window whose reset instant is at or before `now`
fn has_reset_passed(record: &CacheRecord, now: DateTime<Utc>) -> bool {
    record.reset_instants().any(|reset_at| reset_at <= now)
}
