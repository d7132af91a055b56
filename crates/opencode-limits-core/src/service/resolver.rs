//! Cache-aware usage resolution for the status line.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::fetcher::fetch_all;
use crate::auth::AuthTokens;
use crate::cache::{
    build_cache_record, build_fingerprint, evaluate, is_stale_allowed, CacheRecord, CacheStore,
    Freshness, STALE_FALLBACK_SECONDS,
};
use crate::config::CacheSettings;
use crate::providers::UsageSource;
use crate::usage::UsageWindow;

/// Where resolved usage came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOrigin {
    /// Fresh cached snapshot, no network
    Cache,
    /// Live fetch
    Live,
    /// Stale snapshot served after a failed fetch
    StaleCache,
}

/// Usage ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUsage {
    pub codex: Vec<UsageWindow>,
    pub copilot: Option<UsageWindow>,
    pub origin: UsageOrigin,
    /// Provider failures from the live fetch, if one happened
    pub failures: Vec<String>,
}

impl ResolvedUsage {
    fn from_record(record: &CacheRecord, origin: UsageOrigin, failures: Vec<String>) -> Self {
        let (codex, copilot) = record.to_windows();
        Self {
            codex,
            copilot,
            origin,
            failures,
        }
    }
}

/// Resolve usage, preferring a fresh cached snapshot over the network.
///
/// `clock` is read before the cache check and again once the live fetch
/// returns, so a new snapshot is stamped with its completion time.
/// Returns `None` when nothing can be shown.
pub async fn resolve_usage<C>(
    source: Arc<dyn UsageSource>,
    tokens: Arc<AuthTokens>,
    settings: &CacheSettings,
    store: &CacheStore,
    clock: C,
) -> Option<ResolvedUsage>
where
    C: Fn() -> DateTime<Utc>,
{
    let now = clock();
    let fingerprint = build_fingerprint(&tokens);
    let use_cache = !settings.disabled;

    let mut cached: Option<CacheRecord> = None;
    if use_cache && !settings.refresh {
        cached = store.load();
        if let Some(record) = &cached {
            let verdict = evaluate(
                record,
                settings.ttl_seconds,
                STALE_FALLBACK_SECONDS,
                &fingerprint,
                now,
            );
            debug!("Cached usage at {:?} is {:?}", store.path(), verdict);
            if verdict == Freshness::Fresh {
                if record.is_empty() {
                    return None;
                }
                return Some(ResolvedUsage::from_record(record, UsageOrigin::Cache, Vec::new()));
            }
        }
    }

    let report = fetch_all(source, tokens, None).await;
    let fetched_at = clock();

    if report.has_data() {
        if use_cache && report.is_complete() {
            let record =
                build_cache_record(&report.codex, report.copilot.as_ref(), &fingerprint, fetched_at);
            match store.save(&record) {
                Ok(()) => info!("Refreshed usage cache at {:?}", store.path()),
                Err(e) => warn!("Failed to persist usage cache: {:#}", e),
            }
        }
        return Some(ResolvedUsage {
            codex: report.codex,
            copilot: report.copilot,
            origin: UsageOrigin::Live,
            failures: report.failures,
        });
    }

    if !use_cache {
        return None;
    }

    let record = match cached {
        Some(record) => record,
        None => store.load()?,
    };
    if record.is_empty() || !is_stale_allowed(&record, STALE_FALLBACK_SECONDS, &fingerprint, fetched_at) {
        debug!("No usable stale usage to fall back on");
        return None;
    }

    info!("Live fetch failed, serving cached usage from {}", record.fetched_at);
    Some(ResolvedUsage::from_record(
        &record,
        UsageOrigin::StaleCache,
        report.failures,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::FakeSource;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn store_in(dir: &tempfile::TempDir) -> CacheStore {
        CacheStore::new(dir.path().join("tmux.json"))
    }

    fn seed(store: &CacheStore, fetched_at: DateTime<Utc>) {
        let tokens = FakeSource::tokens();
        let record = build_cache_record(
            &[UsageWindow::new("5HR", 77.0, None)],
            Some(&UsageWindow::new("monthly", 20.0, None)),
            &build_fingerprint(&tokens),
            fetched_at,
        );
        store.save(&record).unwrap();
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        seed(&store, now() - Duration::seconds(30));
        let source = Arc::new(FakeSource::healthy());

        let resolved = resolve_usage(
            source.clone(),
            FakeSource::tokens(),
            &CacheSettings::default(),
            &store,
            now,
        )
        .await
        .unwrap();

        assert_eq!(resolved.origin, UsageOrigin::Cache);
        assert_eq!(resolved.codex[0].used_percent, 77.0);
        assert_eq!(resolved.copilot.unwrap().label, "Copilot");
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_cache_fetches_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let source = Arc::new(FakeSource::healthy());

        let resolved = resolve_usage(
            source.clone(),
            FakeSource::tokens(),
            &CacheSettings::default(),
            &store,
            now,
        )
        .await
        .unwrap();

        assert_eq!(resolved.origin, UsageOrigin::Live);
        assert_eq!(source.call_count(), 2);

        let saved = store.load().unwrap();
        assert_eq!(saved.fetched_at, now());
        assert_eq!(saved.auth_fingerprint, build_fingerprint(&FakeSource::tokens()));
        assert_eq!(saved.codex["Weekly"].used_percent, 34.0);
    }

    #[tokio::test]
    async fn test_partial_failure_is_served_but_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let source = Arc::new(FakeSource::healthy().without_copilot());

        let resolved = resolve_usage(
            source,
            FakeSource::tokens(),
            &CacheSettings::default(),
            &store,
            now,
        )
        .await
        .unwrap();

        assert_eq!(resolved.origin, UsageOrigin::Live);
        assert_eq!(resolved.copilot, None);
        assert_eq!(resolved.failures.len(), 1);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_refresh_bypasses_fresh_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        seed(&store, now() - Duration::seconds(30));
        let source = Arc::new(FakeSource::healthy());
        let settings = CacheSettings {
            refresh: true,
            ..CacheSettings::default()
        };

        let resolved = resolve_usage(source.clone(), FakeSource::tokens(), &settings, &store, now)
            .await
            .unwrap();

        assert_eq!(resolved.origin, UsageOrigin::Live);
        assert_eq!(source.call_count(), 2);
        assert_eq!(store.load().unwrap().codex["5HR"].used_percent, 12.0);
    }

    #[tokio::test]
    async fn test_fingerprint_change_forces_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let record = build_cache_record(
            &[UsageWindow::new("5HR", 77.0, None)],
            None,
            "someone-else",
            now(),
        );
        store.save(&record).unwrap();
        let source = Arc::new(FakeSource::healthy());

        let resolved = resolve_usage(
            source.clone(),
            FakeSource::tokens(),
            &CacheSettings::default(),
            &store,
            now,
        )
        .await
        .unwrap();

        assert_eq!(resolved.origin, UsageOrigin::Live);
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_total_failure_falls_back_to_stale_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        seed(&store, now() - Duration::hours(2));

        let resolved = resolve_usage(
            Arc::new(FakeSource::failing()),
            FakeSource::tokens(),
            &CacheSettings::default(),
            &store,
            now,
        )
        .await
        .unwrap();

        assert_eq!(resolved.origin, UsageOrigin::StaleCache);
        assert_eq!(resolved.codex[0].used_percent, 77.0);
        assert_eq!(resolved.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_total_failure_with_refresh_still_uses_stale_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        seed(&store, now() - Duration::seconds(10));
        let settings = CacheSettings {
            refresh: true,
            ..CacheSettings::default()
        };

        let resolved = resolve_usage(
            Arc::new(FakeSource::failing()),
            FakeSource::tokens(),
            &settings,
            &store,
            now,
        )
        .await
        .unwrap();

        assert_eq!(resolved.origin, UsageOrigin::StaleCache);
    }

    #[tokio::test]
    async fn test_total_failure_with_expired_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        seed(&store, now() - Duration::days(2));

        let resolved = resolve_usage(
            Arc::new(FakeSource::failing()),
            FakeSource::tokens(),
            &CacheSettings::default(),
            &store,
            now,
        )
        .await;

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn test_disabled_cache_never_touches_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        seed(&store, now() - Duration::seconds(10));
        let before = std::fs::read(store.path()).unwrap();
        let settings = CacheSettings {
            disabled: true,
            ..CacheSettings::default()
        };

        let live = resolve_usage(
            Arc::new(FakeSource::healthy()),
            FakeSource::tokens(),
            &settings,
            &store,
            now,
        )
        .await
        .unwrap();
        assert_eq!(live.origin, UsageOrigin::Live);
        assert_eq!(std::fs::read(store.path()).unwrap(), before);

        let failed = resolve_usage(
            Arc::new(FakeSource::failing()),
            FakeSource::tokens(),
            &settings,
            &store,
            now,
        )
        .await;
        assert_eq!(failed, None);
    }

    #[tokio::test]
    async fn test_expired_reset_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let tokens = FakeSource::tokens();
        let record = build_cache_record(
            &[UsageWindow::new("5HR", 99.0, Some(now() - Duration::minutes(1)))],
            None,
            &build_fingerprint(&tokens),
            now() - Duration::seconds(30),
        );
        store.save(&record).unwrap();
        let source = Arc::new(FakeSource::with_resets(Some(now() + Duration::hours(1))));

        let resolved = resolve_usage(source.clone(), tokens, &CacheSettings::default(), &store, now)
            .await
            .unwrap();

        assert_eq!(resolved.origin, UsageOrigin::Live);
        assert_eq!(source.call_count(), 2);
        assert_eq!(
            store.load().unwrap().codex["5HR"].reset_at,
            Some(now() + Duration::hours(1))
        );
    }

    #[tokio::test]
    async fn test_unwritable_cache_still_serves_live_usage() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = CacheStore::new(blocker.join("tmux.json"));
        let source = Arc::new(FakeSource::healthy());

        let resolved = resolve_usage(
            source.clone(),
            FakeSource::tokens(),
            &CacheSettings::default(),
            &store,
            now,
        )
        .await
        .unwrap();

        assert_eq!(resolved.origin, UsageOrigin::Live);
        assert_eq!(resolved.codex.len(), 2);
        assert!(resolved.copilot.is_some());
        assert!(resolved.failures.is_empty());
        assert_eq!(source.call_count(), 2);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_snapshot_stamped_after_fetch() {
        use std::sync::atomic::{AtomicI64, Ordering};

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let ticks = AtomicI64::new(0);
        // Each reading advances the clock by five seconds
        let clock = || now() + Duration::seconds(5 * ticks.fetch_add(1, Ordering::SeqCst));

        let resolved = resolve_usage(
            Arc::new(FakeSource::healthy()),
            FakeSource::tokens(),
            &CacheSettings::default(),
            &store,
            clock,
        )
        .await
        .unwrap();

        assert_eq!(resolved.origin, UsageOrigin::Live);
        assert_eq!(store.load().unwrap().fetched_at, now() + Duration::seconds(5));
    }
}
