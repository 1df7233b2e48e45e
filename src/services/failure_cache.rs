use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::external::price_provider::PriceProviderError;

/// Why the last quote lookup for a symbol failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    RateLimited,
    Upstream,
}

impl FailureKind {
    /// How long a symbol stays skipped after this kind of failure
    pub fn ttl(self) -> Duration {
        match self {
            FailureKind::NotFound => Duration::hours(24),
            FailureKind::RateLimited => Duration::minutes(15),
            FailureKind::Upstream => Duration::hours(1),
        }
    }
}

impl From<&PriceProviderError> for FailureKind {
    fn from(err: &PriceProviderError) -> Self {
        match err {
            PriceProviderError::NotFound(_) => FailureKind::NotFound,
            PriceProviderError::RateLimited => FailureKind::RateLimited,
            _ => FailureKind::Upstream,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub failed_at: DateTime<Utc>,
    pub kind: FailureKind,
}

impl FailureInfo {
    pub fn retry_after(&self) -> DateTime<Utc> {
        self.failed_at + self.kind.ttl()
    }
}

/// Symbols whose quote lookup recently failed, so forecasts go straight to
/// the fallback price instead of hammering the provider.
#[derive(Clone, Default)]
pub struct FailureCache {
    cache: Arc<DashMap<String, FailureInfo>>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active failure for `symbol`, dropping it if the TTL has passed
    pub fn is_failed(&self, symbol: &str) -> Option<FailureInfo> {
        self.is_failed_at(symbol, Utc::now())
    }

    fn is_failed_at(&self, symbol: &str, now: DateTime<Utc>) -> Option<FailureInfo> {
        let info = self.cache.get(symbol)?.value().clone();
        if now < info.retry_after() {
            return Some(info);
        }
        self.cache.remove(symbol);
        None
    }

    pub fn record_failure(&self, symbol: &str, kind: FailureKind) {
        self.record_failure_at(symbol, kind, Utc::now());
    }

    fn record_failure_at(&self, symbol: &str, kind: FailureKind, failed_at: DateTime<Utc>) {
        self.cache
            .insert(symbol.to_string(), FailureInfo { failed_at, kind });
    }

    pub fn clear(&self, symbol: &str) {
        self.cache.remove(symbol);
    }

    /// Drop every entry whose TTL has passed. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }

    fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, info| now < info.retry_after());
        before.saturating_sub(self.cache.len())
    }

    /// Sweep expired entries on a fixed interval. Symbols that are never
    /// requested again are otherwise only evicted by a lookup.
    pub fn spawn_cleanup(&self, every: std::time::Duration) -> JoinHandle<()> {
        info!("Failure cache cleanup every {:?}", every);
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.cleanup_expired();
                if removed > 0 {
                    debug!("Failure cache cleanup removed {} expired entries", removed);
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_records_and_retrieves_failures() {
        let cache = FailureCache::new();
        cache.record_failure("INVALID.NS", FailureKind::NotFound);

        let result = cache.is_failed("INVALID.NS");
        assert_eq!(result.map(|i| i.kind), Some(FailureKind::NotFound));
        assert!(cache.is_failed("TCS.NS").is_none());
    }

    #[test]
    fn test_cache_clears_symbol() {
        let cache = FailureCache::new();
        cache.record_failure("TEST.NS", FailureKind::Upstream);
        assert_eq!(cache.len(), 1);

        cache.clear("TEST.NS");
        assert!(cache.is_failed("TEST.NS").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = FailureCache::new();
        let two_hours_ago = Utc::now() - Duration::hours(2);
        cache.record_failure_at("SLOW.NS", FailureKind::RateLimited, two_hours_ago);
        cache.record_failure_at("GONE.NS", FailureKind::NotFound, two_hours_ago);

        assert!(cache.is_failed("SLOW.NS").is_none());
        assert!(cache.is_failed("GONE.NS").is_some());

        cache.record_failure_at("OLD.NS", FailureKind::Upstream, Utc::now() - Duration::days(2));
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cleanup_counts_only_expired_entries() {
        let cache = FailureCache::new();
        let now = Utc::now();
        cache.record_failure_at("A.NS", FailureKind::RateLimited, now - Duration::minutes(20));
        cache.record_failure_at("B.NS", FailureKind::Upstream, now - Duration::minutes(30));
        cache.record_failure_at("C.NS", FailureKind::NotFound, now - Duration::hours(25));

        assert_eq!(cache.cleanup_expired_at(now), 2);
        assert!(cache.is_failed_at("B.NS", now).is_some());
        assert_eq!(cache.cleanup_expired_at(now), 0);
    }

    #[tokio::test]
    async fn test_background_cleanup_evicts_symbols_never_requested_again() {
        let cache = FailureCache::new();
        for i in 0..50 {
            cache.record_failure_at(
                &format!("GONE{}.NS", i),
                FailureKind::RateLimited,
                Utc::now() - Duration::hours(1),
            );
        }
        cache.record_failure("FRESH.NS", FailureKind::NotFound);
        assert_eq!(cache.len(), 51);

        let handle = cache.spawn_cleanup(std::time::Duration::from_millis(10));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(cache.len(), 1);
        assert!(cache.is_failed("FRESH.NS").is_some());
    }

    #[test]
    fn test_kind_from_provider_error() {
        assert_eq!(
            FailureKind::from(&PriceProviderError::NotFound("X".into())),
            FailureKind::NotFound
        );
        assert_eq!(FailureKind::from(&PriceProviderError::RateLimited), FailureKind::RateLimited);
        assert_eq!(
            FailureKind::from(&PriceProviderError::Network("timeout".into())),
            FailureKind::Upstream
        );
    }
}
