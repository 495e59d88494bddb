use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::cache::EphemeralCache;
use crate::config::LimiterSettings;
use crate::error::GatewayError;
use crate::metrics::{EPHEMERAL_CACHE_HITS, STORE_TIMEOUTS};
use crate::rate_limit::store::{WindowRequest, WindowStore};

/// Outcome of one admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub success: bool,
    pub limit: u32,
    pub remaining: u32,
    /// When the oldest request in the window expires, in ms since the epoch.
    pub reset: u64,
}

/// Sliding window limiter: at most `limit` admissions per identifier within
/// any trailing `window`.
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    cache: Arc<EphemeralCache>,
    limit: u32,
    window_ms: u64,
    timeout: Duration,
    prefix: String,
    // log members must be unique across processes sharing the store
    instance: String,
    sequence: AtomicU64,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn WindowStore>,
        cache: Arc<EphemeralCache>,
        settings: &LimiterSettings,
    ) -> Result<Self, GatewayError> {
        settings.validate()?;

        Ok(Self {
            store,
            cache,
            limit: settings.limit,
            window_ms: settings.window_ms()?,
            timeout: settings.store_timeout,
            prefix: settings.key_prefix.clone(),
            instance: format!("{}-{}", std::process::id(), now_ms()),
            sequence: AtomicU64::new(0),
        })
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Consumes one unit of quota for `identifier`.
    pub async fn limit(&self, identifier: &str) -> Result<RateLimitDecision, GatewayError> {
        self.limit_at(identifier, now_ms()).await
    }

    /// [`RateLimiter::limit`] against an explicit clock reading.
    pub async fn limit_at(
        &self,
        identifier: &str,
        now_ms: u64,
    ) -> Result<RateLimitDecision, GatewayError> {
        if let Some(blocked_until) = self.cache.blocked_until(identifier, now_ms) {
            EPHEMERAL_CACHE_HITS.inc();
            debug!(identifier, blocked_until, "rejected from ephemeral cache");
            return Ok(self.rejected(blocked_until));
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let request = WindowRequest {
            key: format!("{}:{}", self.prefix, identifier),
            member: format!("{}:{}:{}", now_ms, self.instance, sequence),
            limit: self.limit,
            now_ms,
            window_ms: self.window_ms,
        };

        let outcome = match tokio::time::timeout(self.timeout, self.store.admit(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                STORE_TIMEOUTS.inc();
                warn!(
                    identifier,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "counter store timed out, admitting request"
                );
                return Ok(RateLimitDecision {
                    success: true,
                    limit: self.limit,
                    remaining: 0,
                    reset: now_ms + self.window_ms,
                });
            }
        };

        if !outcome.admitted {
            self.cache.block_until(identifier, outcome.reset_ms, now_ms);
            return Ok(self.rejected(outcome.reset_ms));
        }

        Ok(RateLimitDecision {
            success: true,
            limit: self.limit,
            remaining: outcome.remaining,
            reset: outcome.reset_ms,
        })
    }

    fn rejected(&self, reset: u64) -> RateLimitDecision {
        RateLimitDecision {
            success: false,
            limit: self.limit,
            remaining: 0,
            reset,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::store::{MemoryStore, WindowOutcome};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    const WINDOW_MS: u64 = 10_000;
    const START: u64 = 1_700_000_000_000;

    // Counts how often the store is actually consulted
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WindowStore for CountingStore {
        async fn admit(&self, request: &WindowRequest) -> Result<WindowOutcome, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.admit(request).await
        }
    }

    struct HangingStore;

    #[async_trait]
    impl WindowStore for HangingStore {
        async fn admit(&self, _request: &WindowRequest) -> Result<WindowOutcome, GatewayError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(GatewayError::StoreResponse("unreachable".to_string()))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl WindowStore for FailingStore {
        async fn admit(&self, _request: &WindowRequest) -> Result<WindowOutcome, GatewayError> {
            Err(GatewayError::StoreResponse("WRONGPASS invalid token".to_string()))
        }
    }

    fn limiter_with(store: Arc<dyn WindowStore>) -> (RateLimiter, Arc<EphemeralCache>) {
        let cache = Arc::new(EphemeralCache::new(16));
        let limiter = RateLimiter::new(store, cache.clone(), &LimiterSettings::in_memory()).unwrap();
        (limiter, cache)
    }

    async fn admitted(limiter: &RateLimiter, identifier: &str, now_ms: u64, times: usize) -> usize {
        let mut admitted = 0;
        for _ in 0..times {
            if limiter.limit_at(identifier, now_ms).await.unwrap().success {
                admitted += 1;
            }
        }
        admitted
    }

    #[tokio::test]
    async fn ten_admitted_eleventh_rejected() {
        let (limiter, _) = limiter_with(Arc::new(MemoryStore::new()));

        for i in 0..10 {
            let decision = limiter.limit_at("1.2.3.4", START + i * 100).await.unwrap();
            assert!(decision.success, "request {i} should be admitted");
            assert_eq!(decision.remaining, 9 - i as u32);
        }

        let decision = limiter.limit_at("1.2.3.4", START + 1_000).await.unwrap();
        assert!(!decision.success);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset, START + WINDOW_MS);
    }

    #[tokio::test]
    async fn eleventh_just_inside_the_window_is_rejected() {
        let (limiter, _) = limiter_with(Arc::new(MemoryStore::new()));

        assert_eq!(admitted(&limiter, "1.2.3.4", START + 9_999, 10).await, 10);
        assert_eq!(admitted(&limiter, "1.2.3.4", START + 10_001, 1).await, 0);
        assert_eq!(admitted(&limiter, "1.2.3.4", START + 9_999 + WINDOW_MS - 1, 1).await, 0);
    }

    #[tokio::test]
    async fn full_quota_returns_once_the_window_has_passed() {
        let (limiter, _) = limiter_with(Arc::new(MemoryStore::new()));

        assert_eq!(admitted(&limiter, "1.2.3.4", START, 11).await, 10);
        assert_eq!(admitted(&limiter, "1.2.3.4", START + WINDOW_MS + 1, 10).await, 10);
        assert_eq!(admitted(&limiter, "1.2.3.4", START + WINDOW_MS + 1, 1).await, 0);
    }

    #[tokio::test]
    async fn quiet_trailing_window_is_not_penalized() {
        let (limiter, _) = limiter_with(Arc::new(MemoryStore::new()));

        assert_eq!(admitted(&limiter, "1.2.3.4", START, 10).await, 10);
        assert_eq!(admitted(&limiter, "1.2.3.4", START + 10_500, 10).await, 10);
    }

    #[tokio::test]
    async fn identifiers_have_independent_quota() {
        let (limiter, _) = limiter_with(Arc::new(MemoryStore::new()));

        assert_eq!(admitted(&limiter, "1.2.3.4", START, 11).await, 10);
        assert!(limiter.limit_at("5.6.7.8", START).await.unwrap().success);
    }

    #[tokio::test]
    async fn cached_rejection_skips_the_store() {
        let store = Arc::new(CountingStore::default());
        let (limiter, cache) = limiter_with(store.clone());

        for _ in 0..11 {
            limiter.limit_at("1.2.3.4", START).await.unwrap();
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 11);
        assert_eq!(cache.blocked_until("1.2.3.4", START), Some(START + WINDOW_MS));

        for _ in 0..5 {
            assert!(!limiter.limit_at("1.2.3.4", START + 10).await.unwrap().success);
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 11);

        // the block lifts exactly when the oldest entry leaves the window
        assert!(limiter.limit_at("1.2.3.4", START + WINDOW_MS).await.unwrap().success);
        assert_eq!(store.calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn store_timeout_admits() {
        let cache = Arc::new(EphemeralCache::new(16));
        let settings = LimiterSettings {
            store_timeout: Duration::from_millis(20),
            ..LimiterSettings::in_memory()
        };
        let limiter = RateLimiter::new(Arc::new(HangingStore), cache, &settings).unwrap();

        let decision = limiter.limit_at("1.2.3.4", START).await.unwrap();
        assert!(decision.success);
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let (limiter, _) = limiter_with(Arc::new(FailingStore));

        let err = limiter.limit_at("1.2.3.4", START).await.unwrap_err();
        assert!(matches!(err, GatewayError::StoreResponse(_)));
    }

    #[test]
    fn zero_window_is_refused_at_construction() {
        let settings = LimiterSettings {
            window: Duration::ZERO,
            ..LimiterSettings::in_memory()
        };
        let result = RateLimiter::new(
            Arc::new(MemoryStore::new()),
            Arc::new(EphemeralCache::new(16)),
            &settings,
        );

        assert!(matches!(
            result,
            Err(GatewayError::InvalidConfig { name: "rate_window", .. })
        ));
    }

    #[tokio::test]
    async fn wall_clock_entry_point_uses_same_quota() {
        let (limiter, _) = limiter_with(Arc::new(MemoryStore::new()));

        let decision = limiter.limit("anonymous").await.unwrap();
        assert!(decision.success);
        assert_eq!(decision.limit, 10);
        assert_eq!(limiter.window(), Duration::from_secs(10));
    }
}
