use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::cache::EphemeralCache;
use crate::config::{LimiterSettings, RedisCredentials, StoreBackend};
use crate::error::GatewayError;
use crate::metrics::LIMITER_INIT_FAILURES;
use crate::rate_limit::limiter::RateLimiter;
use crate::rate_limit::store::{MemoryStore, WindowStore};
use crate::rate_limit::upstash::UpstashStore;

pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lazily built, process-wide rate limiter.
///
/// The limiter is constructed on first use, reading the store credentials
/// from the environment at that moment. Concurrent first callers wait on the
/// same construction. A failed construction leaves the gate empty, so the
/// next caller tries again.
pub struct RateLimitGate {
    cell: OnceCell<Arc<RateLimiter>>,
    settings: LimiterSettings,
    cache: Arc<EphemeralCache>,
    env: EnvLookup,
}

impl RateLimitGate {
    pub fn new(settings: LimiterSettings) -> Self {
        Self::with_env_lookup(settings, Arc::new(|name: &str| std::env::var(name).ok()))
    }

    /// Gate reading credentials through `env` instead of the process environment.
    pub fn with_env_lookup(settings: LimiterSettings, env: EnvLookup) -> Self {
        let cache = Arc::new(EphemeralCache::new(settings.cache_capacity));
        Self::with_cache(settings, cache, env)
    }

    pub fn with_cache(settings: LimiterSettings, cache: Arc<EphemeralCache>, env: EnvLookup) -> Self {
        Self {
            cell: OnceCell::new(),
            settings,
            cache,
            env,
        }
    }

    /// Returns the shared limiter, building it if this is the first call.
    pub async fn limiter(&self) -> Result<Arc<RateLimiter>, GatewayError> {
        self.cell
            .get_or_try_init(|| async {
                self.build().inspect_err(|e| {
                    LIMITER_INIT_FAILURES.inc();
                    error!(error = %e, "failed to initialize rate limiter");
                })
            })
            .await
            .cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub fn cache(&self) -> &Arc<EphemeralCache> {
        &self.cache
    }

    fn build(&self) -> Result<Arc<RateLimiter>, GatewayError> {
        self.settings.validate()?;

        let store: Arc<dyn WindowStore> = match &self.settings.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Upstash { client } => {
                let credentials = RedisCredentials::from_lookup(|name| (self.env)(name))?;
                info!(url = %credentials.url, "using Redis REST counter store");
                Arc::new(UpstashStore::new(client.clone(), credentials))
            }
        };

        let limiter = RateLimiter::new(store, self.cache.clone(), &self.settings)?;
        info!(
            limit = self.settings.limit,
            window_secs = self.settings.window.as_secs_f64(),
            cache_capacity = self.cache.capacity(),
            "rate limiter initialized"
        );
        Ok(Arc::new(limiter))
    }
}
