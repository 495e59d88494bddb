use axum::http::HeaderName;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::GatewayError;

// Environment variables read when the limiter is first used
pub const REDIS_URL_VAR: &str = "REDIS_URL";
pub const REDIS_TOKEN_VAR: &str = "REDIS_TOKEN";

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "todo-gateway")]
#[command(about = "Read-only todo endpoint behind a Redis-backed sliding window rate limiter")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8787)]
    pub port: u16,

    // JSON file holding {"todos": [...]}
    #[arg(short, long, env = "TODOS_DATA", default_value = "data.json")]
    pub data: PathBuf,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 10)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 10)]
    pub rate_window: u64,

    // Max identifiers remembered as blocked by the ephemeral cache
    #[arg(long, default_value_t = 10_000)]
    pub cache_capacity: usize,

    // Upper bound for a single round trip to the counter store
    #[arg(long, default_value_t = 5_000)]
    pub store_timeout_ms: u64,

    // Trusted proxy header carrying the client address
    #[arg(long, default_value = "CF-Connecting-IP", value_parser = parse_header_name)]
    pub client_ip_header: HeaderName,

    // Prefix for counter keys in Redis
    #[arg(long, default_value = "todo-gateway")]
    pub key_prefix: String,

    // Keep counters in process memory instead of Redis (local runs)
    #[arg(long, default_value_t = false)]
    pub memory_store: bool,
}

/// Where the limiter keeps its window counters.
#[derive(Clone, Debug)]
pub enum StoreBackend {
    /// Upstash-compatible Redis REST endpoint, credentials from the environment.
    Upstash { client: reqwest::Client },
    /// Counters live in this process only.
    Memory,
}

/// Everything the limiter needs apart from the store credentials.
#[derive(Clone, Debug)]
pub struct LimiterSettings {
    pub limit: u32,
    pub window: Duration,
    pub cache_capacity: usize,
    pub store_timeout: Duration,
    pub key_prefix: String,
    pub backend: StoreBackend,
}

impl LimiterSettings {
    pub fn from_args(args: &Args) -> Self {
        let backend = if args.memory_store {
            StoreBackend::Memory
        } else {
            StoreBackend::Upstash {
                client: reqwest::Client::new(),
            }
        };

        Self {
            limit: args.rate_limit,
            window: Duration::from_secs(args.rate_window),
            cache_capacity: args.cache_capacity,
            store_timeout: Duration::from_millis(args.store_timeout_ms),
            key_prefix: args.key_prefix.clone(),
            backend,
        }
    }

    /// 10 requests per 10 seconds against the in-memory store.
    pub fn in_memory() -> Self {
        Self {
            limit: 10,
            window: Duration::from_secs(10),
            cache_capacity: 10_000,
            store_timeout: Duration::from_secs(5),
            key_prefix: "todo-gateway".to_string(),
            backend: StoreBackend::Memory,
        }
    }

    /// Checks the values that would make the window arithmetic meaningless.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.limit == 0 {
            return Err(GatewayError::InvalidConfig {
                name: "rate_limit",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.window_ms().map(|_| ())
    }

    /// Window length in whole milliseconds, at least one.
    pub fn window_ms(&self) -> Result<u64, GatewayError> {
        let window_ms = u64::try_from(self.window.as_millis()).map_err(|_| {
            GatewayError::InvalidConfig {
                name: "rate_window",
                reason: "does not fit in milliseconds".to_string(),
            }
        })?;
        if window_ms == 0 {
            return Err(GatewayError::InvalidConfig {
                name: "rate_window",
                reason: "must be at least one millisecond".to_string(),
            });
        }
        Ok(window_ms)
    }
}

/// Address and access token of the Redis REST endpoint.
#[derive(Clone)]
pub struct RedisCredentials {
    pub url: reqwest::Url,
    pub token: String,
}

impl std::fmt::Debug for RedisCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCredentials")
            .field("url", &self.url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl RedisCredentials {
    /// Reads `REDIS_URL` and `REDIS_TOKEN` through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = required(&lookup, REDIS_URL_VAR)?;
        let token = required(&lookup, REDIS_TOKEN_VAR)?;

        let url = reqwest::Url::parse(&raw_url).map_err(|e| GatewayError::InvalidConfig {
            name: REDIS_URL_VAR,
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::InvalidConfig {
                name: REDIS_URL_VAR,
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }

        Ok(Self { url, token })
    }
}

fn parse_header_name(raw: &str) -> Result<HeaderName, String> {
    HeaderName::try_from(raw.trim()).map_err(|e| format!("`{raw}` is not a header name: {e}"))
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, GatewayError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(GatewayError::MissingConfig(name))
}
