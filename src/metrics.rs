use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("todo_requests_total", "Total number of todo requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("todo_rate_limited_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref EPHEMERAL_CACHE_HITS: Counter = register_counter!(
        "todo_ephemeral_cache_hits_total",
        "Rejections answered from the ephemeral cache without a store round trip"
    )
    .unwrap();
    pub static ref STORE_TIMEOUTS: Counter = register_counter!(
        "todo_store_timeouts_total",
        "Counter store calls that hit the timeout and were admitted"
    )
    .unwrap();
    pub static ref LIMITER_INIT_FAILURES: Counter = register_counter!(
        "todo_limiter_init_failures_total",
        "Failed attempts to build the rate limiter"
    )
    .unwrap();
    pub static ref LIMIT_LATENCY: Histogram = register_histogram!(
        "todo_rate_limit_latency_seconds",
        "Time spent deciding admission in seconds"
    )
    .unwrap();
    pub static ref EPHEMERAL_CACHE_SIZE: Gauge =
        register_gauge!("todo_ephemeral_cache_size", "Identifiers currently cached as blocked").unwrap();
}
