//! Per-client sliding window rate limiting.
//!
//! [`RateLimitGate`] owns the lazily built [`RateLimiter`]; the limiter asks a
//! [`WindowStore`] for each decision and short-circuits identifiers the
//! ephemeral cache already knows to be blocked.

mod gate;
mod limiter;
mod store;
mod upstash;

pub use gate::{EnvLookup, RateLimitGate};
pub use limiter::{RateLimitDecision, RateLimiter};
pub use store::{MemoryStore, WindowOutcome, WindowRequest, WindowStore};
pub use upstash::UpstashStore;

/// Bucket shared by every request that arrives without the client header.
pub const ANONYMOUS: &str = "anonymous";
