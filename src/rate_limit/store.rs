use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;

use crate::error::GatewayError;

/// One admission against the sliding log of `key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowRequest {
    pub key: String,
    /// Unique per request so two hits in the same millisecond are both logged.
    pub member: String,
    pub limit: u32,
    pub now_ms: u64,
    pub window_ms: u64,
}

impl WindowRequest {
    /// Entries at or before this instant have left the window.
    pub fn cutoff_ms(&self) -> u64 {
        self.now_ms.saturating_sub(self.window_ms)
    }
}

/// Store answer for one admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowOutcome {
    pub admitted: bool,
    pub remaining: u32,
    /// When the oldest logged request leaves the window, in ms since the epoch.
    pub reset_ms: u64,
}

/// Backend holding the per-identifier request logs.
///
/// `admit` drops entries older than the window, counts what is left and, if
/// the count is below the limit, logs this request. All of that must be
/// atomic with respect to other callers of the same key.
#[async_trait]
pub trait WindowStore: Send + Sync {
    async fn admit(&self, request: &WindowRequest) -> Result<WindowOutcome, GatewayError>;
}

// Logs above this many keys trigger a sweep of idle ones
const SWEEP_THRESHOLD: usize = 4_096;

/// Request logs kept in this process only.
///
/// Limits are not shared between instances, so this is meant for local runs
/// and tests.
#[derive(Default)]
pub struct MemoryStore {
    logs: DashMap<String, VecDeque<u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Runs the admission synchronously.
    pub fn admit_now(&self, request: &WindowRequest) -> WindowOutcome {
        let cutoff = request.cutoff_ms();

        if self.logs.len() > SWEEP_THRESHOLD {
            self.logs
                .retain(|_, log| log.back().is_some_and(|&t| t > cutoff));
        }

        let mut log = self.logs.entry(request.key.clone()).or_default();
        while log.front().is_some_and(|&t| t <= cutoff) {
            log.pop_front();
        }

        let limit = request.limit as usize;
        if log.len() >= limit {
            let oldest = log.front().copied().unwrap_or(request.now_ms);
            return WindowOutcome {
                admitted: false,
                remaining: 0,
                reset_ms: oldest + request.window_ms,
            };
        }

        // keep the log ordered even if clocks hand us a slightly older instant
        let at = log.partition_point(|&t| t <= request.now_ms);
        log.insert(at, request.now_ms);

        let oldest = log.front().copied().unwrap_or(request.now_ms);
        WindowOutcome {
            admitted: true,
            remaining: (limit - log.len()) as u32,
            reset_ms: oldest + request.window_ms,
        }
    }
}

#[async_trait]
impl WindowStore for MemoryStore {
    async fn admit(&self, request: &WindowRequest) -> Result<WindowOutcome, GatewayError> {
        Ok(self.admit_now(request))
    }
}
