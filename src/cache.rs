use dashmap::DashMap;

use crate::metrics::EPHEMERAL_CACHE_SIZE;

// Cache entry: identifier is blocked until this instant (ms since epoch)
#[derive(Clone, Copy, Debug)]
pub struct CacheEntry {
    pub reset_at_ms: u64,
}

/// Process-local memory of identifiers the counter store has already rejected.
///
/// A blocked identifier is answered locally until its window resets, which
/// saves a store round trip per request from a client that keeps hammering.
/// The map is bounded: once `capacity` identifiers are held, expired entries
/// are dropped first and then the entry closest to its reset.
pub struct EphemeralCache {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
}

impl EphemeralCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    /// Returns the reset instant if `identifier` is still blocked at `now_ms`.
    pub fn blocked_until(&self, identifier: &str, now_ms: u64) -> Option<u64> {
        let reset_at_ms = self.entries.get(identifier)?.reset_at_ms;
        if reset_at_ms > now_ms {
            return Some(reset_at_ms);
        }

        // stale
        self.entries
            .remove_if(identifier, |_, entry| entry.reset_at_ms <= now_ms);
        EPHEMERAL_CACHE_SIZE.set(self.entries.len() as f64);
        None
    }

    /// Remembers that `identifier` is rejected until `reset_at_ms`.
    pub fn block_until(&self, identifier: &str, reset_at_ms: u64, now_ms: u64) {
        if self.capacity == 0 || reset_at_ms <= now_ms {
            return;
        }

        if !self.entries.contains_key(identifier) && self.entries.len() >= self.capacity {
            self.evict(now_ms);
        }

        self.entries
            .insert(identifier.to_string(), CacheEntry { reset_at_ms });
        EPHEMERAL_CACHE_SIZE.set(self.entries.len() as f64);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict(&self, now_ms: u64) {
        self.entries.retain(|_, entry| entry.reset_at_ms > now_ms);

        while self.entries.len() >= self.capacity {
            let soonest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().reset_at_ms)
                .map(|entry| entry.key().clone());

            match soonest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}
