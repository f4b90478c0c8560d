//! Per-user TTL cache for progress reads
//!
//! Entries are keyed by (user id, resource name) and are served only while
//! younger than the TTL. Stale entries are dropped on access. Every `clear`
//! bumps a generation counter so that a fetch which started before the clear
//! can tell its result is no longer wanted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

/// Default freshness window for cached reads
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Logical resource names used in cache keys
pub mod resource {
    pub const COMPREHENSIVE_PROGRESS: &str = "comprehensive_progress";
    pub const USER_PROGRESS: &str = "user_progress";
}

/// Source of "now" for freshness checks
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        debug!(by_ms = by.as_millis() as u64, "ManualClock::advance: called");
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cache key: whose data, and which resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub user_id: String,
    pub resource: &'static str,
}

impl CacheKey {
    pub fn new(user_id: impl Into<String>, resource: &'static str) -> Self {
        Self {
            user_id: user_id.into(),
            resource,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.resource)
    }
}

/// A cached payload and when it was captured
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub captured_at: Instant,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.captured_at) < ttl
    }
}

/// In-memory progress cache
#[derive(Debug)]
pub struct ProgressCache {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    generation: u64,
}

impl ProgressCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        debug!(ttl_secs = ttl.as_secs(), "ProgressCache::new: called");
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
            generation: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current generation; changes on every clear
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fresh value for `key`, if any
    pub fn get(&mut self, key: &CacheKey) -> Option<Value> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => {
                debug!(%key, "get: hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!(%key, "get: stale, dropping");
                self.entries.remove(key);
                None
            }
            None => {
                debug!(%key, "get: miss");
                None
            }
        }
    }

    /// Store a value captured now
    pub fn insert(&mut self, key: CacheKey, value: Value) {
        debug!(%key, "insert: called");
        let captured_at = self.clock.now();
        self.entries.insert(key, CacheEntry { value, captured_at });
    }

    /// Store a value only if no clear happened since `generation` was read
    ///
    /// Returns whether the value was stored.
    pub fn insert_if_current(&mut self, key: CacheKey, value: Value, generation: u64) -> bool {
        if generation != self.generation {
            debug!(%key, generation, current = self.generation, "insert_if_current: outdated, discarding");
            return false;
        }
        self.insert(key, value);
        true
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        debug!(%key, "remove: called");
        self.entries.remove(key)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        debug!(entries = self.entries.len(), "clear: called");
        self.entries.clear();
        self.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
