//! Name to URL cache for NAPTR resolutions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Default upper bound on how long a resolution is cached.
pub const DEFAULT_MAX_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct CacheEntry {
    url: String,
    expires_at: Instant,
}

/// Thread-safe cache of resolved SMP URLs keyed by exact DNS name.
///
/// Lookups take a shared lock, inserts an exclusive one. Entries live for the
/// record TTL, never longer than the configured maximum.
pub struct NaptrCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    enabled: AtomicBool,
    max_ttl: Duration,
}

impl NaptrCache {
    /// Create an enabled cache with the default maximum TTL.
    pub fn new() -> Self {
        Self::with_max_ttl(DEFAULT_MAX_CACHE_TTL)
    }

    /// Create an enabled cache with an explicit maximum TTL.
    pub fn with_max_ttl(max_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            enabled: AtomicBool::new(true),
            max_ttl,
        }
    }

    /// Cached URL for `name`, if present, unexpired, and the cache is enabled.
    pub fn get(&self, name: &str) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let entries = self.entries.read();
        entries
            .get(name)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.url.clone())
    }

    /// Store `url` for `name`, dropping entries that have already expired.
    ///
    /// A zero TTL (after capping) means the answer must not be cached.
    pub fn put(&self, name: &str, url: impl Into<String>, ttl: Duration) {
        if !self.is_enabled() {
            return;
        }
        let ttl = ttl.min(self.max_ttl);
        if ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let entry = CacheEntry {
            url: url.into(),
            expires_at: now + ttl,
        };
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(name.to_string(), entry);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, entry| entry.expires_at > now);
    }

    /// Resume caching.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Stop caching. Existing entries are kept but not served.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// Whether the cache serves and stores entries.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Number of stored entries, including any expired since the last insert.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The maximum TTL applied to new entries.
    pub fn max_ttl(&self) -> Duration {
        self.max_ttl
    }
}

impl Default for NaptrCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NaptrCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NaptrCache")
            .field("entries", &self.len())
            .field("enabled", &self.is_enabled())
            .field("max_ttl", &self.max_ttl)
            .finish()
    }
}
