// Dealdesk
// Copyright (C) 2025 Dealdesk

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! TTL-bounded cache of permission-check results
//!
//! Entries are pure booleans keyed `"{user_id}:{operation}:{args}"`; an
//! entry never represents a pending computation. Expired entries are
//! evicted on read and by the periodic cleanup task, and are never
//! returned as valid.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::counter;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Cached decision
    value: bool,
    /// When this entry expires
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: bool, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Total cache hits
    pub hits: u64,

    /// Total cache misses
    pub misses: u64,

    /// Total cache evictions
    pub evictions: u64,

    /// Current cache size
    pub current_size: usize,

    /// Maximum cache size reached
    pub max_size_reached: usize,
}

impl CacheStats {
    /// Calculate hit ratio
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 { 0.0 } else { self.hits as f64 / (self.hits + self.misses) as f64 }
    }
}

/// Permission decision cache
#[derive(Debug)]
pub struct PermissionCache {
    /// Decision entries
    entries: DashMap<String, CacheEntry>,

    /// Cache statistics
    stats: RwLock<CacheStats>,
}

impl PermissionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Get a still-valid decision from the cache
    pub fn get(&self, key: &str) -> Option<bool> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                self.stats.write().hits += 1;
                counter!("permission_cache_hits", 1);
                debug!("permission cache hit for key: {}", key);
                return Some(entry.value);
            }
        }

        // Evict outside the map guard to avoid deadlocking the shard
        if self.entries.remove_if(key, |_, entry| entry.is_expired()).is_some() {
            self.stats.write().evictions += 1;
            counter!("permission_cache_evictions", 1);
        }

        self.stats.write().misses += 1;
        counter!("permission_cache_misses", 1);
        debug!("permission cache miss for key: {}", key);
        None
    }

    /// Store a decision with the given TTL
    pub fn set(&self, key: String, value: bool, ttl: Duration) {
        debug!("permission cached for key: {} with TTL: {:?}", key, ttl);
        self.entries.insert(key, CacheEntry::new(value, ttl));
        self.update_size();
    }

    /// Remove every entry keyed under a user
    pub fn remove_user_entries(&self, user_id: &str) {
        let prefix = format!("{}:", user_id);
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        self.update_size();
        debug!("invalidated cache for user: {}", user_id);
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.entries.clear();
        self.stats.write().current_size = 0;
        debug!("cleared all cache entries");
    }

    /// Drop expired entries
    pub fn cleanup_expired(&self) {
        let mut evicted = 0u64;

        self.entries.retain(|_, entry| {
            if entry.is_expired() {
                evicted += 1;
                false
            } else {
                true
            }
        });

        if evicted > 0 {
            let mut stats = self.stats.write();
            stats.evictions += evicted;
            stats.current_size = self.entries.len();
            debug!("cleaned up {} expired cache entries", evicted);
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn update_size(&self) {
        let current_size = self.entries.len();
        let mut stats = self.stats.write();
        stats.current_size = current_size;
        if current_size > stats.max_size_reached {
            stats.max_size_reached = current_size;
        }
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(cache: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                cache.cleanup_expired();

                let stats = cache.stats();
                debug!(
                    "cache stats - hits: {}, misses: {}, hit ratio: {:.2}%, size: {}, evictions: {}",
                    stats.hits,
                    stats.misses,
                    stats.hit_ratio() * 100.0,
                    stats.current_size,
                    stats.evictions
                );

                if stats.hits + stats.misses > 100 && stats.hit_ratio() < 0.5 {
                    warn!("low permission cache hit ratio: {:.2}%", stats.hit_ratio() * 100.0);
                }
            }
        })
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new()
    }
}
