//! # Geometry Cache
//!
//! Bounded least-recently-used cache of flatten, boolean and offset
//! results. Keys are content hashes of the operation, the exact operand
//! coordinates (or path text and placement) and the tolerance, so a hit
//! always returns the geometry a fresh computation would have produced.
//! The cache is an optimization only.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use laserkit_core::PolygonSet;
use parking_lot::Mutex;
use tracing::trace;

/// Default number of cached results.
pub const DEFAULT_CACHE_CAPACITY: usize = 300;

/// The operation a cached result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryOp {
    Union,
    Difference,
    Normalize,
    Offset,
    Flatten,
}

/// Stable hash of `(operation, operand fingerprints, tolerance)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryCacheKey(u64);

impl GeometryCacheKey {
    /// Builds a key. Operand order matters; callers of commutative
    /// operations sort the fingerprints first.
    pub fn new(op: GeometryOp, fingerprints: &[u64], tolerance: f64) -> Self {
        let mut hasher = DefaultHasher::new();
        op.hash(&mut hasher);
        fingerprints.len().hash(&mut hasher);
        for fp in fingerprints {
            fp.hash(&mut hasher);
        }
        tolerance.to_bits().hash(&mut hasher);
        Self(hasher.finish())
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Hashes the exact coordinate bits of every ring.
pub fn fingerprint(set: &PolygonSet) -> u64 {
    let mut hasher = DefaultHasher::new();
    set.len().hash(&mut hasher);
    for polygon in set {
        polygon.len().hash(&mut hasher);
        for p in polygon.points() {
            p.x.to_bits().hash(&mut hasher);
            p.y.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Hashes raw path data.
pub fn fingerprint_str(data: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of evictions
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`, or 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: Arc<PolygonSet>,
    last_access: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<GeometryCacheKey, CacheEntry>,
    clock: u64,
    stats: CacheStats,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.evictions += 1;
            trace!("Evicted geometry cache entry {:016x}", key.value());
        }
    }
}

/// Thread-safe LRU cache of polygon results.
#[derive(Debug)]
pub struct GeometryCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl Default for GeometryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl GeometryCache {
    /// Creates a cache holding at most `capacity` entries. A capacity of 0
    /// disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &GeometryCacheKey) -> Option<Arc<PolygonSet>> {
        let mut state = self.state.lock();
        let now = state.tick();
        let hit = state.entries.get_mut(key).map(|entry| {
            entry.last_access = now;
            Arc::clone(&entry.value)
        });
        if hit.is_some() {
            state.stats.hits += 1;
        } else {
            state.stats.misses += 1;
        }
        hit
    }

    /// Stores `value`, evicting the least recently used entries past
    /// capacity.
    pub fn insert(&self, key: GeometryCacheKey, value: Arc<PolygonSet>) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.state.lock();
        if !state.entries.contains_key(&key) {
            while state.entries.len() >= self.capacity {
                state.evict_lru();
            }
        }
        let now = state.tick();
        state.entries.insert(
            key,
            CacheEntry {
                value,
                last_access: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn contains(&self, key: &GeometryCacheKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Drops every entry and resets the statistics.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.stats = CacheStats::default();
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }
}
