//! Reach-scoped cache registry: one bounded cache per reach level plus the
//! two cross-cutting secondary indices.
//!
//! Each reach level sits behind its own mutex (lock striping), so traffic
//! at different reach levels never contends. The category and replica
//! indices live behind a separate mutex that is always taken *inside* the
//! scope critical section that triggered the change, which keeps them
//! exactly in sync with the primary stores: a record is reachable through
//! an index iff it is currently live.
//!
//! Lock order is scope → indices, one scope at a time. Never the reverse.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cache::clock;
use crate::cache::record::{CacheRecord, CacheStats, Reach, REACH_COUNT};
use crate::cache::scope::SingleScopeCache;
use crate::config::CacheConfig;
use crate::error::CacheError;

/// Category tag pair → live (hash, reach) members.
type CategoryKey = (String, String);

/// The two write-path secondary indices.
///
/// Both store (hash, reach) pairs: the same content hash cached at two
/// reach levels is tracked independently, matching per-scope key
/// uniqueness.
#[derive(Debug, Default)]
pub(crate) struct CacheIndices {
    category: HashMap<CategoryKey, HashSet<(String, Reach)>>,
    replica: HashMap<String, HashSet<(String, Reach)>>,
}

impl CacheIndices {
    fn insert(&mut self, record: &CacheRecord) {
        let member = (record.hash.clone(), record.reach);
        self.category
            .entry(record.category_key())
            .or_default()
            .insert(member.clone());
        if let Some(holder) = &record.replica_holder {
            self.replica.entry(holder.clone()).or_default().insert(member);
        }
    }

    /// Remove a record's index entries. Every removal path (delete,
    /// eviction, expiry) goes through here in the same critical section
    /// as the store mutation.
    fn prune(&mut self, record: &CacheRecord) {
        let member = (record.hash.clone(), record.reach);
        let key = record.category_key();
        if let Some(members) = self.category.get_mut(&key) {
            members.remove(&member);
            if members.is_empty() {
                self.category.remove(&key);
            }
        }
        if let Some(holder) = &record.replica_holder {
            if let Some(members) = self.replica.get_mut(holder) {
                members.remove(&member);
                if members.is_empty() {
                    self.replica.remove(holder);
                }
            }
        }
    }

    fn by_category(&self, primary: &str, secondary: &str) -> Vec<String> {
        let key = (primary.to_string(), secondary.to_string());
        match self.category.get(&key) {
            Some(members) => {
                // Deduplicate hashes cached at several reach levels.
                let hashes: BTreeSet<&String> = members.iter().map(|(h, _)| h).collect();
                hashes.into_iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    fn category_members(&self, primary: &str, secondary: &str) -> Vec<(String, Reach)> {
        let key = (primary.to_string(), secondary.to_string());
        self.members_sorted(self.category.get(&key))
    }

    fn by_holder(&self, holder: &str) -> Vec<(String, Reach)> {
        self.members_sorted(self.replica.get(holder))
    }

    fn members_sorted(&self, members: Option<&HashSet<(String, Reach)>>) -> Vec<(String, Reach)> {
        let mut out: Vec<(String, Reach)> = members
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }
}

/// The registry: eight independent reach-level caches plus the indices.
///
/// All methods take `&self`; serialization happens per scope via the
/// internal striping, so the registry can be shared as-is (see
/// [`SharedCache`]).
#[derive(Debug)]
pub struct ScopedCacheRegistry {
    scopes: Vec<Mutex<SingleScopeCache>>,
    indices: Mutex<CacheIndices>,
}

impl ScopedCacheRegistry {
    /// Build the registry from configuration, one cache per reach level
    /// with its own capacity budget.
    pub fn new(config: &CacheConfig) -> Self {
        let scopes = Reach::ALL
            .iter()
            .map(|reach| Mutex::new(SingleScopeCache::new(config.scope.capacity_for(*reach))))
            .collect();
        Self {
            scopes,
            indices: Mutex::new(CacheIndices::default()),
        }
    }

    /// Build with the same capacity at every reach level.
    pub fn with_uniform_capacity(capacity_bytes_per_scope: u64) -> Self {
        let scopes = (0..REACH_COUNT)
            .map(|_| Mutex::new(SingleScopeCache::new(capacity_bytes_per_scope)))
            .collect();
        Self {
            scopes,
            indices: Mutex::new(CacheIndices::default()),
        }
    }

    /// Insert a record into its reach level's cache and index it.
    ///
    /// Returns how many records were evicted to make room; their
    /// index entries are pruned before the call returns. Errors with
    /// [`CacheError::SizeExceeded`] when the record alone cannot fit.
    pub fn put(&self, record: CacheRecord) -> Result<usize, CacheError> {
        let now = clock::now_ms();
        let mut cache = self.scopes[record.reach.ordinal() as usize].lock();
        let outcome = cache.put(record.clone(), now)?;

        // Index maintenance happens under the scope lock so a concurrent
        // query can never observe a key the store no longer holds.
        let mut indices = self.indices.lock();
        if let Some(old) = &outcome.replaced {
            indices.prune(old);
        }
        indices.insert(&record);
        for evicted in &outcome.evicted {
            indices.prune(evicted);
        }
        drop(indices);
        drop(cache);

        let evicted_count = outcome.evicted_count();
        if evicted_count > 0 {
            info!(
                hash = %record.hash,
                reach = %record.reach,
                evicted = evicted_count,
                "insert displaced lower-priority records"
            );
        } else {
            debug!(hash = %record.hash, reach = %record.reach, "record cached");
        }
        Ok(evicted_count)
    }

    /// Point lookup at a reach level. A hit refreshes access metadata;
    /// indices are untouched (they are write-path only).
    pub fn get(&self, hash: &str, reach: Reach) -> Option<CacheRecord> {
        let now = clock::now_ms();
        self.scopes[reach.ordinal() as usize].lock().get(hash, now)
    }

    /// Read without recording a hit or refreshing access metadata.
    pub fn peek(&self, hash: &str, reach: Reach) -> Option<CacheRecord> {
        self.scopes[reach.ordinal() as usize]
            .lock()
            .peek(hash)
            .cloned()
    }

    /// Whether a record is live at a reach level.
    pub fn contains(&self, hash: &str, reach: Reach) -> bool {
        self.scopes[reach.ordinal() as usize].lock().contains(hash)
    }

    /// Delete a record; false if it was not live. Absent keys are not an
    /// error and leave all counters unchanged.
    pub fn delete(&self, hash: &str, reach: Reach) -> bool {
        let mut cache = self.scopes[reach.ordinal() as usize].lock();
        match cache.delete(hash) {
            Some(record) => {
                self.indices.lock().prune(&record);
                true
            }
            None => false,
        }
    }

    /// Sweep every reach level, removing records older than `ttl_ms`.
    /// Driven by an external timer; O(k) per scope in the expired count.
    pub fn cleanup_expired(&self, now_ms: u64, ttl_ms: u64) -> usize {
        let mut total = 0;
        for scope in &self.scopes {
            let mut cache = scope.lock();
            let removed = cache.cleanup_expired(now_ms, ttl_ms);
            if !removed.is_empty() {
                let mut indices = self.indices.lock();
                for record in &removed {
                    indices.prune(record);
                }
            }
            total += removed.len();
        }
        if total > 0 {
            info!(removed = total, ttl_ms, "expiry sweep complete");
        }
        total
    }

    /// Live hashes carrying this category tag pair.
    pub fn query_by_category(&self, primary: &str, secondary: &str) -> Vec<String> {
        self.indices.lock().by_category(primary, secondary)
    }

    /// Live (hash, reach) pairs served by this replica holder.
    pub fn query_by_holder(&self, holder: &str) -> Vec<(String, Reach)> {
        self.indices.lock().by_holder(holder)
    }

    /// Counters for one reach level. O(1).
    pub fn scope_stats(&self, reach: Reach) -> CacheStats {
        self.scopes[reach.ordinal() as usize].lock().stats()
    }

    /// Counters summed across reach levels. O(number of scopes).
    pub fn global_stats(&self) -> CacheStats {
        let mut total = CacheStats::default();
        for scope in &self.scopes {
            total.merge(&scope.lock().stats());
        }
        total
    }

    /// Total live bytes across all reach levels.
    pub fn total_size(&self) -> u64 {
        self.scopes.iter().map(|s| s.lock().total_size()).sum()
    }

    /// Drop every record and both indices.
    pub fn clear(&self) {
        for scope in &self.scopes {
            scope.lock().clear();
        }
        *self.indices.lock() = CacheIndices::default();
    }

    pub(crate) fn category_members(&self, primary: &str, secondary: &str) -> Vec<(String, Reach)> {
        self.indices.lock().category_members(primary, secondary)
    }

    pub(crate) fn records_at(&self, reach: Reach) -> Vec<CacheRecord> {
        self.scopes[reach.ordinal() as usize]
            .lock()
            .records()
            .cloned()
            .collect()
    }
}

/// Shareable handle, in the same shape the host passes collaborators a
/// cache: construct once, clone the `Arc` everywhere.
pub type SharedCache = Arc<ScopedCacheRegistry>;

/// Create a new shareable registry.
pub fn new_shared_cache(config: &CacheConfig) -> SharedCache {
    Arc::new(ScopedCacheRegistry::new(config))
}
