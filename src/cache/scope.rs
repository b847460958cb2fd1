//! One bounded cache instance: the store behind a single reach level,
//! and (configured with a TTL) the sub-chunk tier.
//!
//! Three parallel structures over the same records:
//! - a hash map for O(1) point lookup,
//! - an ordered eviction index keyed by score floor (see
//!   [`crate::cache::score`]) with recency as tie-breaker,
//! - an expiry index keyed by creation time, so TTL sweeps touch only the
//!   expired prefix and run in O(k) of the expired count.
//!
//! All removal paths funnel through `remove_entry` so the three structures
//! can never disagree.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::cache::record::{CacheRecord, CacheStats};
use crate::cache::score::{floor_millis, score_millis};
use crate::error::CacheError;

/// Eviction index key: (score floor millipoints, last access, hash).
type EvictKey = (i64, u64, String);

#[derive(Debug)]
struct Slot {
    record: CacheRecord,
    /// Quantized score floor; immutable for the life of the slot.
    floor_millis: i64,
}

/// Result of a `put`: what got displaced to make room.
#[derive(Debug, Default)]
pub struct PutOutcome {
    /// Prior record under the same hash, if this put replaced one.
    pub replaced: Option<CacheRecord>,
    /// Records evicted to satisfy the capacity bound, lowest score first.
    pub evicted: Vec<CacheRecord>,
}

impl PutOutcome {
    pub fn evicted_count(&self) -> usize {
        self.evicted.len()
    }
}

/// Byte-bounded cache for one reach level.
#[derive(Debug)]
pub struct SingleScopeCache {
    entries: HashMap<String, Slot>,
    evict_index: BTreeSet<EvictKey>,
    expiry_index: BTreeMap<u64, Vec<String>>,

    total_size: u64,
    capacity: u64,

    /// Fixed TTL for the sub-chunk tier; `get` lazily expires over-age
    /// entries when set. Reach-level caches leave this unset and rely on
    /// the externally driven `cleanup_expired` sweep.
    ttl_ms: Option<u64>,

    hit_count: u64,
    miss_count: u64,
    eviction_count: u64,
    expired_count: u64,
}

impl SingleScopeCache {
    /// Create a cache bounded by total byte size.
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            entries: HashMap::new(),
            evict_index: BTreeSet::new(),
            expiry_index: BTreeMap::new(),
            total_size: 0,
            capacity: capacity_bytes,
            ttl_ms: None,
            hit_count: 0,
            miss_count: 0,
            eviction_count: 0,
            expired_count: 0,
        }
    }

    /// Create a cache bounded by byte size and a fixed TTL (chunk tier).
    pub fn with_ttl(capacity_bytes: u64, ttl_ms: u64) -> Self {
        let mut cache = Self::new(capacity_bytes);
        cache.ttl_ms = Some(ttl_ms);
        cache
    }

    /// Insert or replace a record, then evict lowest-scoring records until
    /// the cache is back under its capacity.
    ///
    /// Rejects with [`CacheError::SizeExceeded`] when the record alone
    /// exceeds total capacity; the cache is left untouched. Replacing an
    /// existing hash never double-counts its size.
    pub fn put(&mut self, record: CacheRecord, now_ms: u64) -> Result<PutOutcome, CacheError> {
        if record.size_bytes > self.capacity {
            return Err(CacheError::SizeExceeded {
                size_bytes: record.size_bytes,
                capacity: self.capacity,
            });
        }

        let replaced = self.remove_entry(&record.hash);
        self.insert_slot(record);
        let evicted = self.evict_to_capacity(now_ms);
        Ok(PutOutcome { replaced, evicted })
    }

    /// O(1) point lookup. A hit updates `last_accessed_at` and
    /// `access_count`; scores of other entries are unaffected.
    pub fn get(&mut self, hash: &str, now_ms: u64) -> Option<CacheRecord> {
        if let Some(ttl) = self.ttl_ms {
            let over_age = self
                .entries
                .get(hash)
                .is_some_and(|slot| now_ms.saturating_sub(slot.record.created_at) > ttl);
            if over_age {
                if self.remove_entry(hash).is_some() {
                    self.expired_count += 1;
                }
                self.miss_count += 1;
                return None;
            }
        }

        let Some(slot) = self.entries.get_mut(hash) else {
            self.miss_count += 1;
            return None;
        };

        let old_key = (slot.floor_millis, slot.record.last_accessed_at, hash.to_string());
        slot.record.touch(now_ms);
        let new_key = (slot.floor_millis, slot.record.last_accessed_at, hash.to_string());
        let record = slot.record.clone();

        self.evict_index.remove(&old_key);
        self.evict_index.insert(new_key);
        self.hit_count += 1;
        Some(record)
    }

    /// Read a record without touching access metadata or hit/miss counters.
    pub fn peek(&self, hash: &str) -> Option<&CacheRecord> {
        self.entries.get(hash).map(|slot| &slot.record)
    }

    /// Whether a record is live under this hash.
    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    /// Remove a record. Returns it if present; absent hashes are a no-op.
    pub fn delete(&mut self, hash: &str) -> Option<CacheRecord> {
        self.remove_entry(hash)
    }

    /// Remove every record older than `ttl_ms` at `now_ms`, returning the
    /// removed records.
    ///
    /// Runs in O(k) of the expired count: the creation-time index lets the
    /// sweep stop at the first non-expired bucket.
    pub fn cleanup_expired(&mut self, now_ms: u64, ttl_ms: u64) -> Vec<CacheRecord> {
        let cutoff = now_ms.saturating_sub(ttl_ms);
        // age > ttl  ⇔  created_at < now − ttl, so the cutoff bucket stays.
        let expired: Vec<String> = self
            .expiry_index
            .range(..cutoff)
            .flat_map(|(_, hashes)| hashes.iter().cloned())
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for hash in expired {
            if let Some(record) = self.remove_entry(&hash) {
                self.expired_count += 1;
                debug!(hash = %record.hash, reach = record.reach.ordinal(), "expired record");
                removed.push(record);
            }
        }
        removed
    }

    /// Current counters. O(1).
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            item_count: self.entries.len(),
            total_size_bytes: self.total_size,
            eviction_count: self.eviction_count,
            expired_count: self.expired_count,
            hit_count: self.hit_count,
            miss_count: self.miss_count,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Drop all records. Counters persist (they are lifetime totals).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.evict_index.clear();
        self.expiry_index.clear();
        self.total_size = 0;
    }

    /// Iterate live records (query facade support).
    pub(crate) fn records(&self) -> impl Iterator<Item = &CacheRecord> {
        self.entries.values().map(|slot| &slot.record)
    }

    fn insert_slot(&mut self, record: CacheRecord) {
        let floor = floor_millis(&record);
        self.total_size += record.size_bytes;
        self.evict_index
            .insert((floor, record.last_accessed_at, record.hash.clone()));
        self.expiry_index
            .entry(record.created_at)
            .or_default()
            .push(record.hash.clone());
        self.entries.insert(
            record.hash.clone(),
            Slot {
                floor_millis: floor,
                record,
            },
        );
    }

    fn evict_to_capacity(&mut self, now_ms: u64) -> Vec<CacheRecord> {
        let mut evicted = Vec::new();
        while self.total_size > self.capacity {
            let Some(victim) = self.pick_victim(now_ms) else {
                break;
            };
            let Some(record) = self.remove_entry(&victim) else {
                break;
            };
            self.eviction_count += 1;
            debug!(
                hash = %record.hash,
                reach = record.reach.ordinal(),
                size_bytes = record.size_bytes,
                "evicted record"
            );
            evicted.push(record);
        }
        evicted
    }

    /// Lowest current-score record, ties broken by older last access.
    ///
    /// Walks the eviction index in score-floor order, re-evaluating each
    /// candidate's score at `now_ms`. Because the floor never exceeds the
    /// current score, the walk stops once the next floor is above the best
    /// candidate's current score — typically after a handful of entries.
    fn pick_victim(&self, now_ms: u64) -> Option<String> {
        let mut best: Option<(i64, u64, String)> = None;

        for (floor, last_accessed, hash) in &self.evict_index {
            if let Some((best_score, _, _)) = &best {
                if *floor > *best_score {
                    break;
                }
            }
            let Some(slot) = self.entries.get(hash) else {
                continue;
            };
            let current = score_millis(&slot.record, now_ms);
            let better = best.as_ref().is_none_or(|(b_score, b_last, b_hash)| {
                (current, *last_accessed, hash.as_str()) < (*b_score, *b_last, b_hash.as_str())
            });
            if better {
                // A leading candidate already at its floor cannot be
                // beaten: every later entry scores at least its own floor,
                // which is at least this one, and within a floor the index
                // already orders ties by last access. This keeps a scope
                // full of equal non-decaying records from scanning the
                // whole tie band on every eviction.
                if current == *floor {
                    return Some(hash.clone());
                }
                best = Some((current, *last_accessed, hash.clone()));
            }
        }

        best.map(|(_, _, hash)| hash)
    }

    /// Single choke point for all removal paths (delete, eviction, expiry):
    /// detaches the record from all three structures atomically.
    fn remove_entry(&mut self, hash: &str) -> Option<CacheRecord> {
        let slot = self.entries.remove(hash)?;
        self.evict_index.remove(&(
            slot.floor_millis,
            slot.record.last_accessed_at,
            hash.to_string(),
        ));
        if let Some(bucket) = self.expiry_index.get_mut(&slot.record.created_at) {
            bucket.retain(|h| h != hash);
            if bucket.is_empty() {
                self.expiry_index.remove(&slot.record.created_at);
            }
        }
        self.total_size = self.total_size.saturating_sub(slot.record.size_bytes);
        Some(slot.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::record::{ProficiencyLevel, Reach};

    const DAY_MS: u64 = 86_400_000;

    /// Record whose score equals 10 + proximity (private reach, medium
    /// bandwidth +5, caretaker +5, no decay).
    fn scored(hash: &str, size: u64, proximity: i32, now: u64) -> CacheRecord {
        let mut record = CacheRecord::new(hash, size, Reach::Private, now);
        record.proximity_score = proximity;
        record
    }

    #[test]
    fn test_round_trip_updates_access_only() {
        let mut cache = SingleScopeCache::new(1_000);
        let record = scored("a", 100, 0, 1_000);
        cache.put(record.clone(), 1_000).unwrap();

        let got = cache.get("a", 2_000).unwrap();
        assert_eq!(got.last_accessed_at, 2_000);
        assert_eq!(got.access_count, 1);

        let mut expected = record;
        expected.last_accessed_at = got.last_accessed_at;
        expected.access_count = got.access_count;
        assert_eq!(got, expected);
    }

    #[test]
    fn test_replace_does_not_double_count() {
        let mut cache = SingleScopeCache::new(1_000);
        cache.put(scored("a", 400, 0, 0), 0).unwrap();
        let outcome = cache.put(scored("a", 300, 0, 0), 0).unwrap();
        assert!(outcome.replaced.is_some());
        assert_eq!(outcome.evicted_count(), 0);
        assert_eq!(cache.total_size(), 300);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_oversized_insert_rejected_cache_unchanged() {
        let mut cache = SingleScopeCache::new(100);
        cache.put(scored("a", 60, 0, 0), 0).unwrap();
        let before = cache.stats();

        let err = cache.put(scored("big", 101, 0, 0), 0).unwrap_err();
        assert_eq!(
            err,
            CacheError::SizeExceeded {
                size_bytes: 101,
                capacity: 100
            }
        );
        assert_eq!(cache.stats(), before);
        assert!(cache.contains("a"));
    }

    #[test]
    fn test_evicts_lowest_score_first() {
        // The concrete scenario: capacity 100, A(40, score 10),
        // B(40, score 50), C(40, score 30) → A evicted.
        let mut cache = SingleScopeCache::new(100);
        cache.put(scored("a", 40, 0, 0), 0).unwrap();
        cache.put(scored("b", 40, 40, 0), 0).unwrap();
        let outcome = cache.put(scored("c", 40, 20, 0), 0).unwrap();

        assert_eq!(outcome.evicted_count(), 1);
        assert_eq!(outcome.evicted[0].hash, "a");
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));

        let stats = cache.stats();
        assert_eq!(stats.eviction_count, 1);
        assert_eq!(stats.item_count, 2);
        assert_eq!(stats.total_size_bytes, 80);
    }

    #[test]
    fn test_eviction_tie_broken_by_older_access() {
        let mut cache = SingleScopeCache::new(100);
        cache.put(scored("old", 40, 0, 1_000), 1_000).unwrap();
        cache.put(scored("new", 40, 0, 2_000), 2_000).unwrap();

        let outcome = cache.put(scored("c", 40, 50, 3_000), 3_000).unwrap();
        assert_eq!(outcome.evicted_count(), 1);
        assert_eq!(outcome.evicted[0].hash, "old");
    }

    #[test]
    fn test_eviction_rescored_with_current_clock() {
        // "decayed" scores 55 at insert but only 5 after 30 days of Seen
        // decay; "steady" never decays off 40. Eviction at day 30 must
        // pick the currently-lower record, not the insert-time order.
        let mut cache = SingleScopeCache::new(100);
        cache.put(scored("steady", 40, 30, 0), 0).unwrap();
        cache
            .put(
                scored("decayed", 40, 45, 0).with_proficiency(ProficiencyLevel::Seen),
                0,
            )
            .unwrap();

        let now = 30 * DAY_MS;
        let outcome = cache.put(scored("fresh", 40, 20, now), now).unwrap();
        assert_eq!(outcome.evicted_count(), 1);
        assert_eq!(outcome.evicted[0].hash, "decayed");
        assert!(cache.contains("steady"));
    }

    #[test]
    fn test_uniform_tie_band_evicts_in_access_order() {
        // A scope full of identical non-decaying records: eviction walks
        // off the front of the index in last-access order rather than
        // scanning the whole tie band.
        let mut cache = SingleScopeCache::new(2_000);
        for i in 0..50u64 {
            cache.put(scored(&format!("h{i}"), 40, 10, i), i).unwrap();
        }
        cache.get("h0", 100);

        let outcome = cache.put(scored("top", 40, 90, 200), 200).unwrap();
        assert_eq!(outcome.evicted_count(), 1);
        assert_eq!(outcome.evicted[0].hash, "h1");
        assert!(cache.contains("h0"));
    }

    #[test]
    fn test_decayed_record_underbids_steady_tie_band() {
        // "fading" starts at 40 but drops to 15 after 10 days of Seen
        // decay, under the steady pair's 20. Mid-decay its current score
        // sits strictly above its floor, so the walk must re-score it and
        // still pick it over the steady band.
        let mut cache = SingleScopeCache::new(120);
        cache.put(scored("a", 40, 10, 0), 0).unwrap();
        cache.put(scored("b", 40, 10, 1), 1).unwrap();
        cache
            .put(
                scored("fading", 40, 30, 2).with_proficiency(ProficiencyLevel::Seen),
                2,
            )
            .unwrap();

        let now = 10 * DAY_MS;
        let outcome = cache.put(scored("new", 40, 50, now), now).unwrap();
        assert_eq!(outcome.evicted_count(), 1);
        assert_eq!(outcome.evicted[0].hash, "fading");
        assert!(cache.contains("a") && cache.contains("b"));
    }

    #[test]
    fn test_capacity_invariant_across_many_puts() {
        let mut cache = SingleScopeCache::new(500);
        for i in 0..50 {
            let record = scored(&format!("h{i}"), 60, (i % 10) * 10, i as u64);
            cache.put(record, i as u64).unwrap();
            assert!(cache.total_size() <= 500);
        }
    }

    #[test]
    fn test_delete_absent_leaves_stats_unchanged() {
        let mut cache = SingleScopeCache::new(100);
        cache.put(scored("a", 40, 0, 0), 0).unwrap();
        let before = cache.stats();
        assert!(cache.delete("missing").is_none());
        assert_eq!(cache.stats(), before);
    }

    #[test]
    fn test_cleanup_removes_exactly_expired_set() {
        let mut cache = SingleScopeCache::new(10_000);
        cache.put(scored("old", 10, 0, 1_000), 1_000).unwrap();
        cache.put(scored("boundary", 10, 0, 5_000), 5_000).unwrap();
        cache.put(scored("young", 10, 0, 9_000), 9_000).unwrap();

        // ttl 5000 at now 10000: cutoff 5000. Only created_at < 5000 is
        // older than the ttl; the boundary record ages exactly ttl and stays.
        let removed = cache.cleanup_expired(10_000, 5_000);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].hash, "old");
        assert!(cache.contains("boundary"));
        assert!(cache.contains("young"));
        assert_eq!(cache.stats().expired_count, 1);
        assert_eq!(cache.stats().eviction_count, 0);
    }

    #[test]
    fn test_ttl_lazy_expiry_on_get() {
        let mut cache = SingleScopeCache::with_ttl(1_000, 5_000);
        cache.put(scored("chunk", 10, 0, 0), 0).unwrap();

        assert!(cache.get("chunk", 4_000).is_some());
        // Past the ttl the entry reports a miss and is gone.
        assert!(cache.get("chunk", 6_000).is_none());
        assert!(!cache.contains("chunk"));

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.expired_count, 1);
    }

    #[test]
    fn test_hit_miss_counters() {
        let mut cache = SingleScopeCache::new(100);
        cache.put(scored("a", 10, 0, 0), 0).unwrap();
        cache.get("a", 1);
        cache.get("a", 2);
        cache.get("nope", 3);

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.miss_count, 1);
    }
}
