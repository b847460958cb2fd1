//! blob-cache-tier: reach-isolated multi-tier content cache.
//!
//! An in-process cache for content-addressed binary payloads (media blobs
//! and their sub-chunks). Each reach level — from private up to the global
//! commons — gets its own capacity budget, so content at one level can
//! never evict content at another. Eviction is priority-weighted: a
//! multi-factor retention score (reach, proximity, bandwidth, contributor
//! standing, affinity, freshness decay) decides victims, with recency only
//! as a tie-breaker. TTL sweeps run in O(k) of the expired count.
//!
//! The cache performs no I/O and owns no payload bytes: the host fetches
//! blobs on a miss, stores them under the record's hash, and drives the
//! expiry sweep from its own timer.
//!
//! ```
//! use blob_cache_tier::{CacheRecord, Reach, ScopedCacheRegistry};
//!
//! let cache = ScopedCacheRegistry::with_uniform_capacity(1024 * 1024);
//! let record = CacheRecord::new("qmhash", 4096, Reach::Commons, 0)
//!     .with_categories("protocol", "governance");
//! cache.put(record).unwrap();
//! assert!(cache.get("qmhash", Reach::Commons).is_some());
//! ```

pub mod cache;
pub mod config;
pub mod error;

pub use cache::query::{CacheQuery, QueryFacade};
pub use cache::record::{
    BandwidthClass, CacheRecord, CacheStats, ContributorTier, HealthState, ProficiencyLevel,
    Reach, DEFAULT_CATEGORY, REACH_COUNT,
};
pub use cache::registry::{new_shared_cache, ScopedCacheRegistry, SharedCache};
pub use cache::scope::{PutOutcome, SingleScopeCache};
pub use cache::score::priority_score;
pub use config::CacheConfig;
pub use error::CacheError;
