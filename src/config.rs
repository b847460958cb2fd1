//! Runtime configuration for blob-cache-tier.
//!
//! Configuration can be loaded from a JSON file or constructed
//! programmatically. All capacity and TTL knobs live here; scoring weights
//! are fixed tables (see [`crate::cache::score`]) and deliberately not
//! configurable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::record::Reach;
use crate::cache::scope::SingleScopeCache;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Per-reach-level capacity budgets.
    pub scope: ScopeTierConfig,

    /// Sub-chunk tier sizing.
    pub chunk: ChunkTierConfig,

    /// Expiry sweep parameters for the host's timer.
    pub sweep: SweepConfig,
}

/// Capacity budgets for the reach-level caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeTierConfig {
    /// Default capacity for every reach level, in bytes.
    pub capacity_bytes_per_scope: u64,

    /// Per-reach overrides, keyed by reach ordinal (0-7).
    pub capacity_overrides: HashMap<u8, u64>,
}

impl Default for ScopeTierConfig {
    fn default() -> Self {
        Self {
            capacity_bytes_per_scope: 256 * 1024 * 1024, // 256 MiB
            capacity_overrides: HashMap::new(),
        }
    }
}

impl ScopeTierConfig {
    /// Capacity budget for one reach level.
    pub fn capacity_for(&self, reach: Reach) -> u64 {
        self.capacity_overrides
            .get(&reach.ordinal())
            .copied()
            .unwrap_or(self.capacity_bytes_per_scope)
    }
}

/// Sub-chunk tier sizing: byte-bounded plus a fixed TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkTierConfig {
    /// Total chunk-tier capacity in bytes.
    pub capacity_bytes: u64,

    /// Chunk TTL in milliseconds; chunks older than this read as misses.
    pub ttl_ms: u64,
}

impl Default for ChunkTierConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 64 * 1024 * 1024, // 64 MiB
            ttl_ms: 10 * 60 * 1000,           // 10 minutes
        }
    }
}

/// Parameters the host's timer should use when driving `cleanup_expired`.
/// The cache never schedules sweeps itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Suggested interval between sweeps, in milliseconds.
    pub interval_ms: u64,

    /// Age past which reach-level records expire, in milliseconds.
    pub ttl_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60 * 1000,      // 1 minute
            ttl_ms: 24 * 60 * 60 * 1000, // 1 day
        }
    }
}

impl CacheConfig {
    /// Load configuration from a JSON file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: CacheConfig = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(CacheConfig::default())
        }
    }

    /// Construct the sub-chunk tier cache described by this configuration.
    pub fn chunk_cache(&self) -> SingleScopeCache {
        SingleScopeCache::with_ttl(self.chunk.capacity_bytes, self.chunk.ttl_ms)
    }
}
