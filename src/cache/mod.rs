//! Reach-isolated cache management.
//!
//! This module contains the core cache data structures and algorithms:
//! - [`record`]: CacheRecord, reach/proficiency/bandwidth/tier enums, stats
//! - [`score`]: priority scoring tables and the retention score function
//! - [`scope`]: one byte-bounded cache instance with O(k) expiry sweeps
//! - [`registry`]: per-reach composition plus category/replica indices
//! - [`query`]: read-only query facade for discovery and monitoring
//! - [`clock`]: millisecond wall-clock helper

pub mod clock;
pub mod query;
pub mod record;
pub mod registry;
pub mod scope;
pub mod score;
