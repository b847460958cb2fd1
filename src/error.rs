//! Error types for cache operations.
//!
//! Only two conditions are reportable errors; everything else is total.
//! An absent key on `get`/`delete` is *not* an error — it degrades to
//! "not found" semantics so the host can serve the item uncached.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A single record is larger than its scope's total capacity. The record
    /// is rejected without touching the cache; the caller must chunk it or
    /// route it elsewhere.
    #[error("record of {size_bytes} bytes exceeds scope capacity of {capacity} bytes")]
    SizeExceeded { size_bytes: u64, capacity: u64 },

    /// A reach ordinal outside 0-7 was supplied at the API boundary.
    #[error("reach ordinal {ordinal} out of range (0-7)")]
    InvalidScope { ordinal: u8 },
}
