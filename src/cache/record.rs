//! Cache record types and the bounded classification enums.
//!
//! A [`CacheRecord`] is the metadata stored per cached item; the payload
//! bytes themselves are owned by the host, keyed by `hash`. All ordinal
//! fields are closed enums with explicit discriminants so the scoring
//! tables stay total.

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Sentinel category used when the caller supplies no tag.
pub const DEFAULT_CATEGORY: &str = "other";

/// Number of reach levels (and therefore per-scope cache instances).
pub const REACH_COUNT: usize = 8;

/// Content reach level — who may access a cached item, least to most public.
///
/// Each reach level gets its own capacity budget so content at one level
/// can never evict content at another.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Reach {
    Private = 0,
    Invited = 1,
    Local = 2,
    Neighborhood = 3,
    Municipal = 4,
    Bioregional = 5,
    Regional = 6,
    Commons = 7,
}

impl Reach {
    /// All reach levels in ordinal order.
    pub const ALL: [Reach; REACH_COUNT] = [
        Reach::Private,
        Reach::Invited,
        Reach::Local,
        Reach::Neighborhood,
        Reach::Municipal,
        Reach::Bioregional,
        Reach::Regional,
        Reach::Commons,
    ];

    /// Numeric ordinal (0 = most restricted, 7 = most public).
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for Reach {
    type Error = CacheError;

    fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
        Reach::ALL
            .get(ordinal as usize)
            .copied()
            .ok_or(CacheError::InvalidScope { ordinal })
    }
}

impl From<Reach> for u8 {
    fn from(reach: Reach) -> u8 {
        reach.ordinal()
    }
}

impl std::fmt::Display for Reach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Reach::Private => "private",
            Reach::Invited => "invited",
            Reach::Local => "local",
            Reach::Neighborhood => "neighborhood",
            Reach::Municipal => "municipal",
            Reach::Bioregional => "bioregional",
            Reach::Regional => "regional",
            Reach::Commons => "commons",
        };
        write!(f, "{name}")
    }
}

/// Proficiency level of the consumer for this content.
///
/// Drives the freshness decay table: higher proficiency decays slower,
/// so well-mastered content keeps its retention score longer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ProficiencyLevel {
    NotStarted = 0,
    Seen = 1,
    Remember = 2,
    Understand = 3,
    Apply = 4,
    Analyze = 5,
    Evaluate = 6,
    Create = 7,
}

impl ProficiencyLevel {
    /// Daily freshness decay rate for this level.
    ///
    /// `NotStarted` never decays; the remaining levels decrease strictly
    /// from 0.05/day down to 0.005/day.
    pub fn decay_rate_per_day(&self) -> f64 {
        match self {
            ProficiencyLevel::NotStarted => 0.0,
            ProficiencyLevel::Seen => 0.05,
            ProficiencyLevel::Remember => 0.03,
            ProficiencyLevel::Understand => 0.02,
            ProficiencyLevel::Apply => 0.015,
            ProficiencyLevel::Analyze => 0.01,
            ProficiencyLevel::Evaluate => 0.008,
            ProficiencyLevel::Create => 0.005,
        }
    }

    /// Freshness (0.0-1.0) after `age_days` at this level's decay rate.
    pub fn freshness_at(&self, age_days: f64) -> f64 {
        (1.0 - self.decay_rate_per_day() * age_days).max(0.0)
    }

    /// Coarse freshness bucket used by monitoring collaborators.
    pub fn freshness_status(&self, age_days: f64) -> &'static str {
        let freshness = self.freshness_at(age_days);
        if freshness >= 0.7 {
            "fresh"
        } else if freshness >= 0.4 {
            "stale"
        } else {
            "critical"
        }
    }
}

/// Bandwidth class of the serving party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BandwidthClass {
    Low = 1,
    Medium = 2,
    High = 3,
    Ultra = 4,
}

impl BandwidthClass {
    /// Fixed scoring bonus (Low is a penalty).
    pub fn score_bonus(&self) -> f64 {
        match self {
            BandwidthClass::Low => -5.0,
            BandwidthClass::Medium => 5.0,
            BandwidthClass::High => 10.0,
            BandwidthClass::Ultra => 20.0,
        }
    }
}

/// Standing of the contributing/serving party.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ContributorTier {
    Caretaker = 1,
    Curator = 2,
    Expert = 3,
    Pioneer = 4,
}

impl ContributorTier {
    /// Fixed scoring bonus.
    pub fn score_bonus(&self) -> f64 {
        match self {
            ContributorTier::Caretaker => 5.0,
            ContributorTier::Curator => 15.0,
            ContributorTier::Expert => 30.0,
            ContributorTier::Pioneer => 50.0,
        }
    }
}

/// Health of the record's associated source. Informational only — it is
/// carried for monitoring collaborators and never enters capacity accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HealthState {
    Healthy = 0,
    Degraded = 1,
    Critical = 2,
}

/// Metadata for one cached item.
///
/// `hash` is unique within one reach level's cache, not globally — the same
/// content may be cached independently at two reach levels. The reach of a
/// live record never changes; re-scoping requires delete + re-insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Content-addressed identifier.
    pub hash: String,

    /// Declared payload size, used for capacity accounting.
    pub size_bytes: u64,

    /// Creation timestamp (Unix ms).
    pub created_at: u64,

    /// Last successful read (Unix ms).
    pub last_accessed_at: u64,

    /// Incremented on every successful read.
    pub access_count: u32,

    /// Reach level, immutable once inserted.
    pub reach: Reach,

    /// Subject-domain tag.
    pub category_primary: String,

    /// Narrative/epic tag.
    pub category_secondary: String,

    /// Peer known to be serving this content, if any.
    pub replica_holder: Option<String>,

    /// Standing of the contributing party. Scoring input only.
    pub contributor_tier: ContributorTier,

    /// Consumer proficiency, drives the freshness decay rate.
    pub proficiency: ProficiencyLevel,

    /// Serving proximity, -100 (far/expensive) to +100 (near/cheap).
    pub proximity_score: i32,

    /// Bandwidth class of the serving party.
    pub bandwidth_class: BandwidthClass,

    /// Source health. Informational.
    pub health: HealthState,

    /// Relevance to the current consumer context, 0.0-1.0.
    pub affinity_match: f64,
}

impl CacheRecord {
    /// Create a record with neutral defaults for everything but identity,
    /// size and reach.
    pub fn new(hash: impl Into<String>, size_bytes: u64, reach: Reach, now_ms: u64) -> Self {
        Self {
            hash: hash.into(),
            size_bytes,
            created_at: now_ms,
            last_accessed_at: now_ms,
            access_count: 0,
            reach,
            category_primary: DEFAULT_CATEGORY.to_string(),
            category_secondary: DEFAULT_CATEGORY.to_string(),
            replica_holder: None,
            contributor_tier: ContributorTier::Caretaker,
            proficiency: ProficiencyLevel::NotStarted,
            proximity_score: 0,
            bandwidth_class: BandwidthClass::Medium,
            health: HealthState::Healthy,
            affinity_match: 0.0,
        }
    }

    /// Set the category tag pair.
    pub fn with_categories(
        mut self,
        primary: impl Into<String>,
        secondary: impl Into<String>,
    ) -> Self {
        self.category_primary = primary.into();
        self.category_secondary = secondary.into();
        self
    }

    /// Set the replica holder.
    pub fn with_replica_holder(mut self, holder: impl Into<String>) -> Self {
        self.replica_holder = Some(holder.into());
        self
    }

    /// Set the serving-side scoring inputs.
    pub fn with_serving(
        mut self,
        proximity_score: i32,
        bandwidth_class: BandwidthClass,
        contributor_tier: ContributorTier,
    ) -> Self {
        self.proximity_score = proximity_score;
        self.bandwidth_class = bandwidth_class;
        self.contributor_tier = contributor_tier;
        self
    }

    /// Set the consumer proficiency level.
    pub fn with_proficiency(mut self, proficiency: ProficiencyLevel) -> Self {
        self.proficiency = proficiency;
        self
    }

    /// Set the affinity relevance (clamped to 0.0-1.0).
    pub fn with_affinity(mut self, affinity_match: f64) -> Self {
        self.affinity_match = affinity_match.clamp(0.0, 1.0);
        self
    }

    /// Set the source health state.
    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = health;
        self
    }

    /// Record an access, updating timestamp and counter.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_accessed_at = now_ms;
        self.access_count += 1;
    }

    /// The category tag pair used by the category index.
    pub fn category_key(&self) -> (String, String) {
        (self.category_primary.clone(), self.category_secondary.clone())
    }

    /// Age in fractional days at `now_ms`.
    pub fn age_days(&self, now_ms: u64) -> f64 {
        const MS_PER_DAY: f64 = 86_400_000.0;
        now_ms.saturating_sub(self.created_at) as f64 / MS_PER_DAY
    }
}

/// Running counters for one cache instance.
///
/// Maintained incrementally on every operation, never recomputed by
/// scanning, so `stats()` is O(1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub item_count: usize,
    pub total_size_bytes: u64,
    pub eviction_count: u64,
    pub expired_count: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}

impl CacheStats {
    /// Fold another instance's counters into this one (for global stats).
    pub fn merge(&mut self, other: &CacheStats) {
        self.item_count += other.item_count;
        self.total_size_bytes += other.total_size_bytes;
        self.eviction_count += other.eviction_count;
        self.expired_count += other.expired_count;
        self.hit_count += other.hit_count;
        self.miss_count += other.miss_count;
    }
}
