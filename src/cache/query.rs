//! Read-only query surface over the registry.
//!
//! Discovery and monitoring collaborators consume this instead of the
//! mutating registry API. [`CacheQuery`] is a filter builder for richer
//! discovery queries; it resolves candidates through the secondary
//! indices whenever a category or holder filter is present.

use crate::cache::record::{CacheRecord, CacheStats, ProficiencyLevel, Reach};
use crate::cache::registry::ScopedCacheRegistry;
use crate::cache::score::priority_score;

/// Filter set for a discovery query. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct CacheQuery {
    reaches: Vec<Reach>,
    category: Option<(String, String)>,
    holders: Vec<String>,
    proficiencies: Vec<ProficiencyLevel>,
    min_score: Option<f64>,
}

impl CacheQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a reach level (repeatable).
    pub fn with_reach(mut self, reach: Reach) -> Self {
        self.reaches.push(reach);
        self
    }

    /// Restrict to one category tag pair.
    pub fn with_category(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.category = Some((primary.into(), secondary.into()));
        self
    }

    /// Restrict to content served by a replica holder (repeatable).
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holders.push(holder.into());
        self
    }

    /// Restrict to a proficiency level (repeatable).
    pub fn with_proficiency(mut self, level: ProficiencyLevel) -> Self {
        self.proficiencies.push(level);
        self
    }

    /// Keep only records scoring at least this much at query time.
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    fn matches(&self, record: &CacheRecord, now_ms: u64) -> bool {
        if !self.reaches.is_empty() && !self.reaches.contains(&record.reach) {
            return false;
        }
        if let Some((primary, secondary)) = &self.category {
            if record.category_primary != *primary || record.category_secondary != *secondary {
                return false;
            }
        }
        if !self.holders.is_empty() {
            match &record.replica_holder {
                Some(holder) if self.holders.contains(holder) => {}
                _ => return false,
            }
        }
        if !self.proficiencies.is_empty() && !self.proficiencies.contains(&record.proficiency) {
            return false;
        }
        if let Some(min) = self.min_score {
            if priority_score(record, now_ms) < min {
                return false;
            }
        }
        true
    }
}

/// Read-only view of a [`ScopedCacheRegistry`].
pub struct QueryFacade<'a> {
    registry: &'a ScopedCacheRegistry,
}

impl<'a> QueryFacade<'a> {
    pub fn new(registry: &'a ScopedCacheRegistry) -> Self {
        Self { registry }
    }

    /// Live hashes carrying this category tag pair.
    pub fn query_by_category(&self, primary: &str, secondary: &str) -> Vec<String> {
        self.registry.query_by_category(primary, secondary)
    }

    /// Live (hash, reach) pairs served by this replica holder.
    pub fn query_by_holder(&self, holder: &str) -> Vec<(String, Reach)> {
        self.registry.query_by_holder(holder)
    }

    /// Counters for one reach level.
    pub fn scope_stats(&self, reach: Reach) -> CacheStats {
        self.registry.scope_stats(reach)
    }

    /// Counters summed across reach levels.
    pub fn global_stats(&self) -> CacheStats {
        self.registry.global_stats()
    }

    /// Run a filtered discovery query, returning matching records sorted
    /// by current priority score, highest first.
    ///
    /// Candidates come from the category index (or replica index) when
    /// those filters are set; only a fully unconstrained query walks the
    /// requested reach levels.
    pub fn execute(&self, query: &CacheQuery, now_ms: u64) -> Vec<CacheRecord> {
        let mut records = self.candidates(query);
        records.retain(|record| query.matches(record, now_ms));
        records.sort_by(|a, b| {
            priority_score(b, now_ms)
                .partial_cmp(&priority_score(a, now_ms))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        records
    }

    fn candidates(&self, query: &CacheQuery) -> Vec<CacheRecord> {
        if let Some((primary, secondary)) = &query.category {
            return self.resolve(self.registry.category_members(primary, secondary));
        }
        if !query.holders.is_empty() {
            let mut members = Vec::new();
            for holder in &query.holders {
                members.extend(self.registry.query_by_holder(holder));
            }
            members.sort();
            members.dedup();
            return self.resolve(members);
        }

        let reaches: Vec<Reach> = if query.reaches.is_empty() {
            Reach::ALL.to_vec()
        } else {
            query.reaches.clone()
        };
        reaches
            .into_iter()
            .flat_map(|reach| self.registry.records_at(reach))
            .collect()
    }

    fn resolve(&self, members: Vec<(String, Reach)>) -> Vec<CacheRecord> {
        members
            .into_iter()
            .filter_map(|(hash, reach)| self.registry.peek(&hash, reach))
            .collect()
    }
}
