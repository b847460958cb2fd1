//! Priority scoring: decides retention order for eviction.
//!
//! ```text
//! score(record, now) =
//!     clamp( reach_ordinal × SCOPE_WEIGHT
//!          + proximity_score
//!          + bandwidth_bonus
//!          + contributor_tier_bonus
//!          + affinity_match × AFFINITY_WEIGHT
//!          - freshness_penalty(now),
//!          SCORE_MIN, SCORE_MAX )
//! ```
//!
//! The freshness penalty grows with age at the record's proficiency decay
//! rate and saturates at [`BASE_PENALTY_WEIGHT`]. Scoring is deterministic
//! and side-effect free; eviction always re-evaluates it with the caller's
//! current clock rather than a value cached at insert time.

use crate::cache::record::CacheRecord;

/// Points per reach ordinal (commons content scores 84 above private).
pub const SCOPE_WEIGHT: f64 = 12.0;

/// Points for a perfect affinity match.
pub const AFFINITY_WEIGHT: f64 = 10.0;

/// Maximum points the freshness penalty can subtract.
pub const BASE_PENALTY_WEIGHT: f64 = 50.0;

/// Lower clamp bound for the final score.
pub const SCORE_MIN: f64 = 0.0;

/// Upper clamp bound for the final score.
pub const SCORE_MAX: f64 = 200.0;

/// Retention score of `record` at `now_ms`. Lower scores are evicted first.
pub fn priority_score(record: &CacheRecord, now_ms: u64) -> f64 {
    let decay_rate = record.proficiency.decay_rate_per_day();
    let freshness_penalty =
        (decay_rate * record.age_days(now_ms)).min(1.0) * BASE_PENALTY_WEIGHT;
    clamp_score(static_score(record) - freshness_penalty)
}

/// Lower bound of `priority_score` over all time: the score with the
/// freshness penalty fully saturated.
///
/// This floor depends only on immutable scoring fields, so the eviction
/// index keyed by it never goes stale as records age. Victim selection
/// walks the index in floor order and re-scores candidates with the
/// current clock; it can stop as soon as the next floor exceeds the best
/// candidate's current score, because `floor(r) <= priority_score(r, now)`
/// for every record.
pub(crate) fn score_floor(record: &CacheRecord) -> f64 {
    let max_penalty = if record.proficiency.decay_rate_per_day() > 0.0 {
        BASE_PENALTY_WEIGHT
    } else {
        0.0
    };
    clamp_score(static_score(record) - max_penalty)
}

/// Scores quantized to integer millipoints for use as ordered index keys.
pub(crate) fn score_millis(record: &CacheRecord, now_ms: u64) -> i64 {
    to_millis(priority_score(record, now_ms))
}

pub(crate) fn floor_millis(record: &CacheRecord) -> i64 {
    to_millis(score_floor(record))
}

/// The age-independent portion of the score.
fn static_score(record: &CacheRecord) -> f64 {
    f64::from(record.reach.ordinal()) * SCOPE_WEIGHT
        + f64::from(record.proximity_score)
        + record.bandwidth_class.score_bonus()
        + record.contributor_tier.score_bonus()
        + record.affinity_match * AFFINITY_WEIGHT
}

fn clamp_score(raw: f64) -> f64 {
    raw.clamp(SCORE_MIN, SCORE_MAX)
}

fn to_millis(score: f64) -> i64 {
    (score * 1000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::record::{
        BandwidthClass, CacheRecord, ContributorTier, ProficiencyLevel, Reach,
    };

    const DAY_MS: u64 = 86_400_000;

    fn commons_record() -> CacheRecord {
        // reach 7 × 12 = 84, medium bandwidth +5, caretaker +5, affinity 0.5 → +5
        CacheRecord::new("hash", 100, Reach::Commons, 0).with_affinity(0.5)
    }

    #[test]
    fn test_priority_components_sum() {
        let record = commons_record();
        assert_eq!(priority_score(&record, 0), 99.0);
    }

    #[test]
    fn test_priority_clamped_to_range() {
        let low = CacheRecord::new("low", 1, Reach::Private, 0).with_serving(
            -100,
            BandwidthClass::Low,
            ContributorTier::Caretaker,
        );
        assert_eq!(priority_score(&low, 0), SCORE_MIN);

        let high = CacheRecord::new("high", 1, Reach::Commons, 0)
            .with_serving(100, BandwidthClass::Ultra, ContributorTier::Pioneer)
            .with_affinity(1.0);
        // 84 + 100 + 20 + 50 + 10 = 264 → clamped
        assert_eq!(priority_score(&high, 0), SCORE_MAX);
    }

    #[test]
    fn test_freshness_penalty_grows_and_saturates() {
        let record = commons_record().with_proficiency(ProficiencyLevel::Seen);

        let at_insert = priority_score(&record, 0);
        let after_10_days = priority_score(&record, 10 * DAY_MS);
        // 0.05/day × 10 days = 0.5 → 25 points off.
        assert_eq!(at_insert - after_10_days, 25.0);

        // Past 20 days the penalty saturates at BASE_PENALTY_WEIGHT.
        let after_30_days = priority_score(&record, 30 * DAY_MS);
        let after_90_days = priority_score(&record, 90 * DAY_MS);
        assert_eq!(after_30_days, at_insert - BASE_PENALTY_WEIGHT);
        assert_eq!(after_30_days, after_90_days);
    }

    #[test]
    fn test_not_started_never_decays() {
        let record = commons_record();
        assert_eq!(
            priority_score(&record, 0),
            priority_score(&record, 365 * DAY_MS)
        );
    }

    #[test]
    fn test_floor_bounds_score_at_all_ages() {
        let records = [
            commons_record(),
            commons_record().with_proficiency(ProficiencyLevel::Seen),
            CacheRecord::new("p", 1, Reach::Private, 0)
                .with_serving(-40, BandwidthClass::Low, ContributorTier::Caretaker)
                .with_proficiency(ProficiencyLevel::Create),
        ];
        for record in &records {
            for age in [0, DAY_MS, 30 * DAY_MS, 400 * DAY_MS] {
                assert!(score_floor(record) <= priority_score(record, age) + 1e-9);
            }
        }
    }
}
