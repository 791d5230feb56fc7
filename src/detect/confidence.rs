//! Deterministic confidence computation.
//!
//! `confidence = seed × multiplier + evidence_boost`, capped at 1.0 and
//! rounded to two decimals. The bucket is threshold-derived except for the
//! unproven classification, which always buckets UNPROVEN.

use super::classify::Classification;
use crate::types::{Confidence, ConfidenceBucket};

const EVIDENCE_BOOST: f64 = 0.1;
const HIGH_THRESHOLD: f64 = 0.85;
const MEDIUM_THRESHOLD: f64 = 0.60;

/// Scores below this threshold prefix the risk summary with an
/// uncertainty note.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

#[must_use]
pub fn compute(seed: f64, classification: Classification, has_evidence: bool) -> Confidence {
    let boost = if has_evidence { EVIDENCE_BOOST } else { 0.0 };
    let raw = (seed * classification.confidence_multiplier() + boost).min(1.0);
    let score = (raw * 100.0).round() / 100.0;

    let bucket = if classification == Classification::Unproven {
        ConfidenceBucket::Unproven
    } else if score >= HIGH_THRESHOLD {
        ConfidenceBucket::High
    } else if score >= MEDIUM_THRESHOLD {
        ConfidenceBucket::Medium
    } else {
        ConfidenceBucket::Low
    };

    Confidence { score, bucket }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_with_evidence_caps_at_one() {
        let c = compute(1.0, Classification::Observed, true);
        assert_eq!(c.score, 1.0);
        assert_eq!(c.bucket, ConfidenceBucket::High);
    }

    #[test]
    fn silent_failure_arithmetic() {
        // 0.9 × 0.75 + 0.1 = 0.775 → 0.78
        let c = compute(0.9, Classification::SilentFailure, true);
        assert_eq!(c.score, 0.78);
        assert_eq!(c.bucket, ConfidenceBucket::Medium);
    }

    #[test]
    fn no_evidence_means_no_boost() {
        // 0.9 × 0.75 = 0.675 → 0.68
        let c = compute(0.9, Classification::SilentFailure, false);
        assert_eq!(c.score, 0.68);
        assert_eq!(c.bucket, ConfidenceBucket::Medium);
    }

    #[test]
    fn coverage_gap_buckets_low() {
        // 0.9 × 0.5 = 0.45
        let c = compute(0.9, Classification::CoverageGap, false);
        assert_eq!(c.score, 0.45);
        assert_eq!(c.bucket, ConfidenceBucket::Low);
    }

    #[test]
    fn unproven_always_buckets_unproven() {
        let c = compute(1.0, Classification::Unproven, true);
        assert_eq!(c.bucket, ConfidenceBucket::Unproven);
        // 1.0 × 0.25 + 0.1 = 0.35
        assert_eq!(c.score, 0.35);
    }

    #[test]
    fn rounding_is_two_decimals() {
        // 0.77 × 0.75 = 0.5775 → 0.58
        let c = compute(0.77, Classification::SilentFailure, false);
        assert_eq!(c.score, 0.58);
    }

    #[test]
    fn bucket_boundaries() {
        let high = compute(0.85, Classification::Observed, false);
        assert_eq!(high.bucket, ConfidenceBucket::High);
        let medium = compute(0.60, Classification::Observed, false);
        assert_eq!(medium.bucket, ConfidenceBucket::Medium);
        let low = compute(0.59, Classification::Observed, false);
        assert_eq!(low.bucket, ConfidenceBucket::Low);
    }
}
