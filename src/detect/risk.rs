//! Deterministic risk-summary text.
//!
//! Messages come from a fixed table indexed by (silenceKind, severity) with
//! per-type fallbacks; user strings are never interpolated. Scores under the
//! low-confidence threshold get a fixed uncertainty prefix.

use super::confidence::LOW_CONFIDENCE_THRESHOLD;
use crate::types::{FindingType, Severity, SilenceKind};

const LOW_CONFIDENCE_PREFIX: &str = "Risk uncertain due to incomplete evidence; ";

/// Compose the risk summary for one finding.
#[must_use]
pub fn risk_summary(
    finding_type: FindingType,
    silence_kind: Option<SilenceKind>,
    severity: Severity,
    confidence_score: f64,
) -> String {
    let body = match (silence_kind, severity) {
        (Some(SilenceKind::NoNavigation), Severity::High) => {
            "users click a link that promises navigation and nothing happens"
        }
        (Some(SilenceKind::NoNavigation), _) => {
            "a navigation promise produced no page or route change"
        }
        (Some(SilenceKind::NoFeedback), Severity::High) => {
            "a submission reached the network but users receive no confirmation or error"
        }
        (Some(SilenceKind::NoFeedback), _) => {
            "an action completed without any user-visible acknowledgment"
        }
        (Some(SilenceKind::BlockedWithoutMessage), _) => {
            "a submission was blocked before any request, with no message shown"
        }
        (Some(SilenceKind::StalledLoading), _) => {
            "the interface entered a loading state and never settled"
        }
        (Some(SilenceKind::NoUiChange), _) => {
            "an interaction ran to completion without changing anything users can see"
        }
        (Some(SilenceKind::UnknownSilence), _) => {
            "an interaction produced no observable effect for an undetermined reason"
        }
        (None, _) => match finding_type {
            FindingType::CoverageGap => {
                "this promise was never exercised; no interaction of its kind was attempted"
            }
            FindingType::Unproven => {
                "the interaction could not be attempted, so the promise remains unverified"
            }
            FindingType::Observed => "the promise was observed behaving as committed",
            _ => "a promised effect could not be observed",
        },
    };

    if confidence_score < LOW_CONFIDENCE_THRESHOLD && finding_type != FindingType::Observed {
        format!("{LOW_CONFIDENCE_PREFIX}{body}")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_deterministic() {
        let a = risk_summary(
            FindingType::NavigationSilentFailure,
            Some(SilenceKind::NoNavigation),
            Severity::High,
            0.9,
        );
        let b = risk_summary(
            FindingType::NavigationSilentFailure,
            Some(SilenceKind::NoNavigation),
            Severity::High,
            0.9,
        );
        assert_eq!(a, b);
        assert!(a.contains("nothing happens"));
    }

    #[test]
    fn low_confidence_prefix_applied() {
        let text = risk_summary(
            FindingType::SilentFailure,
            Some(SilenceKind::NoUiChange),
            Severity::Medium,
            0.55,
        );
        assert!(text.starts_with("Risk uncertain due to incomplete evidence; "));
    }

    #[test]
    fn high_confidence_has_no_prefix() {
        let text = risk_summary(
            FindingType::SubmitSilentFailure,
            Some(SilenceKind::NoFeedback),
            Severity::High,
            0.9,
        );
        assert!(!text.starts_with("Risk uncertain"));
        assert!(text.contains("no confirmation"));
    }

    #[test]
    fn observed_findings_never_get_the_prefix() {
        let text = risk_summary(FindingType::Observed, None, Severity::Low, 0.5);
        assert!(!text.starts_with("Risk uncertain"));
        assert!(text.contains("behaving as committed"));
    }

    #[test]
    fn coverage_gap_and_unproven_texts() {
        let gap = risk_summary(FindingType::CoverageGap, None, Severity::Low, 0.45);
        assert!(gap.contains("never exercised"));
        let unproven = risk_summary(FindingType::Unproven, None, Severity::Medium, 0.35);
        assert!(unproven.contains("remains unverified"));
    }

    #[test]
    fn severity_selects_sharper_text() {
        let high = risk_summary(
            FindingType::SubmitSilentFailure,
            Some(SilenceKind::NoFeedback),
            Severity::High,
            0.9,
        );
        let medium = risk_summary(
            FindingType::SubmitSilentFailure,
            Some(SilenceKind::NoFeedback),
            Severity::Medium,
            0.9,
        );
        assert_ne!(high, medium);
    }
}
