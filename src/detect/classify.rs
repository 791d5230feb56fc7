//! Deterministic classification of correlated expectation/observation pairs.

use crate::types::{
    Expectation, ExpectationKind, FindingStatus, FindingType, Observation, PromiseKind,
    SilenceKind, Signals,
};

/// The five-row classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Observed,
    SilentFailure,
    Unproven,
    /// Silent failure concluded from same-kind attempts (no direct
    /// observation of this promise).
    SilentFailureByKind,
    CoverageGap,
}

impl Classification {
    /// Fixed confidence multiplier per classification.
    #[must_use]
    pub const fn confidence_multiplier(self) -> f64 {
        match self {
            Self::Observed => 1.0,
            Self::SilentFailure | Self::SilentFailureByKind => 0.75,
            Self::CoverageGap => 0.5,
            Self::Unproven => 0.25,
        }
    }

    /// Pre-evidence-law status.
    #[must_use]
    pub const fn status(self) -> FindingStatus {
        match self {
            Self::Observed => FindingStatus::Observed,
            Self::SilentFailure | Self::SilentFailureByKind => FindingStatus::Confirmed,
            Self::Unproven => FindingStatus::Suspected,
            Self::CoverageGap => FindingStatus::Informational,
        }
    }
}

/// Apply the classification table to one correlated pair.
///
/// An observation that timed out proves nothing either way, so it lands in
/// `Unproven` rather than `SilentFailure` even when the attempt started.
#[must_use]
pub fn classify(direct: Option<&Observation>, same_kind_attempted: bool) -> Classification {
    use crate::types::ObservationReason;
    match direct {
        Some(obs) if obs.reason == Some(ObservationReason::ObservationTimeout) => {
            Classification::Unproven
        }
        Some(obs) if obs.observed => Classification::Observed,
        Some(obs) if obs.attempted => Classification::SilentFailure,
        Some(_) => Classification::Unproven,
        None if same_kind_attempted => Classification::SilentFailureByKind,
        None => Classification::CoverageGap,
    }
}

/// Derive the silence sub-classification for a silent failure.
///
/// Rule order is fixed: submission silence, navigation silence, stalled
/// loading, UI silence, unknown.
#[must_use]
pub fn derive_silence_kind(promise_kind: PromiseKind, signals: &Signals) -> SilenceKind {
    if promise_kind == PromiseKind::Submit && signals.submission_triggered && !signals.any_effect()
    {
        return if signals.network_attempt_after_submit {
            SilenceKind::NoFeedback
        } else {
            SilenceKind::BlockedWithoutMessage
        };
    }
    if promise_kind == PromiseKind::Navigate
        && !signals.navigation_changed
        && !signals.route_changed
    {
        return SilenceKind::NoNavigation;
    }
    if signals.loading_indicator_after {
        return SilenceKind::StalledLoading;
    }
    if !signals.meaningful_ui_change {
        return SilenceKind::NoUiChange;
    }
    SilenceKind::UnknownSilence
}

/// Map a classification to its finding type.
///
/// Promise-kind subtypes win over silence-kind subtypes; the same-kind
/// fallback path for navigation promises gets its own type.
#[must_use]
pub fn finding_type(
    classification: Classification,
    expectation: &Expectation,
    silence_kind: Option<SilenceKind>,
) -> FindingType {
    match classification {
        Classification::Observed => FindingType::Observed,
        Classification::Unproven => FindingType::Unproven,
        Classification::CoverageGap => FindingType::CoverageGap,
        Classification::SilentFailureByKind => match expectation.promise.kind {
            PromiseKind::Navigate => FindingType::BrokenNavigationPromise,
            PromiseKind::Submit => FindingType::SubmitSilentFailure,
            PromiseKind::NetworkAction => FindingType::NetworkSilentFailure,
            _ => FindingType::SilentFailure,
        },
        Classification::SilentFailure => match expectation.promise.kind {
            PromiseKind::Navigate => FindingType::NavigationSilentFailure,
            PromiseKind::Submit => FindingType::SubmitSilentFailure,
            PromiseKind::NetworkAction => FindingType::NetworkSilentFailure,
            PromiseKind::StateChange if silence_kind == Some(SilenceKind::NoUiChange) => {
                FindingType::NoEffectSilentFailure
            }
            _ if silence_kind == Some(SilenceKind::NoFeedback)
                && expectation.kind != ExpectationKind::Form =>
            {
                FindingType::MissingFeedbackSilentFailure
            }
            _ => FindingType::SilentFailure,
        },
    }
}
