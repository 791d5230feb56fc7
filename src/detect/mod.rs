//! Detect phase: correlate expectations with observations and emit
//! classified, deduplicated findings.
//!
//! The pipeline is strictly ordered and deterministic:
//!
//! ```text
//! correlate → classify → compute-confidence → apply-evidence-law
//!           → dynamic-route-lock → dedupe → sort → enforce-provenance
//! ```

pub mod classify;
pub mod confidence;
pub mod dedupe;
pub mod evidence_law;
pub mod provenance;
pub mod risk;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::canonical::sort_findings;
use crate::ids;
use crate::types::{
    CONTRACT_VERSION, Downgrade, EvidenceManifestEntry, EvidenceRecord, Expectation,
    ExpectationKind, Finding, FindingType, FindingsArtifact, LearnArtifact, Observation,
    ObservationReason, ObserveArtifact, PromiseKind, Severity, SkipEntry, is_dynamic_route,
};

use classify::{Classification, classify, derive_silence_kind, finding_type};

/// Run the detect phase over the two input artifacts.
pub fn run_detect(
    learn: &LearnArtifact,
    observe: &ObserveArtifact,
    phantom_ids: &BTreeSet<String>,
) -> Result<FindingsArtifact, crate::error::VeraxError> {
    let mut expectations: Vec<&Expectation> = learn
        .expectations
        .iter()
        .chain(observe.runtime_expectations.iter())
        .filter(|e| !phantom_ids.contains(&e.id))
        .collect();
    // Inputs are canonically sorted already; keep the combined list stable.
    expectations.sort_by(|a, b| crate::canonical::compare_expectations(a, b));

    // Correlation index: direct observations by expectation ID, plus the set
    // of promise kinds with at least one attempted observation.
    let by_id: BTreeMap<&str, &Observation> = observe
        .observations
        .iter()
        .filter_map(|o| o.expectation_id.as_deref().map(|id| (id, o)))
        .collect();
    let expectation_kind_by_id: BTreeMap<&str, PromiseKind> = expectations
        .iter()
        .map(|e| (e.id.as_str(), e.promise.kind))
        .collect();
    let attempted_kinds: BTreeSet<PromiseKind> = observe
        .observations
        .iter()
        .filter(|o| o.attempted)
        .filter_map(|o| o.expectation_id.as_deref())
        .filter_map(|id| expectation_kind_by_id.get(id).copied())
        .collect();

    let arena: BTreeMap<&str, &EvidenceRecord> = observe
        .evidence_index
        .iter()
        .map(|r| (r.id.as_str(), r))
        .collect();

    let mut findings = Vec::new();
    let mut skips: Vec<SkipEntry> = Vec::new();
    let mut downgrades: Vec<Downgrade> = Vec::new();

    for expectation in &expectations {
        // Dynamic-route lock, first gate: these never become findings.
        if is_dynamic_route(&expectation.promise.value) {
            skips.push(SkipEntry {
                reason: ObservationReason::OutOfScopeDynamicRoute,
                value: expectation.promise.value.clone(),
                expectation_id: Some(expectation.id.clone()),
            });
            continue;
        }

        let direct = by_id.get(expectation.id.as_str()).copied();
        let same_kind = attempted_kinds.contains(&expectation.promise.kind);
        let classification = classify(direct, same_kind);

        let silence_kind = match classification {
            Classification::SilentFailure => {
                let signals = direct.map(|o| o.signals).unwrap_or_default();
                Some(derive_silence_kind(expectation.promise.kind, &signals))
            }
            Classification::SilentFailureByKind => {
                Some(crate::types::SilenceKind::UnknownSilence)
            }
            _ => None,
        };

        let kind = finding_type(classification, expectation, silence_kind);
        let evidence = direct
            .map(|o| evidence_manifest(o, &arena))
            .unwrap_or_default();
        let confidence =
            confidence::compute(expectation.confidence, classification, !evidence.is_empty());
        let severity = severity_for(kind, expectation);
        let risk_summary = risk::risk_summary(kind, silence_kind, severity, confidence.score);

        let mut finding = Finding {
            id: ids::finding_id(kind.as_str(), &expectation.id, &expectation.promise),
            kind,
            status: classification.status(),
            severity,
            confidence,
            silence_kind,
            evidence,
            risk_summary,
            expectation_id: expectation.id.clone(),
            promise: expectation.promise.clone(),
            source_type: expectation.source_type,
            source_ref: expectation.source_ref.clone(),
        };

        evidence_law::enforce(&mut finding, direct.map(|o| &o.before), &mut downgrades);
        findings.push(finding);
    }

    let deduped = dedupe::dedupe(findings);
    let mut findings = deduped.findings;
    sort_findings(&mut findings);

    provenance::validate(&findings)?;

    debug!(
        findings = findings.len(),
        skips = skips.len(),
        downgrades = downgrades.len(),
        merged = deduped.deduplicated_count,
        "detect complete"
    );

    Ok(FindingsArtifact {
        contract_version: CONTRACT_VERSION,
        findings,
        skips,
        downgrades,
        deduplicated_count: deduped.deduplicated_count,
    })
}

/// Severity mapping: silent failures on navigation or network promises are
/// critical; state mutations are medium; coverage gaps and observed
/// promises are low; everything else is medium.
fn severity_for(kind: FindingType, expectation: &Expectation) -> Severity {
    if kind.is_silent_failure()
        && matches!(
            expectation.kind,
            ExpectationKind::Navigation | ExpectationKind::Network
        )
    {
        return Severity::High;
    }
    // State mutations and validation promises pin MEDIUM, as does
    // everything else without a sharper rule.
    match kind {
        FindingType::CoverageGap | FindingType::Observed => Severity::Low,
        _ => Severity::Medium,
    }
}

fn evidence_manifest(
    observation: &Observation,
    arena: &BTreeMap<&str, &EvidenceRecord>,
) -> Vec<EvidenceManifestEntry> {
    observation
        .evidence
        .iter()
        .filter_map(|id| arena.get(id.as_str()))
        .map(|record| EvidenceManifestEntry {
            id: record.id.clone(),
            kind: record.kind,
            path: record.path.clone(),
            sha256: record.sha256.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learn::extract::build_expectation;
    use crate::types::{
        ContextAnchor, EvidenceKind, FindingStatus, Framework, Router, Signals, SilenceKind,
        SkipCounters, SupportLevel,
    };

    fn learn_with(expectations: Vec<Expectation>) -> LearnArtifact {
        LearnArtifact {
            contract_version: CONTRACT_VERSION,
            framework: Framework::Static,
            router: Router::None,
            support_level: SupportLevel::ProductionReady,
            expectations,
            skipped: SkipCounters::default(),
        }
    }

    fn observe_with(
        observations: Vec<Observation>,
        evidence_index: Vec<EvidenceRecord>,
        runtime: Vec<Expectation>,
    ) -> ObserveArtifact {
        ObserveArtifact {
            contract_version: CONTRACT_VERSION,
            base_url: "http://localhost:3000/".to_string(),
            observations,
            evidence_index,
            runtime_expectations: runtime,
            skipped: Vec::new(),
            pages_visited: 1,
        }
    }

    fn nav_expectation(value: &str) -> Expectation {
        build_expectation(
            ExpectationKind::Navigation,
            PromiseKind::Navigate,
            value,
            "index.html",
            1,
            1,
            "html-anchor",
            0.9,
        )
    }

    fn anchored_observation(id: &str, attempted: bool, observed: bool) -> Observation {
        Observation {
            expectation_id: Some(id.to_string()),
            attempted,
            observed,
            signals: if observed {
                Signals {
                    navigation_changed: true,
                    route_changed: true,
                    ..Signals::default()
                }
            } else {
                Signals::default()
            },
            evidence: vec!["UI#aa-01".to_string()],
            before: ContextAnchor {
                url: Some("http://localhost:3000/".to_string()),
                screenshot: Some("evidence/UI#aa-01.png".to_string()),
                dom_signature: Some("sig:/".to_string()),
            },
            after: ContextAnchor::default(),
            reason: None,
            silence_detected: None,
        }
    }

    fn arena_record() -> EvidenceRecord {
        EvidenceRecord {
            id: "UI#aa-01".to_string(),
            kind: EvidenceKind::Ui,
            path: "evidence/UI#aa-01.png".to_string(),
            sha256: "cd".repeat(32),
            size: 9,
        }
    }

    #[test]
    fn observed_expectation_yields_observed_finding() {
        let e = nav_expectation("/about");
        let learn = learn_with(vec![e.clone()]);
        let observe = observe_with(
            vec![anchored_observation(&e.id, true, true)],
            vec![arena_record()],
            vec![],
        );
        let artifact = run_detect(&learn, &observe, &BTreeSet::new()).unwrap();
        assert_eq!(artifact.findings.len(), 1);
        let finding = &artifact.findings[0];
        assert_eq!(finding.kind, FindingType::Observed);
        assert_eq!(finding.status, FindingStatus::Observed);
        assert_eq!(finding.evidence.len(), 1);
        assert!(artifact.downgrades.is_empty());
    }

    #[test]
    fn attempted_unobserved_navigation_is_confirmed_silent_failure() {
        let e = nav_expectation("/broken");
        let learn = learn_with(vec![e.clone()]);
        let observe = observe_with(
            vec![anchored_observation(&e.id, true, false)],
            vec![arena_record()],
            vec![],
        );
        let artifact = run_detect(&learn, &observe, &BTreeSet::new()).unwrap();
        let finding = &artifact.findings[0];
        assert_eq!(finding.kind, FindingType::NavigationSilentFailure);
        assert_eq!(finding.status, FindingStatus::Confirmed);
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.silence_kind, Some(SilenceKind::NoNavigation));
    }

    #[test]
    fn unattempted_observation_is_unproven() {
        let e = nav_expectation("/x");
        let learn = learn_with(vec![e.clone()]);
        let mut obs = anchored_observation(&e.id, false, false);
        obs.evidence.clear();
        let observe = observe_with(vec![obs], vec![], vec![]);
        let artifact = run_detect(&learn, &observe, &BTreeSet::new()).unwrap();
        let finding = &artifact.findings[0];
        assert_eq!(finding.kind, FindingType::Unproven);
        assert_eq!(finding.status, FindingStatus::Suspected);
        assert_eq!(finding.confidence.bucket, crate::types::ConfidenceBucket::Unproven);
    }

    #[test]
    fn same_kind_fallback_is_broken_navigation_promise() {
        let attempted = nav_expectation("/about");
        let missing = nav_expectation("/ghost");
        let learn = learn_with(vec![attempted.clone(), missing.clone()]);
        let observe = observe_with(
            vec![anchored_observation(&attempted.id, true, true)],
            vec![arena_record()],
            vec![],
        );
        let artifact = run_detect(&learn, &observe, &BTreeSet::new()).unwrap();
        let ghost = artifact
            .findings
            .iter()
            .find(|f| f.expectation_id == missing.id)
            .unwrap();
        assert_eq!(ghost.kind, FindingType::BrokenNavigationPromise);
        // No direct observation means no anchor: evidence law downgrades.
        assert_eq!(ghost.status, FindingStatus::Suspected);
        assert!(artifact.downgrades.iter().any(|d| d.finding_id == ghost.id));
    }

    #[test]
    fn never_attempted_kind_is_coverage_gap() {
        let e = build_expectation(
            ExpectationKind::Form,
            PromiseKind::Submit,
            "/api/subscribe",
            "index.html",
            3,
            1,
            "html-form-action",
            0.85,
        );
        let learn = learn_with(vec![e.clone()]);
        let observe = observe_with(vec![], vec![], vec![]);
        let artifact = run_detect(&learn, &observe, &BTreeSet::new()).unwrap();
        let finding = &artifact.findings[0];
        assert_eq!(finding.kind, FindingType::CoverageGap);
        assert_eq!(finding.status, FindingStatus::Informational);
        assert_eq!(finding.severity, Severity::Low);
    }

    #[test]
    fn dynamic_route_lock_strips_findings() {
        let e = nav_expectation("/user/[id]");
        let learn = learn_with(vec![e.clone()]);
        let observe = observe_with(vec![], vec![], vec![]);
        let artifact = run_detect(&learn, &observe, &BTreeSet::new()).unwrap();
        assert!(artifact.findings.is_empty());
        assert_eq!(artifact.skips.len(), 1);
        assert_eq!(
            artifact.skips[0].reason,
            ObservationReason::OutOfScopeDynamicRoute
        );
        assert_eq!(artifact.skips[0].expectation_id.as_deref(), Some(e.id.as_str()));
    }

    #[test]
    fn runtime_findings_are_capped_at_suspected() {
        let mut runtime = nav_expectation("/pricing");
        runtime.source_type = crate::types::SourceType::Runtime;
        runtime.source_ref = None;
        let learn = learn_with(vec![nav_expectation("/about")]);
        let observe = observe_with(
            vec![anchored_observation(&runtime.id, true, true)],
            vec![arena_record()],
            vec![runtime.clone()],
        );
        let artifact = run_detect(&learn, &observe, &BTreeSet::new()).unwrap();
        let finding = artifact
            .findings
            .iter()
            .find(|f| f.expectation_id == runtime.id)
            .unwrap();
        assert_eq!(finding.status, FindingStatus::Suspected);
        assert_eq!(finding.source_ref, None);
    }

    #[test]
    fn phantom_expectations_are_excluded() {
        let e = nav_expectation("/about");
        let learn = learn_with(vec![e.clone()]);
        let observe = observe_with(vec![], vec![], vec![]);
        let mut phantom = BTreeSet::new();
        phantom.insert(e.id.clone());
        let artifact = run_detect(&learn, &observe, &phantom).unwrap();
        assert!(artifact.findings.is_empty());
        assert!(artifact.skips.is_empty());
    }

    #[test]
    fn broken_submit_with_network_is_no_feedback() {
        let e = build_expectation(
            ExpectationKind::Form,
            PromiseKind::Submit,
            "/api/subscribe",
            "index.html",
            4,
            1,
            "html-form-action",
            0.85,
        );
        let learn = learn_with(vec![e.clone()]);
        let mut obs = anchored_observation(&e.id, true, false);
        obs.signals = Signals {
            submission_triggered: true,
            network_attempt_after_submit: true,
            ..Signals::default()
        };
        let observe = observe_with(vec![obs], vec![arena_record()], vec![]);
        let artifact = run_detect(&learn, &observe, &BTreeSet::new()).unwrap();
        let finding = &artifact.findings[0];
        assert_eq!(finding.kind, FindingType::SubmitSilentFailure);
        assert_eq!(finding.silence_kind, Some(SilenceKind::NoFeedback));
        assert_eq!(finding.status, FindingStatus::Confirmed);
    }

    #[test]
    fn findings_are_canonically_sorted() {
        let a = nav_expectation("/a");
        let b = nav_expectation("/b");
        let learn = learn_with(vec![b.clone(), a.clone()]);
        let observe = observe_with(vec![], vec![], vec![]);
        let artifact = run_detect(&learn, &observe, &BTreeSet::new()).unwrap();
        assert_eq!(artifact.findings.len(), 2);
        let ids: Vec<_> = artifact
            .findings
            .iter()
            .map(|f| f.expectation_id.clone())
            .collect();
        let mut sorted = artifact.findings.clone();
        crate::canonical::sort_findings(&mut sorted);
        let sorted_ids: Vec<_> = sorted.iter().map(|f| f.expectation_id.clone()).collect();
        assert_eq!(ids, sorted_ids);
    }
}
