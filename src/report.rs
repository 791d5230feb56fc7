//! Output channels: machine JSON and the human six-line finding format.
//!
//! JSON mode emits exactly one JSON object on stdout and nothing else;
//! human mode prints one six-line block per finding (Summary, Expected,
//! Observed, Evidence before, Evidence after, Why this matters) followed by
//! a coverage block listing tested and skipped interactions.

use serde::Serialize;

use crate::canonical::emit_jcs;
use crate::error::VeraxError;
use crate::types::{
    FindingsArtifact, Observation, ObserveArtifact, RunStatusArtifact, SummaryArtifact,
};

/// The single JSON object emitted on stdout in JSON mode.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport<'a> {
    pub run: &'a RunStatusArtifact,
    pub summary: &'a SummaryArtifact,
    pub findings: &'a FindingsArtifact,
}

/// Render the machine JSON channel.
pub fn render_json(
    run: &RunStatusArtifact,
    summary: &SummaryArtifact,
    findings: &FindingsArtifact,
) -> Result<String, VeraxError> {
    emit_jcs(&JsonReport {
        run,
        summary,
        findings,
    })
    .map_err(|e| VeraxError::invariant("json-report", e.to_string()))
}

/// Render the human channel.
#[must_use]
pub fn render_human(
    summary: &SummaryArtifact,
    findings: &FindingsArtifact,
    observe: &ObserveArtifact,
) -> String {
    let mut out = String::new();

    for finding in &findings.findings {
        let observed = observation_line(observe, &finding.expectation_id);
        let (before, after) = evidence_lines(finding);
        out.push_str(&format!(
            "Summary: {} {} [{}] ({})\n",
            finding.status.as_str(),
            finding.kind.as_str(),
            finding.severity.as_str(),
            finding.source_ref.as_deref().unwrap_or("runtime")
        ));
        out.push_str(&format!(
            "Expected: {} -> {}\n",
            finding.promise.kind.as_str(),
            finding.promise.value
        ));
        out.push_str(&format!("Observed: {observed}\n"));
        out.push_str(&format!("Evidence before: {before}\n"));
        out.push_str(&format!("Evidence after: {after}\n"));
        out.push_str(&format!("Why this matters: {}\n\n", finding.risk_summary));
    }

    out.push_str("Coverage\n");
    out.push_str(&format!(
        "  expectations: {}  attempted: {}  observed: {}  coverage: {:.2}\n",
        summary.counts.expectations,
        summary.counts.attempted,
        summary.counts.observed,
        summary.coverage
    ));
    for skip in observe.skipped.iter().chain(findings.skips.iter()) {
        out.push_str(&format!(
            "  skipped: {} ({})\n",
            skip.value,
            serde_json::to_value(skip.reason)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default()
        ));
    }
    if !summary.incomplete_reasons.is_empty() {
        out.push_str("Incomplete\n");
        for reason in &summary.incomplete_reasons {
            out.push_str(&format!("  {reason}\n"));
        }
    }

    out
}

fn observation_line(observe: &ObserveArtifact, expectation_id: &str) -> String {
    let direct: Option<&Observation> = observe
        .observations
        .iter()
        .find(|o| o.expectation_id.as_deref() == Some(expectation_id));
    match direct {
        Some(obs) if obs.observed => "effect observed".to_string(),
        Some(obs) if obs.attempted => match obs.reason {
            Some(reason) => format!(
                "attempted, no effect ({})",
                serde_json::to_value(reason)
                    .ok()
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_default()
            ),
            None => "attempted, no effect".to_string(),
        },
        Some(_) => "not attempted".to_string(),
        None => "never observed".to_string(),
    }
}

fn evidence_lines(finding: &crate::types::Finding) -> (String, String) {
    let mut iter = finding.evidence.iter();
    let before = iter
        .next()
        .map(|e| e.path.clone())
        .unwrap_or_else(|| "none".to_string());
    let after = iter
        .next()
        .map(|e| e.path.clone())
        .unwrap_or_else(|| "none".to_string());
    (before, after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::RunStatus;
    use crate::types::{CONTRACT_VERSION, SummaryCounts};

    fn summary() -> SummaryArtifact {
        SummaryArtifact {
            contract_version: CONTRACT_VERSION,
            status: RunStatus::Success,
            counts: SummaryCounts {
                expectations: 1,
                attempted: 1,
                observed: 1,
                ..SummaryCounts::default()
            },
            coverage: 1.0,
            deduplicated_count: 0,
            incomplete_reasons: Vec::new(),
        }
    }

    fn findings() -> FindingsArtifact {
        FindingsArtifact {
            contract_version: CONTRACT_VERSION,
            findings: Vec::new(),
            skips: Vec::new(),
            downgrades: Vec::new(),
            deduplicated_count: 0,
        }
    }

    fn observe() -> ObserveArtifact {
        ObserveArtifact {
            contract_version: CONTRACT_VERSION,
            base_url: "http://localhost:3000/".to_string(),
            observations: Vec::new(),
            evidence_index: Vec::new(),
            runtime_expectations: Vec::new(),
            skipped: Vec::new(),
            pages_visited: 1,
        }
    }

    #[test]
    fn json_report_is_single_canonical_object() {
        let summary = summary();
        let run = crate::summary::build_run_status("r1", &summary);
        let json = render_json(&run, &summary, &findings()).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
        assert!(!json.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["run"]["runId"], "r1");
        assert_eq!(parsed["summary"]["coverage"], 1.0);
    }

    #[test]
    fn human_report_has_coverage_block() {
        let text = render_human(&summary(), &findings(), &observe());
        assert!(text.contains("Coverage"));
        assert!(text.contains("expectations: 1"));
    }

    #[test]
    fn human_report_six_lines_per_finding() {
        use crate::types::{
            Confidence, ConfidenceBucket, FindingStatus, FindingType, PromiseKind, PromiseSpec,
            Severity, SourceType,
        };
        let mut artifact = findings();
        artifact.findings.push(crate::types::Finding {
            id: "f1".to_string(),
            kind: FindingType::NavigationSilentFailure,
            status: FindingStatus::Confirmed,
            severity: Severity::High,
            confidence: Confidence {
                score: 0.78,
                bucket: ConfidenceBucket::Medium,
            },
            silence_kind: Some(crate::types::SilenceKind::NoNavigation),
            evidence: Vec::new(),
            risk_summary: "users click a link that promises navigation and nothing happens"
                .to_string(),
            expectation_id: "e1".to_string(),
            promise: PromiseSpec {
                kind: PromiseKind::Navigate,
                value: "/about".to_string(),
            },
            source_type: SourceType::Code,
            source_ref: Some("index.html:2:1".to_string()),
        });
        let text = render_human(&summary(), &artifact, &observe());
        assert!(text.contains("Summary: CONFIRMED navigation_silent_failure [HIGH]"));
        assert!(text.contains("Expected: navigate -> /about"));
        assert!(text.contains("Observed: never observed"));
        assert!(text.contains("Evidence before: none"));
        assert!(text.contains("Evidence after: none"));
        assert!(text.contains("Why this matters:"));
    }
}
