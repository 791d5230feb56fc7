//! Summary composition and final-status derivation.

use crate::config::RunConfig;
use crate::exit_codes::RunStatus;
use crate::observe::ObserveOutcome;
use crate::types::{
    CONTRACT_VERSION, FindingStatus, FindingsArtifact, LearnArtifact, ObservationReason,
    RunStatusArtifact, SummaryArtifact, SummaryCounts,
};

/// Build `summary.json` from the three phase outputs.
#[must_use]
pub fn build_summary(
    config: &RunConfig,
    learn: &LearnArtifact,
    observe: &ObserveOutcome,
    findings: &FindingsArtifact,
) -> SummaryArtifact {
    let expectations =
        (learn.expectations.len() + observe.artifact.runtime_expectations.len()) as u32;
    let attempted = observe
        .artifact
        .observations
        .iter()
        .filter(|o| o.attempted)
        .count() as u32;
    let observed = observe
        .artifact
        .observations
        .iter()
        .filter(|o| o.observed)
        .count() as u32;

    let count_status = |status: FindingStatus| {
        findings
            .findings
            .iter()
            .filter(|f| f.status == status)
            .count() as u32
    };

    let coverage = if expectations == 0 {
        1.0
    } else {
        ((f64::from(attempted) / f64::from(expectations)) * 100.0).round() / 100.0
    };

    let mut incomplete_reasons = observe.incomplete_reasons.clone();

    // Every attempt timing out is an incomplete run, not a findings run.
    let observations = &observe.artifact.observations;
    if !observations.is_empty()
        && observations
            .iter()
            .all(|o| o.reason == Some(ObservationReason::ObservationTimeout))
    {
        incomplete_reasons.push("all observations timed out".to_string());
    }
    if coverage < config.min_coverage {
        incomplete_reasons.push(format!(
            "coverage {coverage:.2} below threshold {:.2}",
            config.min_coverage
        ));
    }
    incomplete_reasons.dedup();

    let counts = SummaryCounts {
        expectations,
        attempted,
        observed,
        confirmed: count_status(FindingStatus::Confirmed),
        suspected: count_status(FindingStatus::Suspected),
        informational: count_status(FindingStatus::Informational),
        skipped: (observe.artifact.skipped.len() + findings.skips.len()) as u32,
    };

    let status = derive_status(&counts, &incomplete_reasons);

    SummaryArtifact {
        contract_version: CONTRACT_VERSION,
        status,
        counts,
        coverage,
        deduplicated_count: findings.deduplicated_count,
        incomplete_reasons,
    }
}

/// Map summary counts to the final run status.
///
/// INCOMPLETE beats FINDINGS beats WARNING beats SUCCESS, matching the
/// exit-code precedence table.
#[must_use]
pub fn derive_status(counts: &SummaryCounts, incomplete_reasons: &[String]) -> RunStatus {
    if !incomplete_reasons.is_empty() {
        return RunStatus::Incomplete;
    }
    if counts.confirmed > 0 {
        return RunStatus::Findings;
    }
    if counts.suspected > 0 || counts.informational > 0 {
        return RunStatus::Warning;
    }
    RunStatus::Success
}

/// Build `run.status.json`.
#[must_use]
pub fn build_run_status(run_id: &str, summary: &SummaryArtifact) -> RunStatusArtifact {
    RunStatusArtifact {
        contract_version: CONTRACT_VERSION,
        run_id: run_id.to_string(),
        status: summary.status,
        exit_code: summary.status.exit_code().as_i32(),
        coverage: summary.coverage,
        artifact_versions: crate::artifact::artifact_versions(),
        incomplete_reasons: summary.incomplete_reasons.clone(),
    }
}
