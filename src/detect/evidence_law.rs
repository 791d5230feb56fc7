//! Evidence Law v1 enforcement.
//!
//! A finding may hold CONFIRMED only if all three hold:
//! 1. a context anchor is present (before URL, screenshot, or DOM signature),
//! 2. at least one effect-side evidence item is attached,
//! 3. the provenance is `code` (runtime findings cap at SUSPECTED).
//!
//! Violations never drop the finding; they downgrade CONFIRMED → SUSPECTED
//! and append the reason to `downgrades[]`. The runtime cap additionally
//! applies to OBSERVED status, which would otherwise leak a runtime finding
//! above SUSPECTED. This is the only place a classification is adjusted
//! post-derivation.

use crate::types::{ContextAnchor, Downgrade, Finding, FindingStatus, SourceType};

/// Apply the law to one finding, recording any downgrade.
pub fn enforce(finding: &mut Finding, before: Option<&ContextAnchor>, downgrades: &mut Vec<Downgrade>) {
    let runtime = finding.source_type == SourceType::Runtime;

    if runtime && matches!(finding.status, FindingStatus::Confirmed | FindingStatus::Observed) {
        push_downgrade(
            finding,
            FindingStatus::Suspected,
            "runtime-sourced finding capped at SUSPECTED",
            downgrades,
        );
        return;
    }

    if finding.status != FindingStatus::Confirmed {
        return;
    }

    let has_anchor = before.is_some_and(|anchor| !anchor.is_empty());
    if !has_anchor {
        push_downgrade(
            finding,
            FindingStatus::Suspected,
            "missing context anchor",
            downgrades,
        );
        return;
    }

    if finding.evidence.is_empty() {
        push_downgrade(
            finding,
            FindingStatus::Suspected,
            "no effect evidence attached",
            downgrades,
        );
    }
}

fn push_downgrade(
    finding: &mut Finding,
    to: FindingStatus,
    reason: &str,
    downgrades: &mut Vec<Downgrade>,
) {
    downgrades.push(Downgrade {
        finding_id: finding.id.clone(),
        from: finding.status,
        to,
        reason: reason.to_string(),
    });
    finding.status = to;
}
