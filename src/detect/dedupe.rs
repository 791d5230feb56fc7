//! Finding deduplication.
//!
//! The dedup key is `type | sourceRef | promise.kind | promise.value`. On
//! merge the highest-severity finding wins; on a severity tie, the highest
//! confidence. Evidence arrays are unioned and sorted. Dedup is idempotent.

use std::collections::BTreeMap;

use crate::types::Finding;

/// Result of a dedup pass.
#[derive(Debug)]
pub struct DedupeResult {
    pub findings: Vec<Finding>,
    /// Number of findings merged away.
    pub deduplicated_count: u32,
}

fn key(finding: &Finding) -> String {
    format!(
        "{}|{}|{}|{}",
        finding.kind.as_str(),
        finding.source_ref.as_deref().unwrap_or("~"),
        finding.promise.kind.as_str(),
        finding.promise.value
    )
}

/// Merge `b` into `a` under the dedup rules.
fn merge(a: &mut Finding, b: Finding) {
    let replace = b.severity.rank() < a.severity.rank()
        || (b.severity.rank() == a.severity.rank() && b.confidence.score > a.confidence.score);

    let mut evidence = std::mem::take(&mut a.evidence);
    evidence.extend(b.evidence.iter().cloned());
    evidence.sort();
    evidence.dedup();

    if replace {
        *a = b;
    }
    a.evidence = evidence;
}

/// Deduplicate findings, preserving first-seen key order.
#[must_use]
pub fn dedupe(findings: Vec<Finding>) -> DedupeResult {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: BTreeMap<String, Finding> = BTreeMap::new();
    let mut merged = 0u32;

    for finding in findings {
        let k = key(&finding);
        match by_key.get_mut(&k) {
            Some(existing) => {
                merge(existing, finding);
                merged += 1;
            }
            None => {
                order.push(k.clone());
                by_key.insert(k, finding);
            }
        }
    }

    DedupeResult {
        findings: order
            .into_iter()
            .map(|k| by_key.remove(&k).expect("key recorded"))
            .collect(),
        deduplicated_count: merged,
    }
}
