//! Canonical JSON emission and the declared artifact comparators.
//!
//! Every artifact writer goes through [`emit_jcs`], which serializes via JCS
//! (RFC 8785): object keys in sorted order, numbers in locale-independent
//! decimal form. Arrays that represent sets are pre-sorted here with the
//! comparator declared per artifact, so two runs over the same inputs emit
//! byte-identical files.

use std::cmp::Ordering;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::types::{Expectation, Finding, Observation};

/// Emit a value as JCS-canonical JSON (RFC 8785).
///
/// This is the standard way to emit JSON for every run artifact. JCS ensures
/// deterministic output regardless of field ordering in the source struct.
pub fn emit_jcs<T: Serialize>(value: &T) -> Result<String> {
    let json_value =
        serde_json::to_value(value).with_context(|| "Failed to serialize value to JSON")?;
    let json_bytes = serde_json_canonicalizer::to_vec(&json_value)
        .with_context(|| "Failed to canonicalize JSON using JCS")?;
    String::from_utf8(json_bytes).with_context(|| "JCS output contained invalid UTF-8")
}

/// Declared comparator for `learn.expectations`:
/// (file, line, column, kind, value).
#[must_use]
pub fn compare_expectations(a: &Expectation, b: &Expectation) -> Ordering {
    a.source
        .file
        .cmp(&b.source.file)
        .then_with(|| a.source.line.cmp(&b.source.line))
        .then_with(|| a.source.column.cmp(&b.source.column))
        .then_with(|| a.promise.kind.cmp(&b.promise.kind))
        .then_with(|| a.promise.value.cmp(&b.promise.value))
}

/// Declared comparator for `observe.observations`:
/// (expectationId, attempted, observed, evidence-count).
#[must_use]
pub fn compare_observations(a: &Observation, b: &Observation) -> Ordering {
    // None sorts after every concrete id so runtime-only rows trail.
    let a_id = a.expectation_id.as_deref().unwrap_or("~");
    let b_id = b.expectation_id.as_deref().unwrap_or("~");
    a_id.cmp(b_id)
        .then_with(|| a.attempted.cmp(&b.attempted))
        .then_with(|| a.observed.cmp(&b.observed))
        .then_with(|| a.evidence.len().cmp(&b.evidence.len()))
}

/// Declared comparator for `findings`:
/// (sourceRef ?? '~', type, status, severity-rank, expectationId).
#[must_use]
pub fn compare_findings(a: &Finding, b: &Finding) -> Ordering {
    let a_ref = a.source_ref.as_deref().unwrap_or("~");
    let b_ref = b.source_ref.as_deref().unwrap_or("~");
    a_ref
        .cmp(b_ref)
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.status.cmp(&b.status))
        .then_with(|| a.severity.rank().cmp(&b.severity.rank()))
        .then_with(|| a.expectation_id.cmp(&b.expectation_id))
}

/// Sort an expectation list in place by its declared comparator.
pub fn sort_expectations(expectations: &mut [Expectation]) {
    expectations.sort_by(compare_expectations);
}

pub fn sort_observations(observations: &mut [Observation]) {
    observations.sort_by(compare_observations);
}

pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(compare_findings);
}
