//! Stable identifier derivation.
//!
//! Every persisted ID is a prefix of a SHA-256 over stable inputs only
//! (source location, kind, value, phase-local counters). No ID ever embeds a
//! wall-clock timestamp; run IDs in deterministic mode derive from the
//! configured test time instead of the real clock.

use sha2::{Digest, Sha256};

use crate::types::{PromiseSpec, SourceLocation};

/// Length of the hex prefix used for entity IDs.
const ID_PREFIX_LEN: usize = 16;

/// Length of the hex prefix appended to run IDs.
const RUN_HASH_LEN: usize = 6;

/// Full SHA-256 hex digest of raw bytes.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Stable hash over a tuple of string parts. Parts are length-prefixed so
/// ("ab", "c") and ("a", "bc") cannot collide.
#[must_use]
pub fn stable_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.len().to_le_bytes());
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Entity ID: the 16-char prefix of [`stable_hash`].
#[must_use]
pub fn stable_id(parts: &[&str]) -> String {
    stable_hash(parts)[..ID_PREFIX_LEN].to_string()
}

/// Expectation ID over (type, file, line, column, promise.kind,
/// promise.value).
#[must_use]
pub fn expectation_id(kind: &str, source: &SourceLocation, promise: &PromiseSpec) -> String {
    stable_id(&[
        kind,
        &source.file,
        &source.line.to_string(),
        &source.column.to_string(),
        promise.kind.as_str(),
        &promise.value,
    ])
}

/// Finding ID over (finding type, expectation id, promise kind, value).
#[must_use]
pub fn finding_id(finding_type: &str, expectation_id: &str, promise: &PromiseSpec) -> String {
    stable_id(&[
        finding_type,
        expectation_id,
        promise.kind.as_str(),
        &promise.value,
    ])
}

/// Short content-hash suffix for run IDs.
#[must_use]
pub fn short_hash(input: &str) -> String {
    sha256_hex(input.as_bytes())[..RUN_HASH_LEN].to_string()
}

/// Derive a run ID from an ISO timestamp and a content seed.
///
/// Colons are replaced so the ID is a valid directory name on every host.
/// In deterministic mode the ISO input is the configured `VERAX_TEST_TIME`,
/// so the same fixture and configuration always land in the same directory.
#[must_use]
pub fn run_id(iso_time: &str, content_seed: &str) -> String {
    let stamp = iso_time.replace(':', "-");
    format!("{stamp}-{}", short_hash(content_seed))
}

/// Evidence ID: `<PREFIX>#<hash8 of expectation id>-<counter>`.
///
/// The hash seed keys the counter space to the expectation, so two runs
/// assign identical IDs regardless of global discovery order.
#[must_use]
pub fn evidence_id(prefix: &str, expectation_id: &str, counter: u32) -> String {
    let seed = &sha256_hex(expectation_id.as_bytes())[..8];
    format!("{prefix}#{seed}-{counter:02}")
}
