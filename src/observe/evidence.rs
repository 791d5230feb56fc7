//! Evidence recording: stable IDs, staged files, and the flat arena.
//!
//! Evidence IDs are seeded from the owning expectation's ID with a
//! per-expectation counter, so two runs assign identical IDs regardless of
//! global discovery order. Files land under `evidence/` in staging with
//! POSIX relative paths; the arena records a SHA-256 per file.

use serde::Serialize;

use crate::canonical::emit_jcs;
use crate::error::VeraxError;
use crate::ids::{evidence_id, sha256_hex};
use crate::staging::StagingArea;
use crate::types::{EvidenceKind, EvidenceRecord};

use super::browser::{ConsoleRecord, DomSnapshot, NetworkRecord};

/// Serialized DOM-diff evidence body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DomDiffBody<'a> {
    before: &'a DomSnapshot,
    after: &'a DomSnapshot,
    node_delta: i64,
    text_delta: i64,
}

/// Records evidence for one expectation attempt.
pub struct EvidenceRecorder<'a> {
    staging: &'a StagingArea,
    expectation_id: String,
    counter: u32,
    records: Vec<EvidenceRecord>,
}

impl<'a> EvidenceRecorder<'a> {
    #[must_use]
    pub fn new(staging: &'a StagingArea, expectation_id: &str) -> Self {
        Self {
            staging,
            expectation_id: expectation_id.to_string(),
            counter: 0,
            records: Vec::new(),
        }
    }

    fn write(&mut self, kind: EvidenceKind, bytes: &[u8]) -> Result<String, VeraxError> {
        self.counter += 1;
        let id = evidence_id(kind.prefix(), &self.expectation_id, self.counter);
        let file_name = format!("{id}.{}", kind.extension());
        let path = self.staging.write_evidence(&file_name, bytes)?;
        self.records.push(EvidenceRecord {
            id: id.clone(),
            kind,
            path,
            sha256: sha256_hex(bytes),
            size: bytes.len() as u64,
        });
        Ok(id)
    }

    /// Record a screenshot; returns its evidence ID and relative path.
    pub fn screenshot(&mut self, bytes: &[u8]) -> Result<(String, String), VeraxError> {
        let id = self.write(EvidenceKind::Ui, bytes)?;
        let path = self
            .records
            .last()
            .map(|r| r.path.clone())
            .unwrap_or_default();
        Ok((id, path))
    }

    /// Record a DOM diff between two snapshots.
    pub fn dom_diff(
        &mut self,
        before: &DomSnapshot,
        after: &DomSnapshot,
    ) -> Result<String, VeraxError> {
        let body = DomDiffBody {
            before,
            after,
            node_delta: i64::from(after.node_count) - i64::from(before.node_count),
            text_delta: i64::from(after.text_length) - i64::from(before.text_length),
        };
        let json = emit_jcs(&body).map_err(|e| {
            VeraxError::invariant("evidence-serialization", e.to_string())
        })?;
        self.write(EvidenceKind::Dom, json.as_bytes())
    }

    /// Record captured network requests, if any.
    pub fn network(&mut self, records: &[NetworkRecord]) -> Result<Option<String>, VeraxError> {
        if records.is_empty() {
            return Ok(None);
        }
        let json = emit_jcs(&records)
            .map_err(|e| VeraxError::invariant("evidence-serialization", e.to_string()))?;
        self.write(EvidenceKind::Net, json.as_bytes()).map(Some)
    }

    /// Record captured console errors, if any.
    pub fn console(&mut self, records: &[ConsoleRecord]) -> Result<Option<String>, VeraxError> {
        if records.is_empty() {
            return Ok(None);
        }
        let json = emit_jcs(&records)
            .map_err(|e| VeraxError::invariant("evidence-serialization", e.to_string()))?;
        self.write(EvidenceKind::Log, json.as_bytes()).map(Some)
    }

    /// Finish: ordered evidence IDs plus arena records.
    #[must_use]
    pub fn finish(self) -> (Vec<String>, Vec<EvidenceRecord>) {
        let ids = self.records.iter().map(|r| r.id.clone()).collect();
        (ids, self.records)
    }
}
