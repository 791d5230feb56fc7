//! Staging-directory protocol: atomic artifact sets with poison semantics.
//!
//! Lifecycle:
//! 1. [`StagingArea::begin`] creates `runs/<runId>/.staging/` and drops the
//!    `.poison` marker in the run directory.
//! 2. All phase writes land in staging, redirected at this layer.
//! 3. [`StagingArea::finalize`] computes `integrity.manifest.json` over every
//!    staged file, moves staging contents into the run directory, and deletes
//!    the poison marker.
//! 4. On failure or interruption, [`StagingArea::abort`] removes staging and
//!    leaves the poison marker, so the partial run self-identifies as
//!    corrupt.
//!
//! Readers must call [`enforce_poison_check_before_read`] and refuse poisoned
//! runs.

use std::fs;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::artifact::ArtifactId;
use crate::atomic_write::{write_bytes_atomic, write_file_atomic};
use crate::canonical::emit_jcs;
use crate::error::{ArtifactError, VeraxError};
use crate::ids::sha256_hex;
use crate::paths::{self, RunPaths, ensure_dir_all};
use crate::types::CONTRACT_VERSION;

/// One file in the integrity manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Relative POSIX path from the run directory root.
    pub path: String,
    pub sha256: String,
    pub size: u64,
}

/// `integrity.manifest.json` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityManifest {
    pub contract_version: u32,
    pub entries: Vec<ManifestEntry>,
}

/// A live staging area. Dropping it without calling [`finalize`](Self::finalize)
/// leaves the run poisoned, which is the intended crash behaviour.
#[derive(Debug)]
pub struct StagingArea {
    run: RunPaths,
}

impl StagingArea {
    /// Create the staging directory and poison marker.
    pub fn begin(run: RunPaths) -> Result<Self, VeraxError> {
        ensure_dir_all(&run.staging_dir()).map_err(|e| ArtifactError::WriteFailed {
            path: run.staging_dir().to_string(),
            reason: e.to_string(),
        })?;
        write_file_atomic(&run.poison_marker(), "incomplete\n").map_err(|e| {
            ArtifactError::WriteFailed {
                path: run.poison_marker().to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!(run_id = %run.run_id(), "staging area opened");
        Ok(Self { run })
    }

    #[must_use]
    pub fn run_paths(&self) -> &RunPaths {
        &self.run
    }

    /// Staged path for a registry artifact.
    #[must_use]
    pub fn artifact_path(&self, id: ArtifactId) -> Utf8PathBuf {
        self.run.staging_dir().join(id.filename())
    }

    /// Serialize a registry artifact as canonical JSON into staging.
    pub fn write_artifact<T: Serialize>(
        &self,
        id: ArtifactId,
        value: &T,
    ) -> Result<Utf8PathBuf, VeraxError> {
        let path = self.artifact_path(id);
        let json = emit_jcs(value).map_err(|e| ArtifactError::WriteFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        write_file_atomic(&path, &json).map_err(|e| ArtifactError::WriteFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(path)
    }

    /// Write an evidence blob at `evidence/<file>` inside staging. Returns
    /// the relative POSIX path used in artifact references.
    pub fn write_evidence(&self, file_name: &str, bytes: &[u8]) -> Result<String, VeraxError> {
        let path = self.run.staged_evidence_dir().join(file_name);
        write_bytes_atomic(&path, bytes).map_err(|e| ArtifactError::WriteFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(format!("{}/{file_name}", paths::EVIDENCE_DIR))
    }

    /// Compute the integrity manifest, promote staged files into the run
    /// directory, and clear the poison marker.
    pub fn finalize(self) -> Result<IntegrityManifest, VeraxError> {
        let staging = self.run.staging_dir();
        let run_dir = self.run.run_dir();

        let entries = compute_manifest(&staging)?;
        let manifest = IntegrityManifest {
            contract_version: CONTRACT_VERSION,
            entries,
        };
        let manifest_json = emit_jcs(&manifest).map_err(|e| ArtifactError::WriteFailed {
            path: ArtifactId::IntegrityManifest.filename().to_string(),
            reason: e.to_string(),
        })?;
        write_file_atomic(
            &staging.join(ArtifactId::IntegrityManifest.filename()),
            &manifest_json,
        )
        .map_err(|e| ArtifactError::WriteFailed {
            path: ArtifactId::IntegrityManifest.filename().to_string(),
            reason: e.to_string(),
        })?;

        // Promote staged entries one level up into the run directory.
        for entry in fs::read_dir(staging.as_std_path()).map_err(VeraxError::Io)? {
            let entry = entry.map_err(VeraxError::Io)?;
            let target = run_dir.as_std_path().join(entry.file_name());
            if target.exists() {
                if target.is_dir() {
                    fs::remove_dir_all(&target).map_err(VeraxError::Io)?;
                } else {
                    fs::remove_file(&target).map_err(VeraxError::Io)?;
                }
            }
            fs::rename(entry.path(), &target).map_err(VeraxError::Io)?;
        }
        fs::remove_dir(staging.as_std_path()).map_err(VeraxError::Io)?;
        fs::remove_file(self.run.poison_marker().as_std_path()).map_err(VeraxError::Io)?;

        debug!(run_id = %self.run.run_id(), files = manifest.entries.len(), "run finalized");
        Ok(manifest)
    }

    /// Roll back: remove staged files, keep the poison marker.
    pub fn abort(self) {
        let staging = self.run.staging_dir();
        if let Err(e) = fs::remove_dir_all(staging.as_std_path()) {
            warn!(run_id = %self.run.run_id(), error = %e, "failed to remove staging dir");
        }
    }
}

/// Compute manifest entries over every file under `dir`, sorted by relative
/// POSIX path. The manifest file itself is excluded so recomputation over a
/// finalized run directory reproduces the persisted manifest.
pub fn compute_manifest(dir: &Utf8Path) -> Result<Vec<ManifestEntry>, VeraxError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir.as_std_path()).sort_by_file_name() {
        let entry = entry.map_err(|e| ArtifactError::ReadFailed {
            path: dir.to_string(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = Utf8Path::from_path(entry.path()).ok_or_else(|| ArtifactError::ReadFailed {
            path: entry.path().display().to_string(),
            reason: "non-UTF-8 path".to_string(),
        })?;
        let rel = paths::relative_posix(dir, path).map_err(|e| ArtifactError::ReadFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        if rel == ArtifactId::IntegrityManifest.filename() || rel == paths::POISON_MARKER {
            continue;
        }
        let bytes = fs::read(path.as_std_path())
            .with_context(|| format!("Failed to read {path}"))
            .map_err(|e| ArtifactError::ReadFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        entries.push(ManifestEntry {
            path: rel,
            sha256: sha256_hex(&bytes),
            size: bytes.len() as u64,
        });
    }
    entries.sort();
    Ok(entries)
}

/// Refuse to read a run whose poison marker is present.
pub fn enforce_poison_check_before_read(run: &RunPaths) -> Result<(), VeraxError> {
    if run.poison_marker().exists() {
        return Err(ArtifactError::PoisonedRun {
            run_id: run.run_id().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Load a registry artifact from a finalized run directory, enforcing the
/// poison check first.
pub fn load_artifact<T: DeserializeOwned>(run: &RunPaths, id: ArtifactId) -> Result<T, VeraxError> {
    enforce_poison_check_before_read(run)?;
    let path = run.run_dir().join(id.filename());
    let content = fs::read_to_string(path.as_std_path()).map_err(|e| ArtifactError::ReadFailed {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| {
        ArtifactError::ReadFailed {
            path: path.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Verify a finalized run directory against its persisted manifest.
pub fn verify_manifest(run: &RunPaths) -> Result<(), VeraxError> {
    let persisted: IntegrityManifest = load_artifact(run, ArtifactId::IntegrityManifest)?;
    let recomputed = compute_manifest(&run.run_dir())?;
    for (expected, actual) in persisted.entries.iter().zip(recomputed.iter()) {
        if expected != actual {
            return Err(ArtifactError::IntegrityMismatch {
                path: actual.path.clone(),
                expected: expected.sha256.clone(),
                actual: actual.sha256.clone(),
            }
            .into());
        }
    }
    if persisted.entries.len() != recomputed.len() {
        return Err(ArtifactError::IntegrityMismatch {
            path: run.run_dir().to_string(),
            expected: persisted.entries.len().to_string(),
            actual: recomputed.len().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Prune old run directories, keeping the most recent `keep` plus every id
/// in `exclude`. Deletions never cross the out-root boundary.
pub fn prune_runs(
    out_root: &Utf8Path,
    keep: usize,
    exclude: &[&str],
) -> Result<Vec<String>, VeraxError> {
    let ids = paths::list_run_ids(out_root).map_err(|e| VeraxError::Io(std::io::Error::other(e)))?;
    if ids.len() <= keep {
        return Ok(Vec::new());
    }

    let cutoff = ids.len() - keep;
    let mut removed = Vec::new();
    for id in &ids[..cutoff] {
        if exclude.contains(&id.as_str()) {
            continue;
        }
        let dir = out_root.join(paths::RUNS_DIR).join(id);
        // Retention must never escape the output root.
        if !dir.starts_with(out_root) {
            continue;
        }
        fs::remove_dir_all(dir.as_std_path()).map_err(VeraxError::Io)?;
        removed.push(id.clone());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run_paths(temp: &TempDir, run_id: &str) -> RunPaths {
        let out = Utf8PathBuf::from_path_buf(temp.path().join(".verax")).unwrap();
        RunPaths::new(out, run_id)
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Dummy {
        value: u32,
    }

    #[test]
    fn begin_creates_poison_and_staging() {
        let temp = TempDir::new().unwrap();
        let run = run_paths(&temp, "r1");
        let staging = StagingArea::begin(run.clone()).unwrap();
        assert!(run.staging_dir().exists());
        assert!(run.poison_marker().exists());
        staging.abort();
        assert!(!run.staging_dir().exists());
        assert!(run.poison_marker().exists(), "abort keeps the poison marker");
    }

    #[test]
    fn finalize_promotes_files_and_clears_poison() {
        let temp = TempDir::new().unwrap();
        let run = run_paths(&temp, "r1");
        let staging = StagingArea::begin(run.clone()).unwrap();
        staging
            .write_artifact(ArtifactId::Summary, &Dummy { value: 7 })
            .unwrap();
        staging.write_evidence("UI#ab-01.png", b"fakepng").unwrap();
        let manifest = staging.finalize().unwrap();

        assert!(!run.poison_marker().exists());
        assert!(!run.staging_dir().exists());
        assert!(run.run_dir().join("summary.json").exists());
        assert!(run.run_dir().join("evidence/UI#ab-01.png").exists());
        assert!(
            run.run_dir().join("integrity.manifest.json").exists(),
            "manifest is part of the run"
        );

        // Two staged files tracked; the manifest excludes itself.
        assert_eq!(manifest.entries.len(), 2);
        assert!(manifest.entries.iter().any(|e| e.path == "summary.json"));
        assert!(
            manifest
                .entries
                .iter()
                .any(|e| e.path == "evidence/UI#ab-01.png")
        );
    }

    #[test]
    fn manifest_recomputation_matches_persisted() {
        let temp = TempDir::new().unwrap();
        let run = run_paths(&temp, "r1");
        let staging = StagingArea::begin(run.clone()).unwrap();
        staging
            .write_artifact(ArtifactId::Summary, &Dummy { value: 1 })
            .unwrap();
        staging.write_evidence("DOM#cd-01.json", b"{}").unwrap();
        staging.finalize().unwrap();

        verify_manifest(&run).unwrap();
    }

    #[test]
    fn poisoned_run_refuses_reads() {
        let temp = TempDir::new().unwrap();
        let run = run_paths(&temp, "r1");
        let staging = StagingArea::begin(run.clone()).unwrap();
        staging
            .write_artifact(ArtifactId::Summary, &Dummy { value: 1 })
            .unwrap();
        staging.abort();

        let err = enforce_poison_check_before_read(&run).unwrap_err();
        assert!(matches!(
            err,
            VeraxError::Artifact(ArtifactError::PoisonedRun { .. })
        ));
        let err = load_artifact::<Dummy>(&run, ArtifactId::Summary).unwrap_err();
        assert!(matches!(
            err,
            VeraxError::Artifact(ArtifactError::PoisonedRun { .. })
        ));
    }

    #[test]
    fn artifact_round_trip_through_staging() {
        let temp = TempDir::new().unwrap();
        let run = run_paths(&temp, "r1");
        let staging = StagingArea::begin(run.clone()).unwrap();
        staging
            .write_artifact(ArtifactId::Summary, &Dummy { value: 42 })
            .unwrap();
        staging.finalize().unwrap();

        let loaded: Dummy = load_artifact(&run, ArtifactId::Summary).unwrap();
        assert_eq!(loaded, Dummy { value: 42 });
    }

    #[test]
    fn prune_keeps_most_recent_and_excluded() {
        let temp = TempDir::new().unwrap();
        let out = Utf8PathBuf::from_path_buf(temp.path().join(".verax")).unwrap();
        for id in ["a-run", "b-run", "c-run", "d-run"] {
            ensure_dir_all(&out.join(paths::RUNS_DIR).join(id)).unwrap();
        }

        let removed = prune_runs(&out, 2, &["a-run"]).unwrap();
        assert_eq!(removed, vec!["b-run".to_string()]);
        assert!(out.join("runs/a-run").exists(), "excluded run kept");
        assert!(out.join("runs/c-run").exists());
        assert!(out.join("runs/d-run").exists());
        assert!(!out.join("runs/b-run").exists());
    }

    #[test]
    fn prune_noop_when_under_limit() {
        let temp = TempDir::new().unwrap();
        let out = Utf8PathBuf::from_path_buf(temp.path().join(".verax")).unwrap();
        ensure_dir_all(&out.join(paths::RUNS_DIR).join("only")).unwrap();
        assert!(prune_runs(&out, 10, &[]).unwrap().is_empty());
        assert!(out.join("runs/only").exists());
    }
}
