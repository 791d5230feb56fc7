//! On-disk layout of the output directory and POSIX path handling.
//!
//! Everything verax persists lives under `<out>/` (typically `.verax/`):
//!
//! ```text
//! runs/
//!   <runId>/
//!     .staging/                (during run only)
//!     .poison                  (present iff run is incomplete/corrupt)
//!     learn.json …             (artifact set)
//!     evidence/
//! ```
//!
//! All persisted path references use `/` separators on every host OS;
//! [`to_posix`] is the single conversion point.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Default output directory name.
pub const DEFAULT_OUT_DIR: &str = ".verax";

/// Name of the runs subdirectory.
pub const RUNS_DIR: &str = "runs";

/// Name of the staging subdirectory inside a run directory.
pub const STAGING_DIR: &str = ".staging";

/// Name of the poison marker file.
pub const POISON_MARKER: &str = ".poison";

/// Name of the evidence subdirectory.
pub const EVIDENCE_DIR: &str = "evidence";

/// Resolved directory layout for one run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    out_root: Utf8PathBuf,
    run_id: String,
}

impl RunPaths {
    #[must_use]
    pub fn new(out_root: impl Into<Utf8PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            out_root: out_root.into(),
            run_id: run_id.into(),
        }
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    #[must_use]
    pub fn out_root(&self) -> &Utf8Path {
        &self.out_root
    }

    #[must_use]
    pub fn runs_root(&self) -> Utf8PathBuf {
        self.out_root.join(RUNS_DIR)
    }

    /// Final run directory: `<out>/runs/<runId>`.
    #[must_use]
    pub fn run_dir(&self) -> Utf8PathBuf {
        self.runs_root().join(&self.run_id)
    }

    /// Staging directory: `<out>/runs/<runId>/.staging`.
    #[must_use]
    pub fn staging_dir(&self) -> Utf8PathBuf {
        self.run_dir().join(STAGING_DIR)
    }

    /// Poison marker: `<out>/runs/<runId>/.poison`.
    #[must_use]
    pub fn poison_marker(&self) -> Utf8PathBuf {
        self.run_dir().join(POISON_MARKER)
    }

    /// Evidence directory inside staging while the run is live.
    #[must_use]
    pub fn staged_evidence_dir(&self) -> Utf8PathBuf {
        self.staging_dir().join(EVIDENCE_DIR)
    }
}

/// Convert a path to POSIX form for persistence.
#[must_use]
pub fn to_posix(path: &Utf8Path) -> String {
    path.as_str().replace('\\', "/")
}

/// Relativize `path` against `base` and return the POSIX form.
pub fn relative_posix(base: &Utf8Path, path: &Utf8Path) -> Result<String> {
    let rel = path
        .strip_prefix(base)
        .with_context(|| format!("{path} is not under {base}"))?;
    Ok(to_posix(rel))
}

/// Create a directory and all parents, tolerating benign races.
pub fn ensure_dir_all(path: &Utf8Path) -> Result<()> {
    fs::create_dir_all(path.as_std_path())
        .with_context(|| format!("Failed to create directory: {path}"))
}

/// List run directory names under `<out>/runs`, sorted ascending.
///
/// Run IDs start with an ISO-derived stamp, so lexicographic order is
/// chronological order.
pub fn list_run_ids(out_root: &Utf8Path) -> Result<Vec<String>> {
    let runs = out_root.join(RUNS_DIR);
    if !runs.exists() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    for entry in fs::read_dir(runs.as_std_path())
        .with_context(|| format!("Failed to read runs directory: {runs}"))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            ids.push(name.to_string());
        }
    }
    ids.sort();
    Ok(ids)
}
