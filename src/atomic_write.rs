//! Atomic file writes for artifacts and evidence blobs.
//!
//! Every write stages into a temp file in the target's own directory, fsyncs,
//! then renames over the destination, so readers never see a torn file; the
//! poison-marker protocol in `staging` covers whole-run granularity on top.
//! Windows gets a short bounded retry for transient sharing violations, and a
//! copy-based fallback handles the rare rename that crosses filesystems.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

/// Result of an atomic write operation.
#[derive(Debug, Clone, Default)]
pub struct AtomicWriteResult {
    /// Number of rename retries that occurred (Windows only).
    pub rename_retry_count: u32,
    /// Whether cross-filesystem fallback was used.
    pub used_cross_filesystem_fallback: bool,
    pub warnings: Vec<String>,
}

/// Atomically write UTF-8 content, normalizing line endings to LF.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<AtomicWriteResult> {
    let normalized = normalize_line_endings(content);
    write_bytes_atomic(path, normalized.as_bytes())
}

/// Atomically write raw bytes (evidence blobs such as screenshots).
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<AtomicWriteResult> {
    let mut result = AtomicWriteResult::default();

    let dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(dir.as_std_path())
        .with_context(|| format!("Failed to create parent directory: {dir}"))?;

    let staged = stage(dir, content)?;

    match promote(staged, path) {
        Promotion::Renamed { retries } => {
            result.rename_retry_count = retries;
            if retries > 0 {
                result.warnings.push(format!(
                    "Rename of {path} succeeded after {retries} retries (transient lock)"
                ));
            }
        }
        Promotion::CrossedFilesystem => {
            // The staged file cannot be renamed onto the target device
            // (exotic mounts; the temp already lives next to the target).
            // Re-stage from the content we still hold; the unrenameable
            // temp cleans itself up on drop.
            result.used_cross_filesystem_fallback = true;
            result
                .warnings
                .push(format!("Rename of {path} crossed filesystems; copied instead"));
            let restaged = stage(dir, content)?;
            restaged
                .persist(path.as_std_path())
                .map_err(|e| anyhow::anyhow!(e.error))
                .with_context(|| format!("Cross-filesystem copy failed for: {path}"))?;
        }
        Promotion::Failed { error } => {
            return Err(error).with_context(|| format!("Failed to atomically write file: {path}"));
        }
    }

    Ok(result)
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

/// Write content into a synced temp file inside `dir`.
fn stage(dir: &Utf8Path, content: &[u8]) -> Result<NamedTempFile> {
    let mut staged = NamedTempFile::new_in(dir.as_std_path())
        .with_context(|| format!("Failed to create temporary file in: {dir}"))?;
    staged
        .write_all(content)
        .with_context(|| "Failed to write staged content")?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync staged content")?;
    Ok(staged)
}

/// Outcome of promoting a staged file to its final name.
enum Promotion {
    Renamed { retries: u32 },
    /// The rename hit another filesystem; the caller must copy instead.
    CrossedFilesystem,
    Failed { error: anyhow::Error },
}

/// Promote via rename, retrying transient Windows sharing violations on a
/// short fixed schedule (~225 ms total). Antivirus and indexer scans hold
/// freshly written files briefly; a handful of spaced retries clears the
/// overwhelming majority of them.
fn promote(staged: NamedTempFile, target: &Utf8Path) -> Promotion {
    const BACKOFF_MS: [u64; 4] = [15, 30, 60, 120];

    let mut staged = staged;
    let mut retries = 0u32;
    loop {
        match staged.persist(target.as_std_path()) {
            Ok(_) => return Promotion::Renamed { retries },
            Err(persist_error) => {
                if persist_error.error.kind() == std::io::ErrorKind::CrossesDevices {
                    return Promotion::CrossedFilesystem;
                }
                let slot = retries as usize;
                if !retry_on_windows(&persist_error.error) || slot >= BACKOFF_MS.len() {
                    return Promotion::Failed {
                        error: anyhow::anyhow!(persist_error.error),
                    };
                }
                std::thread::sleep(std::time::Duration::from_millis(BACKOFF_MS[slot]));
                retries += 1;
                staged = persist_error.file;
            }
        }
    }
}

/// Only Windows sharing violations are worth retrying; every other rename
/// failure is immediately terminal.
#[cfg(windows)]
fn retry_on_windows(error: &std::io::Error) -> bool {
    error.kind() == std::io::ErrorKind::PermissionDenied
}

#[cfg(not(windows))]
fn retry_on_windows(_error: &std::io::Error) -> bool {
    false
}
