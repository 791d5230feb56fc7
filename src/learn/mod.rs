//! Learn phase: static extraction of expectations from the source tree.
//!
//! The walk is framework-aware (scan-root resolution), exclusion-hardened,
//! and per-file fault tolerant: a file that cannot be read or decoded bumps
//! the `parseError` counter and the scan continues. A completed scan that
//! yields zero literal expectations fails fast with a usage error — the tool
//! refuses to produce "nothing to find".

pub mod extract;
pub mod html;
pub mod react;
pub mod scan_roots;
pub mod stores;
pub mod svelte;
pub mod vue;

use std::collections::BTreeMap;

use camino::Utf8Path;
use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::canonical::sort_expectations;
use crate::config::RunConfig;
use crate::error::{LearnError, VeraxError};
use crate::paths::relative_posix;
use crate::types::{
    CONTRACT_VERSION, Framework, LearnArtifact, ProjectArtifact, SupportLevel,
};

use extract::{Extraction, default_registry};
use scan_roots::{HARD_EXCLUSIONS, detect_framework, resolve_scan_roots};

/// File extensions the extractor registry understands.
static SUPPORTED: Lazy<GlobSet> = Lazy::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in [
        "*.html", "*.htm", "*.js", "*.jsx", "*.ts", "*.tsx", "*.vue", "*.svelte",
    ] {
        builder.add(Glob::new(pattern).expect("static pattern"));
    }
    builder.build().expect("static globset")
});

/// Output of the learn phase: the artifact plus project scan statistics.
#[derive(Debug, Clone)]
pub struct LearnOutcome {
    pub artifact: LearnArtifact,
    pub project: ProjectArtifact,
}

/// Run the learn phase over the configured source root.
pub fn run_learn(config: &RunConfig) -> Result<LearnOutcome, VeraxError> {
    let root = &config.source_root;
    let detection = detect_framework(root, config.framework_hint);
    let roots = resolve_scan_roots(root, detection, config)?;

    info!(
        framework = detection.framework.as_str(),
        roots = roots.len(),
        "learn scan starting"
    );

    let registry = default_registry();
    let mut merged = Extraction::default();
    let mut files_walked: u32 = 0;
    let mut files_parsed: u32 = 0;
    let mut by_extension: BTreeMap<String, u32> = BTreeMap::new();

    for scan_root in &roots {
        for entry in WalkDir::new(scan_root.as_std_path())
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !e.file_type().is_dir()
                    || e.file_name()
                        .to_str()
                        .is_none_or(|name| !HARD_EXCLUSIONS.contains(&name))
            })
        {
            let Ok(entry) = entry else {
                merged.skipped.parse_error += 1;
                continue;
            };
            if !entry.file_type().is_file() {
                continue;
            }
            files_walked += 1;

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                merged.skipped.parse_error += 1;
                continue;
            };
            let Some(ext) = path.extension() else {
                continue;
            };
            if !SUPPORTED.is_match(format!("x.{ext}")) {
                continue;
            }
            *by_extension.entry(ext.to_string()).or_insert(0) += 1;

            let rel = relative_posix(root, path).unwrap_or_else(|_| path.to_string());
            let Ok(source) = std::fs::read_to_string(path.as_std_path()) else {
                debug!(file = %rel, "unreadable file skipped");
                merged.skipped.parse_error += 1;
                continue;
            };
            files_parsed += 1;

            for extractor in &registry {
                if extractor.supports(ext) {
                    merged.merge(extractor.extract(&source, &rel));
                }
            }
        }
    }

    let mut expectations = merged.expectations;
    sort_expectations(&mut expectations);
    expectations.dedup_by(|a, b| a.id == b.id);

    if expectations.is_empty() && !config.allow_empty_learn {
        return Err(LearnError::NoExpectations {
            files_scanned: files_parsed as usize,
        }
        .into());
    }

    info!(
        expectations = expectations.len(),
        skipped = merged.skipped.total(),
        "learn scan complete"
    );

    let artifact = LearnArtifact {
        contract_version: CONTRACT_VERSION,
        framework: detection.framework,
        router: detection.router,
        support_level: support_level(detection.framework),
        expectations,
        skipped: merged.skipped,
    };

    let project = ProjectArtifact {
        contract_version: CONTRACT_VERSION,
        framework: detection.framework,
        router: detection.router,
        scan_roots: roots
            .iter()
            .map(|r| {
                let rel = relative_posix(root, r).unwrap_or_else(|_| r.to_string());
                if rel.is_empty() { ".".to_string() } else { rel }
            })
            .collect(),
        files_walked,
        files_parsed,
        by_extension,
    };

    Ok(LearnOutcome { artifact, project })
}

const fn support_level(framework: Framework) -> SupportLevel {
    match framework {
        Framework::Nextjs | Framework::React | Framework::Static => SupportLevel::ProductionReady,
        Framework::Vue | Framework::Svelte => SupportLevel::Beta,
        Framework::Remix | Framework::Unknown => SupportLevel::Experimental,
    }
}
