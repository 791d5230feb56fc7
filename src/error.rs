//! Library-level error types with exit-code mapping.
//!
//! `VeraxError` is the primary error type returned by library operations.
//! Errors are organized into categories that mirror the run surface:
//!
//! | Category | Description |
//! |----------|-------------|
//! | `Config` | Invocation inputs and configuration resolution |
//! | `Learn` | Static extraction failures |
//! | `Observe` | Browser-driven observation failures |
//! | `Detect` | Correlation/classification failures |
//! | `Artifact` | Artifact registry, staging and manifest failures |
//! | `Browser` | Injected browser capability failures |
//! | `Invariant` | Broken internal contracts — never recovered |
//!
//! Library code returns `VeraxError` and does NOT call
//! `std::process::exit()`; the CLI maps errors via
//! [`VeraxError::to_exit_code`].

use thiserror::Error;

use crate::exit_codes::ExitCode;

#[derive(Error, Debug)]
pub enum VeraxError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Learn phase error: {0}")]
    Learn(#[from] LearnError),

    #[error("Observe phase error: {0}")]
    Observe(#[from] ObserveError),

    #[error("Detect phase error: {0}")]
    Detect(#[from] DetectError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Browser capability error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Invariant violation [{invariant}]: {detail}")]
    Invariant { invariant: String, detail: String },

    #[error("Phase {phase} exceeded its budget of {budget_ms} ms")]
    PhaseTimeout { phase: String, budget_ms: u64 },

    #[error("Global watchdog fired after {budget_ms} ms")]
    GlobalTimeout { budget_ms: u64 },

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VeraxError {
    /// Map an error to its CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(err) => err.to_exit_code(),
            Self::Learn(err) => err.to_exit_code(),
            Self::Observe(ObserveError::EmptyExpectationSet) => ExitCode::USAGE_ERROR,
            Self::Observe(_) => ExitCode::INCOMPLETE,
            Self::Detect(_) => ExitCode::INVARIANT_VIOLATION,
            Self::Artifact(ArtifactError::PoisonedRun { .. }) => ExitCode::INVARIANT_VIOLATION,
            Self::Artifact(_) => ExitCode::TOOL_FAILURE,
            Self::Browser(BrowserError::Unavailable { .. }) => ExitCode::INFRA_FAILURE,
            Self::Browser(_) => ExitCode::INCOMPLETE,
            Self::Invariant { .. } => ExitCode::INVARIANT_VIOLATION,
            Self::PhaseTimeout { .. } | Self::GlobalTimeout { .. } => ExitCode::INCOMPLETE,
            Self::Cancelled => ExitCode::INCOMPLETE,
            Self::Io(_) => ExitCode::TOOL_FAILURE,
        }
    }

    /// Shorthand for an invariant-violation error.
    pub fn invariant(invariant: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Invariant {
            invariant: invariant.into(),
            detail: detail.into(),
        }
    }
}

/// Invocation-input and configuration-resolution errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required input: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Target URL is malformed: {url}")]
    MalformedUrl { url: String },

    #[error("Source root does not exist: {path}")]
    SourceRootMissing { path: String },
}

impl ConfigError {
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::MissingRequired(_) | Self::InvalidValue { .. } => ExitCode::USAGE_ERROR,
            Self::MalformedUrl { .. } | Self::SourceRootMissing { .. } => ExitCode::INVALID_INPUT,
        }
    }
}

/// Static extraction failures. Per-file parse errors are not errors at all;
/// they become `parseError` skip counters.
#[derive(Error, Debug)]
pub enum LearnError {
    #[error(
        "Ambiguous scan roots: {candidates:?} all look plausible; pass an explicit scan-root override"
    )]
    AmbiguousScanRoots { candidates: Vec<String> },

    #[error("Could not determine a scan root for framework '{framework}'")]
    UnknownScanRoot { framework: String },

    #[error("No literal expectations found after scanning {files_scanned} files")]
    NoExpectations { files_scanned: usize },
}

impl LearnError {
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            // Ambiguity is a data contract failure: the tool refuses to guess.
            Self::AmbiguousScanRoots { .. } => ExitCode::INVARIANT_VIOLATION,
            Self::UnknownScanRoot { .. } => ExitCode::USAGE_ERROR,
            Self::NoExpectations { .. } => ExitCode::USAGE_ERROR,
        }
    }
}

/// Observation-phase failures that escape the per-expectation recovery path.
#[derive(Error, Debug)]
pub enum ObserveError {
    #[error("Expectation set is empty; refusing to launch a browser")]
    EmptyExpectationSet,

    #[error("Observe phase budget of {budget_ms} ms exhausted after {completed} expectations")]
    PhaseBudgetExhausted { budget_ms: u64, completed: usize },
}

/// Detect-phase failures. These indicate the detection contract is broken
/// and are never recovered.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Finding {id} is missing sourceType")]
    MissingSourceType { id: String },

    #[error("Finding {id} has code provenance but sourceRef {source_ref:?} is not file:line:col")]
    MalformedSourceRef { id: String, source_ref: Option<String> },
}

/// Artifact registry, staging and integrity failures.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Run {run_id} is poisoned; refusing to read its artifacts")]
    PoisonedRun { run_id: String },

    #[error("Artifact write failed at {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Artifact read failed at {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Unknown artifact name: {name}")]
    UnknownArtifact { name: String },

    #[error("Integrity manifest mismatch for {path}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

/// Errors surfaced by the injected browser capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    #[error("Browser unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("Action '{action}' on {target} was blocked: {reason}")]
    ActionBlocked {
        action: String,
        target: String,
        reason: String,
    },

    #[error("Selector not found: {selector}")]
    SelectorMissing { selector: String },

    #[error("Operation '{operation}' exceeded its {budget_ms} ms budget")]
    Timeout { operation: String, budget_ms: u64 },

    #[error("Page crashed: {reason}")]
    PageCrashed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_map_to_64() {
        let err = VeraxError::Config(ConfigError::MissingRequired("url".into()));
        assert_eq!(err.to_exit_code(), ExitCode::USAGE_ERROR);

        let err = VeraxError::Learn(LearnError::NoExpectations { files_scanned: 12 });
        assert_eq!(err.to_exit_code(), ExitCode::USAGE_ERROR);

        let err = VeraxError::Observe(ObserveError::EmptyExpectationSet);
        assert_eq!(err.to_exit_code(), ExitCode::USAGE_ERROR);
    }

    #[test]
    fn invalid_input_maps_to_65() {
        let err = VeraxError::Config(ConfigError::MalformedUrl {
            url: "not a url".into(),
        });
        assert_eq!(err.to_exit_code(), ExitCode::INVALID_INPUT);

        let err = VeraxError::Config(ConfigError::SourceRootMissing {
            path: "/nope".into(),
        });
        assert_eq!(err.to_exit_code(), ExitCode::INVALID_INPUT);
    }

    #[test]
    fn ambiguity_and_invariants_map_to_50() {
        let err = VeraxError::Learn(LearnError::AmbiguousScanRoots {
            candidates: vec!["app".into(), "pages".into()],
        });
        assert_eq!(err.to_exit_code(), ExitCode::INVARIANT_VIOLATION);

        let err = VeraxError::invariant("provenance", "sourceType missing");
        assert_eq!(err.to_exit_code(), ExitCode::INVARIANT_VIOLATION);

        let err = VeraxError::Artifact(ArtifactError::PoisonedRun {
            run_id: "r1".into(),
        });
        assert_eq!(err.to_exit_code(), ExitCode::INVARIANT_VIOLATION);
    }

    #[test]
    fn browser_unavailable_maps_to_66() {
        let err = VeraxError::Browser(BrowserError::Unavailable {
            reason: "chromium binary not found".into(),
        });
        assert_eq!(err.to_exit_code(), ExitCode::INFRA_FAILURE);
    }

    #[test]
    fn timeouts_map_to_incomplete() {
        let err = VeraxError::PhaseTimeout {
            phase: "observe".into(),
            budget_ms: 1000,
        };
        assert_eq!(err.to_exit_code(), ExitCode::INCOMPLETE);

        let err = VeraxError::GlobalTimeout { budget_ms: 30_000 };
        assert_eq!(err.to_exit_code(), ExitCode::INCOMPLETE);
    }
}
