//! verax - a silent-failure detector for web applications.
//!
//! Given a URL plus the application's source tree, verax decides, for each
//! user-facing promise the source code makes, whether a real browser session
//! actually observes that promise being honoured. The pipeline is a strict
//! learn → observe → detect chain producing a deterministic, evidence-backed
//! artifact set under `.verax/runs/<runId>/`.

/// Returns the verax version string.
#[must_use]
pub fn verax_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub mod artifact;
pub mod atomic_write;
pub mod budget;
pub mod canonical;
pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod exit_codes;
pub mod ids;
pub mod learn;
pub mod logging;
pub mod observe;
pub mod paths;
pub mod pipeline;
pub mod providers;
pub mod report;
pub mod staging;
pub mod summary;
pub mod timeout;
pub mod types;

// Core surface used by external consumers
pub use config::{RunConfig, RunInputs};
pub use error::{BrowserError, ConfigError, VeraxError};
pub use exit_codes::{ExitCode, RunStatus};
pub use pipeline::{RunReport, run, run_with_options};
pub use types::*;
