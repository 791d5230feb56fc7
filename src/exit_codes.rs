//! Exit code constants and final-status mapping for verax.
//!
//! The exit code table is a stable contract shared with CI consumers:
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | No CONFIRMED findings |
//! | 10 | `WARNING` | SUSPECTED/INFORMATIONAL findings only |
//! | 20 | `FINDINGS` | At least one CONFIRMED finding |
//! | 30 | `INCOMPLETE` | Coverage below threshold or global timeout |
//! | 50 | `INVARIANT_VIOLATION` | Internal data/provenance contract failed |
//! | 64 | `USAGE_ERROR` | Missing/invalid invocation inputs |
//! | 65 | `INVALID_INPUT` | Malformed URL or absent source path |
//! | 66 | `INFRA_FAILURE` | Browser or other runtime capability unavailable |
//! | 2 | `TOOL_FAILURE` | Uncaught crash |

use serde::{Deserialize, Serialize};

/// Exit codes matching the documented exit code table.
///
/// The numeric values are part of the public contract and will not change
/// in 1.x releases. Use the named constants, or [`as_i32()`](Self::as_i32)
/// for `std::process::exit()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Run completed with no CONFIRMED findings
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// SUSPECTED or INFORMATIONAL findings only
    pub const WARNING: ExitCode = ExitCode(10);

    /// At least one CONFIRMED finding
    pub const FINDINGS: ExitCode = ExitCode(20);

    /// Run finished but coverage was below threshold, or the global
    /// watchdog fired
    pub const INCOMPLETE: ExitCode = ExitCode(30);

    /// Internal invariant violated (provenance, evidence law, poison marker)
    pub const INVARIANT_VIOLATION: ExitCode = ExitCode(50);

    /// Missing or invalid invocation inputs
    pub const USAGE_ERROR: ExitCode = ExitCode(64);

    /// Malformed URL or absent source path
    pub const INVALID_INPUT: ExitCode = ExitCode(65);

    /// Runtime capability (browser binary, evidence dir) unavailable
    pub const INFRA_FAILURE: ExitCode = ExitCode(66);

    /// Uncaught crash
    pub const TOOL_FAILURE: ExitCode = ExitCode(2);

    /// Get the numeric exit code value for `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an `ExitCode` from a raw i32 value.
    ///
    /// Prefer the named constants when possible.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    /// Conflict-resolution rank. Higher rank wins when several statuses
    /// apply to one run.
    ///
    /// Precedence: USAGE_ERROR > TOOL_FAILURE > INVARIANT_VIOLATION >
    /// INCOMPLETE > FINDINGS > WARNING > SUCCESS.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self.0 {
            64 => 7,
            2 => 6,
            50 => 5,
            65 => 5, // invalid input halts before any run state exists
            66 => 5,
            30 => 4,
            20 => 3,
            10 => 2,
            _ => 1,
        }
    }

    /// Combine two candidate exit codes, keeping the higher-precedence one.
    #[must_use]
    pub const fn merge(self, other: ExitCode) -> ExitCode {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

/// Final status of a run, persisted in `run.status.json` and mapped 1:1 to
/// an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(test, derive(strum::VariantNames))]
pub enum RunStatus {
    Success,
    Warning,
    Findings,
    Incomplete,
    InvariantViolation,
    UsageError,
    InvalidInput,
    InfraFailure,
    ToolFailure,
}

impl RunStatus {
    /// Map the final status to its process exit code.
    #[must_use]
    pub const fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::Warning => ExitCode::WARNING,
            Self::Findings => ExitCode::FINDINGS,
            Self::Incomplete => ExitCode::INCOMPLETE,
            Self::InvariantViolation => ExitCode::INVARIANT_VIOLATION,
            Self::UsageError => ExitCode::USAGE_ERROR,
            Self::InvalidInput => ExitCode::INVALID_INPUT,
            Self::InfraFailure => ExitCode::INFRA_FAILURE,
            Self::ToolFailure => ExitCode::TOOL_FAILURE,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Findings => "FINDINGS",
            Self::Incomplete => "INCOMPLETE",
            Self::InvariantViolation => "INVARIANT_VIOLATION",
            Self::UsageError => "USAGE_ERROR",
            Self::InvalidInput => "INVALID_INPUT",
            Self::InfraFailure => "INFRA_FAILURE",
            Self::ToolFailure => "TOOL_FAILURE",
        }
    }

    /// Combine two statuses under the documented precedence.
    #[must_use]
    pub const fn merge(self, other: RunStatus) -> RunStatus {
        if other.exit_code().precedence() > self.exit_code().precedence() {
            other
        } else {
            self
        }
    }
}
