//! Core data model for the learn → observe → detect pipeline.
//!
//! All entities are immutable value records with stable IDs. Ownership is
//! phase-scoped: Learn produces [`Expectation`]s, Observe produces
//! [`Observation`]s plus the evidence arena, Detect produces [`Finding`]s.
//! Every persisted record serializes with camelCase keys and carries
//! `contractVersion: 1` at the artifact level.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Contract version stamped on every JSON artifact.
pub const CONTRACT_VERSION: u32 = 1;

// ============================================================================
// Expectations (Learn output)
// ============================================================================

/// The category of user-facing promise an expectation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectationKind {
    Navigation,
    Interaction,
    State,
    Network,
    Form,
    Validation,
}

impl ExpectationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Interaction => "interaction",
            Self::State => "state",
            Self::Network => "network",
            Self::Form => "form",
            Self::Validation => "validation",
        }
    }
}

/// The concrete action a promise commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PromiseKind {
    #[serde(rename = "navigate")]
    Navigate,
    #[serde(rename = "click")]
    Click,
    #[serde(rename = "submit")]
    Submit,
    #[serde(rename = "network_action")]
    NetworkAction,
    #[serde(rename = "state-change")]
    StateChange,
    #[serde(rename = "validation")]
    Validation,
}

impl PromiseKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Click => "click",
            Self::Submit => "submit",
            Self::NetworkAction => "network_action",
            Self::StateChange => "state-change",
            Self::Validation => "validation",
        }
    }
}

/// A promise: the literal target the source code commits to.
///
/// Only literal values are admitted by Learn; anything dynamic is skipped
/// with a counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PromiseSpec {
    pub kind: PromiseKind,
    pub value: String,
}

/// Provenance to the exact source location an expectation was extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Name of the extraction pattern that matched (e.g. `jsx-link`).
    pub pattern: String,
}

impl SourceLocation {
    /// Render as `file:line:column`, the canonical `sourceRef` form.
    #[must_use]
    pub fn source_ref(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Whether an expectation came from static code or runtime discovery.
///
/// Runtime expectations may never be promoted past SUSPECTED downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Code,
    Runtime,
}

/// A literal, source-anchored promise extracted by Learn (or discovered at
/// runtime by the observe micro-crawl).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expectation {
    /// Stable hash of (type, file, line, column, promise.kind,
    /// promise.value); never contains a timestamp.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ExpectationKind,
    pub promise: PromiseSpec,
    pub source: SourceLocation,
    pub source_type: SourceType,
    /// `file:line:column` for code expectations, null for runtime ones.
    pub source_ref: Option<String>,
    /// Base confidence the extractor assigns (< 1.0 allowed).
    pub confidence: f64,
}

// ============================================================================
// Observations (Observe output)
// ============================================================================

/// The typed signal record Detect reasons over. Fields are the exhaustive
/// list of effect atoms; classification reads only declared fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signals {
    pub navigation_changed: bool,
    pub route_changed: bool,
    pub meaningful_ui_change: bool,
    pub meaningful_dom_change: bool,
    /// A DOM diff existed at all, even below the noise threshold.
    pub dom_diff_present: bool,
    pub feedback_seen: bool,
    pub aria_live_updated: bool,
    pub submission_triggered: bool,
    pub network_attempt_after_submit: bool,
    pub delayed_acknowledgment: bool,
    /// A loading indicator was still present on the after snapshot.
    pub loading_indicator_after: bool,
}

impl Signals {
    /// True when at least one effect consistent with any promise fired.
    #[must_use]
    pub const fn any_effect(&self) -> bool {
        self.navigation_changed
            || self.route_changed
            || self.meaningful_ui_change
            || self.meaningful_dom_change
            || self.feedback_seen
            || self.aria_live_updated
            || self.delayed_acknowledgment
    }
}

/// Context anchor: the before/after snapshot proving state around an
/// interaction. CONFIRMED findings require a non-empty before anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextAnchor {
    pub url: Option<String>,
    pub screenshot: Option<String>,
    pub dom_signature: Option<String>,
}

impl ContextAnchor {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.url.is_none() && self.screenshot.is_none() && self.dom_signature.is_none()
    }
}

/// Classified reason codes for observations that were skipped or failed.
/// The string forms are part of the artifact contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationReason {
    #[serde(rename = "SELECTOR_MISSING")]
    SelectorMissing,
    #[serde(rename = "OBSERVATION_TIMEOUT")]
    ObservationTimeout,
    #[serde(rename = "EXTERNAL_URL_SKIPPED")]
    ExternalUrlSkipped,
    #[serde(rename = "out_of_scope_dynamic_route")]
    OutOfScopeDynamicRoute,
    #[serde(rename = "ACTION_BLOCKED")]
    ActionBlocked,
    #[serde(rename = "PAGE_UNREACHABLE")]
    PageUnreachable,
}

/// Compact classifier for ambiguous submissions. Must never carry selectors,
/// paths, or other high-cardinality strings; the whole record stays under
/// 1 KB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilenceDetected {
    pub kind: String,
    pub code: String,
}

impl SilenceDetected {
    #[must_use]
    pub fn submission_ambiguous() -> Self {
        Self {
            kind: "submission_ambiguous".to_string(),
            code: "unknown_submission_intent".to_string(),
        }
    }
}

/// Evidence item categories; the prefix is embedded in every evidence ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Ui,
    Dom,
    Net,
    Log,
}

impl EvidenceKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Ui => "UI",
            Self::Dom => "DOM",
            Self::Net => "NET",
            Self::Log => "LOG",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Ui => "png",
            Self::Dom | Self::Net | Self::Log => "json",
        }
    }
}

/// An entry in the flat evidence arena. All cross-references are by stable
/// ID, never by pointer or absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    pub id: String,
    pub kind: EvidenceKind,
    /// Relative POSIX path under the run directory.
    pub path: String,
    pub sha256: String,
    pub size: u64,
}

/// Observe's record of whether and how one expectation was honoured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// References an expectation, or null for pure runtime discoveries.
    pub expectation_id: Option<String>,
    /// The core attempted to perform the interaction.
    pub attempted: bool,
    /// At least one effect-signal was captured.
    pub observed: bool,
    pub signals: Signals,
    /// Ordered evidence IDs into the arena.
    pub evidence: Vec<String>,
    pub before: ContextAnchor,
    pub after: ContextAnchor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ObservationReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_detected: Option<SilenceDetected>,
}

// ============================================================================
// Findings (Detect output)
// ============================================================================

/// Finding type vocabulary. String forms are the artifact contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(test, derive(strum::VariantNames))]
pub enum FindingType {
    SilentFailure,
    NavigationSilentFailure,
    SubmitSilentFailure,
    NetworkSilentFailure,
    MissingFeedbackSilentFailure,
    NoEffectSilentFailure,
    BrokenNavigationPromise,
    CoverageGap,
    Unproven,
    Informational,
    Observed,
}

impl FindingType {
    /// True for every member of the silent-failure family.
    #[must_use]
    pub const fn is_silent_failure(self) -> bool {
        matches!(
            self,
            Self::SilentFailure
                | Self::NavigationSilentFailure
                | Self::SubmitSilentFailure
                | Self::NetworkSilentFailure
                | Self::MissingFeedbackSilentFailure
                | Self::NoEffectSilentFailure
                | Self::BrokenNavigationPromise
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SilentFailure => "silent_failure",
            Self::NavigationSilentFailure => "navigation_silent_failure",
            Self::SubmitSilentFailure => "submit_silent_failure",
            Self::NetworkSilentFailure => "network_silent_failure",
            Self::MissingFeedbackSilentFailure => "missing_feedback_silent_failure",
            Self::NoEffectSilentFailure => "no_effect_silent_failure",
            Self::BrokenNavigationPromise => "broken_navigation_promise",
            Self::CoverageGap => "coverage_gap",
            Self::Unproven => "unproven",
            Self::Informational => "informational",
            Self::Observed => "observed",
        }
    }
}

/// Evidential strength of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingStatus {
    Confirmed,
    Suspected,
    Informational,
    Observed,
}

impl FindingStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Suspected => "SUSPECTED",
            Self::Informational => "INFORMATIONAL",
            Self::Observed => "OBSERVED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Rank used by the canonical findings comparator; lower sorts first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
    Unproven,
}

/// Confidence score in [0, 1] with its derived bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub score: f64,
    pub bucket: ConfidenceBucket,
}

/// Deterministic sub-classification of a silent failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(test, derive(strum::VariantNames))]
pub enum SilenceKind {
    NoNavigation,
    BlockedWithoutMessage,
    StalledLoading,
    NoFeedback,
    NoUiChange,
    UnknownSilence,
}

impl SilenceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoNavigation => "NO_NAVIGATION",
            Self::BlockedWithoutMessage => "BLOCKED_WITHOUT_MESSAGE",
            Self::StalledLoading => "STALLED_LOADING",
            Self::NoFeedback => "NO_FEEDBACK",
            Self::NoUiChange => "NO_UI_CHANGE",
            Self::UnknownSilence => "UNKNOWN_SILENCE",
        }
    }
}

/// An evidence reference inside a finding: stable ID plus integrity hash.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceManifestEntry {
    pub id: String,
    pub kind: EvidenceKind,
    pub path: String,
    pub sha256: String,
}

/// Detect's classified conclusion about one expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FindingType,
    pub status: FindingStatus,
    pub severity: Severity,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_kind: Option<SilenceKind>,
    pub evidence: Vec<EvidenceManifestEntry>,
    pub risk_summary: String,
    pub expectation_id: String,
    pub promise: PromiseSpec,
    pub source_type: SourceType,
    pub source_ref: Option<String>,
}

/// Record of an evidence-law downgrade applied to a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Downgrade {
    pub finding_id: String,
    pub from: FindingStatus,
    pub to: FindingStatus,
    pub reason: String,
}

/// A promise excluded from findings entirely (dynamic routes, external URLs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipEntry {
    pub reason: ObservationReason,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation_id: Option<String>,
}

// ============================================================================
// Artifact bodies
// ============================================================================

/// Dynamic-skip counter buckets persisted by Learn. These counters are the
/// only way the user learns what was not extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipCounters {
    pub dynamic: u32,
    pub params: u32,
    pub computed: u32,
    pub external: u32,
    pub parse_error: u32,
    pub other: u32,
}

impl SkipCounters {
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.dynamic + self.params + self.computed + self.external + self.parse_error + self.other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Nextjs,
    Remix,
    React,
    Vue,
    Svelte,
    Static,
    Unknown,
}

impl Framework {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nextjs => "nextjs",
            Self::Remix => "remix",
            Self::React => "react",
            Self::Vue => "vue",
            Self::Svelte => "svelte",
            Self::Static => "static",
            Self::Unknown => "unknown",
        }
    }

    /// Budget multiplier applied to per-phase timeouts.
    #[must_use]
    pub const fn budget_multiplier(self) -> f64 {
        match self {
            Self::Nextjs | Self::Remix => 1.2,
            Self::React | Self::Vue => 1.1,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Router {
    App,
    Pages,
    Spa,
    Filesystem,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportLevel {
    ProductionReady,
    Beta,
    Experimental,
}

/// `learn.json` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnArtifact {
    pub contract_version: u32,
    pub framework: Framework,
    pub router: Router,
    pub support_level: SupportLevel,
    pub expectations: Vec<Expectation>,
    pub skipped: SkipCounters,
}

/// `observe.json` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserveArtifact {
    pub contract_version: u32,
    pub base_url: String,
    pub observations: Vec<Observation>,
    /// Flat evidence arena; all references are IDs into this table.
    pub evidence_index: Vec<EvidenceRecord>,
    /// Expectations discovered during observation (micro-crawl). Empty when
    /// micro-crawl is disabled.
    pub runtime_expectations: Vec<Expectation>,
    pub skipped: Vec<SkipEntry>,
    pub pages_visited: u32,
}

/// `findings.json` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingsArtifact {
    pub contract_version: u32,
    pub findings: Vec<Finding>,
    pub skips: Vec<SkipEntry>,
    pub downgrades: Vec<Downgrade>,
    pub deduplicated_count: u32,
}

/// Counts block shared by `summary.json` and the JSON output channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounts {
    pub expectations: u32,
    pub attempted: u32,
    pub observed: u32,
    pub confirmed: u32,
    pub suspected: u32,
    pub informational: u32,
    pub skipped: u32,
}

/// `summary.json` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryArtifact {
    pub contract_version: u32,
    pub status: crate::exit_codes::RunStatus,
    pub counts: SummaryCounts,
    /// Attempted / expectations, rounded to 2 decimals; 1.0 for empty sets.
    pub coverage: f64,
    pub deduplicated_count: u32,
    pub incomplete_reasons: Vec<String>,
}

/// `run.status.json` body. `artifact_versions` lets readers self-validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatusArtifact {
    pub contract_version: u32,
    pub run_id: String,
    pub status: crate::exit_codes::RunStatus,
    pub exit_code: i32,
    pub coverage: f64,
    pub artifact_versions: BTreeMap<String, u32>,
    pub incomplete_reasons: Vec<String>,
}

/// A resolved configuration value with its source attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValue {
    pub value: serde_json::Value,
    pub source: ConfigSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Cli,
    Env,
    Default,
}

/// `run.meta.json` body: the effective configuration echo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetaArtifact {
    pub contract_version: u32,
    pub mode: String,
    pub deterministic: bool,
    pub effective_config: BTreeMap<String, ConfigValue>,
}

/// `project.json` body: what the scan saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectArtifact {
    pub contract_version: u32,
    pub framework: Framework,
    pub router: Router,
    pub scan_roots: Vec<String>,
    pub files_walked: u32,
    pub files_parsed: u32,
    pub by_extension: BTreeMap<String, u32>,
}

/// Result classification for a single trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceResultType {
    #[serde(rename = "ATTEMPTED")]
    Attempted,
    #[serde(rename = "OBSERVED")]
    Observed,
    #[serde(rename = "SKIPPED")]
    Skipped,
    #[serde(rename = "INCREMENTAL_SKIP")]
    IncrementalSkip,
}

/// One trace per expectation the observer touched. Phantom traces
/// (`INCREMENTAL_SKIP`) are persisted but excluded from detect counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub expectation_id: String,
    pub result_type: TraceResultType,
    pub incremental: bool,
    pub before_url: Option<String>,
    pub after_url: Option<String>,
}

/// `traces.json` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracesArtifact {
    pub contract_version: u32,
    pub traces: Vec<Trace>,
}

/// The in-memory artifact set a completed run hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactBundle {
    pub learn: LearnArtifact,
    pub observe: ObserveArtifact,
    pub findings: FindingsArtifact,
    pub summary: SummaryArtifact,
    pub run_status: RunStatusArtifact,
}

// ============================================================================
// Shared predicates
// ============================================================================

static DYNAMIC_ROUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(:[A-Za-z_][A-Za-z0-9_]*|\[[^\]/]+\])").expect("static pattern"));

/// True when a promise value targets a dynamic-entity route (`:param` or
/// `[param]` segments). Dynamic routes are out of scope and always SKIP.
#[must_use]
pub fn is_dynamic_route(value: &str) -> bool {
    DYNAMIC_ROUTE.is_match(value)
}

/// Validates the `file:line:col` form required of code-sourced findings.
static SOURCE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^:]+:\d+:\d+$").expect("static pattern"));

#[must_use]
pub fn is_valid_source_ref(source_ref: &str) -> bool {
    SOURCE_REF.is_match(source_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promise_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&PromiseKind::NetworkAction).unwrap(),
            r#""network_action""#
        );
        assert_eq!(
            serde_json::to_string(&PromiseKind::StateChange).unwrap(),
            r#""state-change""#
        );
        assert_eq!(
            serde_json::to_string(&PromiseKind::Navigate).unwrap(),
            r#""navigate""#
        );
    }

    #[test]
    fn observation_reason_wire_names() {
        assert_eq!(
            serde_json::to_string(&ObservationReason::SelectorMissing).unwrap(),
            r#""SELECTOR_MISSING""#
        );
        assert_eq!(
            serde_json::to_string(&ObservationReason::OutOfScopeDynamicRoute).unwrap(),
            r#""out_of_scope_dynamic_route""#
        );
        assert_eq!(
            serde_json::to_string(&ObservationReason::ExternalUrlSkipped).unwrap(),
            r#""EXTERNAL_URL_SKIPPED""#
        );
    }

    #[test]
    fn finding_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&FindingType::SubmitSilentFailure).unwrap(),
            r#""submit_silent_failure""#
        );
        assert_eq!(
            serde_json::to_string(&FindingType::CoverageGap).unwrap(),
            r#""coverage_gap""#
        );
    }

    #[test]
    fn silent_failure_family_membership() {
        assert!(FindingType::SilentFailure.is_silent_failure());
        assert!(FindingType::BrokenNavigationPromise.is_silent_failure());
        assert!(FindingType::MissingFeedbackSilentFailure.is_silent_failure());
        assert!(!FindingType::Observed.is_silent_failure());
        assert!(!FindingType::CoverageGap.is_silent_failure());
        assert!(!FindingType::Unproven.is_silent_failure());
    }

    #[test]
    fn dynamic_route_detection() {
        assert!(is_dynamic_route("/user/:id"));
        assert!(is_dynamic_route("/user/[id]"));
        assert!(is_dynamic_route("/posts/[slug]/comments"));
        assert!(!is_dynamic_route("/about"));
        assert!(!is_dynamic_route("/users/all"));
        assert!(!is_dynamic_route(""));
    }

    #[test]
    fn source_ref_validation() {
        assert!(is_valid_source_ref("src/App.jsx:10:4"));
        assert!(is_valid_source_ref("index.html:1:0"));
        assert!(!is_valid_source_ref("src/App.jsx:10"));
        assert!(!is_valid_source_ref("src/App.jsx"));
        assert!(!is_valid_source_ref("a:b:c"));
    }

    #[test]
    fn source_location_renders_source_ref() {
        let loc = SourceLocation {
            file: "src/pages/index.tsx".into(),
            line: 42,
            column: 7,
            pattern: "jsx-link".into(),
        };
        assert_eq!(loc.source_ref(), "src/pages/index.tsx:42:7");
        assert!(is_valid_source_ref(&loc.source_ref()));
    }

    #[test]
    fn signals_any_effect() {
        assert!(!Signals::default().any_effect());
        let s = Signals {
            navigation_changed: true,
            ..Signals::default()
        };
        assert!(s.any_effect());
        // Submission alone is not an effect; it is an attempt marker.
        let s = Signals {
            submission_triggered: true,
            network_attempt_after_submit: true,
            ..Signals::default()
        };
        assert!(!s.any_effect());
    }

    #[test]
    fn silence_detected_record_stays_small() {
        let record = SilenceDetected::submission_ambiguous();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.len() < 1024);
        assert!(!json.contains('/'));
        assert!(!json.contains('#'));
    }

    #[test]
    fn context_anchor_emptiness() {
        assert!(ContextAnchor::default().is_empty());
        let anchor = ContextAnchor {
            url: Some("http://localhost/".into()),
            ..ContextAnchor::default()
        };
        assert!(!anchor.is_empty());
    }

    #[test]
    fn severity_rank_order() {
        assert!(Severity::High.rank() < Severity::Medium.rank());
        assert!(Severity::Medium.rank() < Severity::Low.rank());
    }

    #[test]
    fn framework_budget_multipliers() {
        assert_eq!(Framework::Nextjs.budget_multiplier(), 1.2);
        assert_eq!(Framework::Remix.budget_multiplier(), 1.2);
        assert_eq!(Framework::React.budget_multiplier(), 1.1);
        assert_eq!(Framework::Vue.budget_multiplier(), 1.1);
        assert_eq!(Framework::Static.budget_multiplier(), 1.0);
    }

    #[test]
    fn skip_counters_total() {
        let counters = SkipCounters {
            dynamic: 2,
            params: 1,
            computed: 0,
            external: 3,
            parse_error: 1,
            other: 0,
        };
        assert_eq!(counters.total(), 7);
        let json = serde_json::to_value(&counters).unwrap();
        assert!(json.get("parseError").is_some(), "camelCase key expected");
    }
}
