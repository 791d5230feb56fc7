//! Observe phase: browser-driven attempt of every expectation.
//!
//! Single-threaded cooperative driver: one browser, one page, one
//! expectation at a time, processed in canonical sort order. The loop checks
//! the cancellation token at the top of every iteration and suspends on
//! exactly four operation families — launch/close, navigation, settle, and
//! evidence writes — each wrapped by the budget layer.

pub mod browser;
pub mod evidence;
pub mod frontier;

use std::collections::BTreeSet;

use tracing::{debug, info, warn};
use url::Url;

use crate::budget::Budget;
use crate::canonical::{sort_expectations, sort_observations};
use crate::config::RunConfig;
use crate::error::{BrowserError, ObserveError, VeraxError};
use crate::ids;
use crate::providers::Providers;
use crate::staging::StagingArea;
use crate::timeout::{CancellationToken, Deadline, with_timeout};
use crate::types::{
    CONTRACT_VERSION, ContextAnchor, Expectation, ExpectationKind, LearnArtifact, Observation,
    ObservationReason, ObserveArtifact, PromiseKind, PromiseSpec, Signals, SilenceDetected,
    SkipEntry, SourceLocation, SourceType, Trace, TraceResultType, TracesArtifact,
    is_dynamic_route,
};

use browser::{BrowserDriver, DomSnapshot};
use evidence::EvidenceRecorder;
use frontier::Frontier;

/// DOM-diff noise thresholds: changes below both are not "meaningful".
const NOISE_NODE_DELTA: i64 = 3;
const NOISE_TEXT_DELTA: i64 = 24;

/// Cap on runtime expectations emitted by the micro-crawl.
const MAX_RUNTIME_EXPECTATIONS: usize = 20;

/// Confidence seed assigned to runtime discoveries.
const RUNTIME_CONFIDENCE: f64 = 0.5;

/// Bound on browser close during cancellation or teardown.
const CLOSE_BUDGET_MS: u64 = 2_000;

/// Per-run observation options derived from configuration.
#[derive(Debug, Clone, Default)]
pub struct ObserveOptions {
    /// Expectation IDs whose static fingerprint matched a prior run;
    /// they become phantom traces instead of live attempts.
    pub incremental_fingerprints: BTreeSet<String>,
}

/// Output of the observe phase.
#[derive(Debug, Clone)]
pub struct ObserveOutcome {
    pub artifact: ObserveArtifact,
    pub traces: TracesArtifact,
    pub incomplete_reasons: Vec<String>,
}

impl ObserveOutcome {
    /// Expectation IDs excluded from detect counts (phantom traces).
    #[must_use]
    pub fn phantom_ids(&self) -> BTreeSet<String> {
        self.traces
            .traces
            .iter()
            .filter(|t| t.result_type == TraceResultType::IncrementalSkip)
            .map(|t| t.expectation_id.clone())
            .collect()
    }
}

/// Pre-run gate: categorised expectation counts, logged unless JSON mode.
pub fn expectation_summary(learn: &LearnArtifact, explain: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut by_kind: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for e in &learn.expectations {
        *by_kind.entry(e.kind.as_str()).or_insert(0) += 1;
    }
    lines.push(format!(
        "{} expectations from code ({} skipped during extraction)",
        learn.expectations.len(),
        learn.skipped.total()
    ));
    for (kind, count) in by_kind {
        lines.push(format!("  {kind}: {count}"));
    }
    if explain {
        for e in learn.expectations.iter().take(10) {
            lines.push(format!(
                "  {} {} -> {} ({})",
                e.kind.as_str(),
                e.promise.kind.as_str(),
                e.promise.value,
                e.source_ref.as_deref().unwrap_or("runtime")
            ));
        }
    }
    lines
}

/// Run the observe phase.
#[allow(clippy::too_many_arguments)]
pub fn run_observe(
    config: &RunConfig,
    learn: &LearnArtifact,
    driver: &mut dyn BrowserDriver,
    providers: &Providers,
    budget: &Budget,
    staging: &StagingArea,
    cancel: &CancellationToken,
    options: &ObserveOptions,
) -> Result<ObserveOutcome, VeraxError> {
    if learn.expectations.is_empty() {
        // The gate fires before any browser resource is touched.
        return Err(ObserveError::EmptyExpectationSet.into());
    }

    if !config.json {
        for line in expectation_summary(learn, config.explain_expectations) {
            info!("{line}");
        }
    }

    let clock = &providers.clock;
    let global_deadline = Deadline::after(clock, budget.total_max_ms);
    let phase_deadline = Deadline::after(clock, budget.observe_max_ms);

    with_timeout(clock, budget.navigation_timeout_ms, "browser-launch", || {
        driver.launch().map_err(VeraxError::Browser)
    })?;

    let base = config.url.clone();
    with_timeout(clock, budget.navigation_timeout_ms, "navigation", || {
        driver.navigate(base.as_str()).map_err(VeraxError::Browser)
    })?;

    // Bounded frontier traversal: discover same-origin pages for the
    // micro-crawl while recording external/dynamic skips.
    let mut frontier = Frontier::new(&base, config.max_pages, config.max_depth, config.frontier_cap);
    let mut discovered_links: Vec<String> = Vec::new();
    while let Some((page_url, depth)) = frontier.next() {
        cancel.check()?;
        if clock.now_ms() > 0 && phase_deadline.expired(clock) {
            break;
        }
        let navigated = with_timeout(clock, budget.navigation_timeout_ms, "navigation", || {
            match driver.navigate(&page_url) {
                Ok(state) => Ok(Some(state)),
                Err(BrowserError::NavigationFailed { .. }) => Ok(None),
                Err(e) => Err(VeraxError::Browser(e)),
            }
        })?;
        if navigated.is_none() {
            continue;
        }
        let links = driver.extract_links().map_err(VeraxError::Browser)?;
        for link in links {
            discovered_links.push(link.clone());
            frontier.offer(&base, &link, depth + 1);
        }
    }
    let pages_visited = frontier.visited_count() as u32;
    let mut skips = frontier.into_skips();

    // Runtime discoveries: same-origin targets absent from the static set.
    let runtime_expectations = if config.micro_crawl {
        runtime_expectations_from_links(&base, learn, &discovered_links)
    } else {
        Vec::new()
    };

    let mut observations: Vec<Observation> = Vec::new();
    let mut evidence_index = Vec::new();
    let mut traces: Vec<Trace> = Vec::new();
    let mut incomplete_reasons: Vec<String> = Vec::new();
    let mut attempted_count = 0usize;
    let mut attemptable_count = 0usize;

    let mut ordered: Vec<&Expectation> = learn.expectations.iter().collect();
    let runtime_sorted = {
        let mut list = runtime_expectations.clone();
        sort_expectations(&mut list);
        list
    };
    ordered.extend(runtime_sorted.iter());

    let mut phase_exhausted = false;
    for expectation in ordered {
        cancel.check()?;

        if global_deadline.expired(clock) && clock.now_ms() > 0 {
            // Global watchdog is fatal; the pipeline poisons the run.
            close_browser(driver, clock);
            return Err(VeraxError::GlobalTimeout {
                budget_ms: budget.total_max_ms,
            });
        }

        if phase_exhausted || (phase_deadline.expired(clock) && clock.now_ms() > 0) {
            phase_exhausted = true;
            attemptable_count += 1;
            observations.push(unattempted(
                expectation,
                ObservationReason::ObservationTimeout,
            ));
            traces.push(trace_for(expectation, TraceResultType::Skipped, false, None, None));
            continue;
        }

        if options.incremental_fingerprints.contains(&expectation.id) {
            traces.push(Trace {
                expectation_id: expectation.id.clone(),
                result_type: TraceResultType::IncrementalSkip,
                incremental: true,
                before_url: Some(base.as_str().to_string()),
                after_url: Some(base.as_str().to_string()),
            });
            continue;
        }

        if is_dynamic_route(&expectation.promise.value) {
            skips.push(SkipEntry {
                reason: ObservationReason::OutOfScopeDynamicRoute,
                value: expectation.promise.value.clone(),
                expectation_id: Some(expectation.id.clone()),
            });
            traces.push(trace_for(expectation, TraceResultType::Skipped, false, None, None));
            continue;
        }

        attemptable_count += 1;
        match attempt_expectation(expectation, driver, &base, clock, budget, staging) {
            Ok(AttemptResult {
                observation,
                evidence,
            }) => {
                if observation.attempted {
                    attempted_count += 1;
                }
                let result_type = if observation.observed {
                    TraceResultType::Observed
                } else if observation.attempted {
                    TraceResultType::Attempted
                } else {
                    TraceResultType::Skipped
                };
                traces.push(trace_for(
                    expectation,
                    result_type,
                    false,
                    observation.before.url.clone(),
                    observation.after.url.clone(),
                ));
                observations.push(observation);
                evidence_index.extend(evidence);
            }
            Err(VeraxError::PhaseTimeout { .. }) => {
                // Per-expectation overrun is recorded, never fatal.
                let mut observation =
                    unattempted(expectation, ObservationReason::ObservationTimeout);
                observation.attempted = true;
                observations.push(observation);
                traces.push(trace_for(
                    expectation,
                    TraceResultType::Attempted,
                    false,
                    None,
                    None,
                ));
            }
            Err(VeraxError::Browser(BrowserError::PageCrashed { reason })) => {
                warn!(expectation = %expectation.id, %reason, "browser crashed mid-run");
                close_browser(driver, clock);
                return Err(VeraxError::Browser(BrowserError::PageCrashed { reason }));
            }
            Err(e) => return Err(e),
        }
    }

    if phase_exhausted {
        incomplete_reasons.push(format!(
            "observe phase budget of {} ms exhausted",
            budget.observe_max_ms
        ));
    }
    if attempted_count == 0 && attemptable_count > 0 {
        incomplete_reasons.push("no expectation attempts completed".to_string());
    }

    cancel.check()?;
    close_browser(driver, clock);

    sort_observations(&mut observations);
    evidence_index.sort_by(|a, b| a.id.cmp(&b.id));

    debug!(
        observations = observations.len(),
        runtime = runtime_sorted.len(),
        pages_visited,
        "observe complete"
    );

    Ok(ObserveOutcome {
        artifact: ObserveArtifact {
            contract_version: CONTRACT_VERSION,
            base_url: base.as_str().to_string(),
            observations,
            evidence_index,
            runtime_expectations: runtime_sorted,
            skipped: skips,
            pages_visited,
        },
        traces: TracesArtifact {
            contract_version: CONTRACT_VERSION,
            traces,
        },
        incomplete_reasons,
    })
}

fn close_browser(driver: &mut dyn BrowserDriver, clock: &crate::providers::Clock) {
    let closed = with_timeout(clock, CLOSE_BUDGET_MS, "browser-close", || {
        driver.close().map_err(VeraxError::Browser)
    });
    if let Err(e) = closed {
        warn!(error = %e, "browser close failed");
    }
}

fn trace_for(
    expectation: &Expectation,
    result_type: TraceResultType,
    incremental: bool,
    before_url: Option<String>,
    after_url: Option<String>,
) -> Trace {
    Trace {
        expectation_id: expectation.id.clone(),
        result_type,
        incremental,
        before_url,
        after_url,
    }
}

fn unattempted(expectation: &Expectation, reason: ObservationReason) -> Observation {
    Observation {
        expectation_id: Some(expectation.id.clone()),
        attempted: false,
        observed: false,
        signals: Signals::default(),
        evidence: Vec::new(),
        before: ContextAnchor::default(),
        after: ContextAnchor::default(),
        reason: Some(reason),
        silence_detected: None,
    }
}

/// Build runtime expectations from discovered links, in stable order.
fn runtime_expectations_from_links(
    base: &Url,
    learn: &LearnArtifact,
    links: &[String],
) -> Vec<Expectation> {
    let known: BTreeSet<&str> = learn
        .expectations
        .iter()
        .map(|e| e.promise.value.as_str())
        .collect();

    let mut values: Vec<String> = Vec::new();
    for link in links {
        let Ok(resolved) = base.join(link) else {
            continue;
        };
        if resolved.host_str() != base.host_str() {
            continue;
        }
        let path = resolved.path().to_string();
        if is_dynamic_route(&path) || known.contains(path.as_str()) {
            continue;
        }
        values.push(path);
    }
    values.sort();
    values.dedup();
    values.truncate(MAX_RUNTIME_EXPECTATIONS);

    values
        .into_iter()
        .map(|value| {
            let source = SourceLocation {
                file: String::new(),
                line: 0,
                column: 0,
                pattern: "micro-crawl".to_string(),
            };
            let promise = PromiseSpec {
                kind: PromiseKind::Navigate,
                value,
            };
            let id = ids::expectation_id("navigation", &source, &promise);
            Expectation {
                id,
                kind: ExpectationKind::Navigation,
                promise,
                source,
                source_type: SourceType::Runtime,
                source_ref: None,
                confidence: RUNTIME_CONFIDENCE,
            }
        })
        .collect()
}

struct AttemptResult {
    observation: Observation,
    evidence: Vec<crate::types::EvidenceRecord>,
}

/// The per-expectation attempt protocol.
fn attempt_expectation(
    expectation: &Expectation,
    driver: &mut dyn BrowserDriver,
    base: &Url,
    clock: &crate::providers::Clock,
    budget: &Budget,
    staging: &StagingArea,
) -> Result<AttemptResult, VeraxError> {
    // Context reset: every attempt starts from a fresh load of the base
    // page, so effects of the previous attempt cannot leak into signals.
    with_timeout(clock, budget.navigation_timeout_ms, "navigation", || {
        driver.navigate(base.as_str()).map_err(VeraxError::Browser)
    })?;

    let before_state = driver.page_state().map_err(VeraxError::Browser)?;
    let before_dom = driver.dom_snapshot().map_err(VeraxError::Browser)?;

    let mut recorder = EvidenceRecorder::new(staging, &expectation.id);
    let before_shot = driver.screenshot().map_err(VeraxError::Browser)?;
    let (_, before_path) = with_timeout(clock, budget.per_expectation_max_ms, "evidence-write", || {
        recorder.screenshot(&before_shot)
    })?;

    let before = ContextAnchor {
        url: Some(before_state.url.clone()),
        screenshot: Some(before_path),
        dom_signature: Some(before_dom.signature.clone()),
    };

    // Drain stale logs so signals only reflect this attempt.
    driver.drain_network().map_err(VeraxError::Browser)?;
    driver.drain_console().map_err(VeraxError::Browser)?;
    driver.aria_live_updates().map_err(VeraxError::Browser)?;

    let action = match resolve_action(expectation, driver)? {
        Some(action) => action,
        None => {
            let mut observation = unattempted(expectation, ObservationReason::SelectorMissing);
            observation.before = before;
            let (ids, records) = recorder.finish();
            observation.evidence = ids;
            return Ok(AttemptResult {
                observation,
                evidence: records,
            });
        }
    };

    let action_result = with_timeout(clock, budget.per_expectation_max_ms, "interaction", || {
        Ok(perform_action(&action, driver, base))
    })?;

    let (attempted, timed_out, blocked) = match action_result {
        Ok(()) => (true, false, false),
        Err(BrowserError::Timeout { .. }) => (true, true, false),
        Err(BrowserError::ActionBlocked { .. }) => (true, false, true),
        Err(BrowserError::NavigationFailed { .. }) => (true, false, false),
        Err(BrowserError::SelectorMissing { .. }) => (false, false, false),
        Err(e @ BrowserError::PageCrashed { .. }) => return Err(VeraxError::Browser(e)),
        Err(e) => return Err(VeraxError::Browser(e)),
    };

    // Bounded settle window; expiry proceeds with whatever was sampled.
    let settle = match with_timeout(clock, budget.interaction_timeout_ms, "settle", || {
        driver
            .settle(budget.interaction_timeout_ms)
            .map_err(VeraxError::Browser)
    }) {
        Ok(report) => report,
        Err(VeraxError::PhaseTimeout { .. }) => browser::SettleReport::default(),
        Err(e) => return Err(e),
    };

    let after_state = driver.page_state().map_err(VeraxError::Browser)?;
    let after_dom = driver.dom_snapshot().map_err(VeraxError::Browser)?;
    let after_shot = driver.screenshot().map_err(VeraxError::Browser)?;
    let (_, after_path) = with_timeout(clock, budget.per_expectation_max_ms, "evidence-write", || {
        recorder.screenshot(&after_shot)
    })?;

    let network = driver.drain_network().map_err(VeraxError::Browser)?;
    let console = driver.drain_console().map_err(VeraxError::Browser)?;
    let aria = driver.aria_live_updates().map_err(VeraxError::Browser)?;
    let feedback = driver.feedback_visible().map_err(VeraxError::Browser)?;

    let signals = derive_signals(
        expectation,
        &before_state,
        &after_state,
        &before_dom,
        &after_dom,
        &network,
        &aria,
        feedback,
        settle,
        attempted && !timed_out,
    );

    with_timeout(clock, budget.per_expectation_max_ms, "evidence-write", || {
        recorder.dom_diff(&before_dom, &after_dom)?;
        recorder.network(&network)?;
        recorder.console(&console)?;
        Ok(())
    })?;

    let after = ContextAnchor {
        url: Some(after_state.url.clone()),
        screenshot: Some(after_path),
        dom_signature: Some(after_dom.signature.clone()),
    };

    let observed = signals.any_effect();
    let reason = if timed_out {
        Some(ObservationReason::ObservationTimeout)
    } else if blocked {
        Some(ObservationReason::ActionBlocked)
    } else {
        None
    };

    // Ambiguous-submission classifier: an interaction fired a submission
    // path with no associated effect at all.
    let silence_detected = if expectation.kind == ExpectationKind::Interaction
        && signals.submission_triggered
        && !signals.network_attempt_after_submit
        && !observed
    {
        Some(SilenceDetected::submission_ambiguous())
    } else {
        None
    };

    let (evidence_ids, evidence_records) = recorder.finish();
    Ok(AttemptResult {
        observation: Observation {
            expectation_id: Some(expectation.id.clone()),
            attempted,
            observed,
            signals,
            evidence: evidence_ids,
            before,
            after,
            reason,
            silence_detected,
        },
        evidence: evidence_records,
    })
}

/// The resolved action for one expectation.
enum Action {
    ClickSelector(String),
    SubmitSelector(String),
    NavigateTo(String),
}

/// Resolve a DOM selector or URL target; `None` means SELECTOR_MISSING.
fn resolve_action(
    expectation: &Expectation,
    driver: &mut dyn BrowserDriver,
) -> Result<Option<Action>, VeraxError> {
    let value = expectation.promise.value.as_str();
    let exists = |driver: &mut dyn BrowserDriver, selector: &str| -> Result<bool, VeraxError> {
        driver.selector_exists(selector).map_err(VeraxError::Browser)
    };

    let action = match expectation.promise.kind {
        PromiseKind::Navigate => {
            let selector = format!("a[href=\"{value}\"]");
            if exists(driver, &selector)? {
                Some(Action::ClickSelector(selector))
            } else {
                // Route promises have no anchor; the attempt is the
                // navigation itself.
                Some(Action::NavigateTo(value.to_string()))
            }
        }
        PromiseKind::Click => {
            if exists(driver, value)? {
                Some(Action::ClickSelector(value.to_string()))
            } else {
                None
            }
        }
        PromiseKind::Submit => {
            let selector = format!("form[action=\"{value}\"]");
            if exists(driver, &selector)? {
                Some(Action::SubmitSelector(selector))
            } else {
                None
            }
        }
        PromiseKind::NetworkAction => {
            let form = format!("form[action=\"{value}\"]");
            let anchor = format!("[data-action=\"{value}\"]");
            if exists(driver, &form)? {
                Some(Action::SubmitSelector(form))
            } else if exists(driver, &anchor)? {
                Some(Action::ClickSelector(anchor))
            } else {
                None
            }
        }
        PromiseKind::StateChange => {
            let selector = format!("#{value}");
            if exists(driver, &selector)? {
                Some(Action::ClickSelector(selector))
            } else {
                None
            }
        }
        PromiseKind::Validation => {
            let selector = format!("[name=\"{value}\"]");
            if exists(driver, &selector)? {
                Some(Action::SubmitSelector(selector))
            } else {
                None
            }
        }
    };
    Ok(action)
}

fn perform_action(
    action: &Action,
    driver: &mut dyn BrowserDriver,
    base: &Url,
) -> Result<(), BrowserError> {
    match action {
        Action::ClickSelector(selector) => driver.click(selector),
        Action::SubmitSelector(selector) => driver.submit(selector),
        Action::NavigateTo(value) => {
            let target = base
                .join(value)
                .map_err(|e| BrowserError::NavigationFailed {
                    url: value.clone(),
                    reason: e.to_string(),
                })?;
            driver.navigate(target.as_str()).map(|_| ())
        }
    }
}

/// Derive the typed signal record from the before/after pair and logs.
#[allow(clippy::too_many_arguments)]
fn derive_signals(
    expectation: &Expectation,
    before_state: &browser::PageState,
    after_state: &browser::PageState,
    before_dom: &DomSnapshot,
    after_dom: &DomSnapshot,
    network: &[browser::NetworkRecord],
    aria: &[String],
    feedback: bool,
    settle: browser::SettleReport,
    action_completed: bool,
) -> Signals {
    let node_delta = (i64::from(after_dom.node_count) - i64::from(before_dom.node_count)).abs();
    let text_delta = (i64::from(after_dom.text_length) - i64::from(before_dom.text_length)).abs();
    let dom_diff_present = before_dom.signature != after_dom.signature;
    let meaningful_dom_change =
        dom_diff_present && (node_delta >= NOISE_NODE_DELTA || text_delta >= NOISE_TEXT_DELTA);

    let is_submit_like = matches!(
        expectation.promise.kind,
        PromiseKind::Submit | PromiseKind::Click | PromiseKind::Validation
    );

    Signals {
        navigation_changed: before_state.url != after_state.url,
        route_changed: before_state.route != after_state.route,
        meaningful_ui_change: meaningful_dom_change || feedback,
        meaningful_dom_change,
        dom_diff_present,
        feedback_seen: feedback,
        aria_live_updated: !aria.is_empty(),
        submission_triggered: is_submit_like && action_completed,
        network_attempt_after_submit: !network.is_empty(),
        delayed_acknowledgment: settle.late_activity,
        loading_indicator_after: after_state.loading,
    }
}
