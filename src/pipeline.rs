//! Pipeline orchestration: learn → observe → detect under one staging
//! lifecycle.
//!
//! Usage errors surface before any run directory exists. Once staging is
//! open, every failure path aborts staging and leaves the poison marker, so
//! partial runs self-identify as corrupt. Artifacts reach the run directory
//! only through `finalize`, together and atomically.

use tracing::info;

use crate::budget::Budget;
use crate::config::RunConfig;
use crate::error::VeraxError;
use crate::exit_codes::{ExitCode, RunStatus};
use crate::ids;
use crate::learn::{LearnOutcome, run_learn};
use crate::observe::browser::BrowserDriver;
use crate::observe::{ObserveOptions, ObserveOutcome, run_observe};
use crate::paths::RunPaths;
use crate::providers::Providers;
use crate::staging::{StagingArea, prune_runs};
use crate::summary::{build_run_status, build_summary};
use crate::timeout::{CancellationToken, with_timeout};
use crate::types::{
    ArtifactBundle, CONTRACT_VERSION, FindingsArtifact, ObserveArtifact, RunMetaArtifact,
    SummaryArtifact, TracesArtifact,
};
use crate::{artifact::ArtifactId, detect::run_detect};

/// Everything a caller needs after a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub status: RunStatus,
    pub exit_code: ExitCode,
    pub bundle: ArtifactBundle,
}

/// Run the full pipeline with default observe options.
pub fn run(
    config: &RunConfig,
    driver: &mut dyn BrowserDriver,
    cancel: &CancellationToken,
) -> Result<RunReport, VeraxError> {
    run_with_options(config, driver, cancel, &ObserveOptions::default())
}

/// Run the full pipeline.
pub fn run_with_options(
    config: &RunConfig,
    driver: &mut dyn BrowserDriver,
    cancel: &CancellationToken,
    options: &ObserveOptions,
) -> Result<RunReport, VeraxError> {
    let providers = Providers::init(config.deterministic, config.test_time.as_deref());

    // Learn runs before any run directory exists; its usage errors produce
    // no artifacts at all.
    let learn_outcome = run_learn(config)?;

    let budget = Budget::compute(
        config.mode,
        learn_outcome.artifact.expectations.len(),
        learn_outcome.project.files_walked as usize,
        learn_outcome.artifact.framework,
        config.budget_overrides,
    );

    let run_id = ids::run_id(&providers.clock.now_iso(), &config.run_seed());
    let run_paths = RunPaths::new(config.out_dir.clone(), run_id.clone());
    let staging = StagingArea::begin(run_paths)?;

    match execute_phases(
        config,
        &learn_outcome,
        driver,
        &providers,
        &budget,
        &staging,
        cancel,
        options,
    ) {
        Ok((observe_outcome, findings, summary)) => {
            let run_status = build_run_status(&run_id, &summary);
            let meta = RunMetaArtifact {
                contract_version: CONTRACT_VERSION,
                mode: config.mode.as_str().to_string(),
                deterministic: config.deterministic,
                effective_config: config.effective_config(),
            };

            // Cancellation is honored before every artifact write.
            if let Err(e) = cancel.check() {
                staging.abort();
                return Err(e);
            }

            let write_result = (|| -> Result<(), VeraxError> {
                staging.write_artifact(ArtifactId::Learn, &learn_outcome.artifact)?;
                staging.write_artifact(ArtifactId::Project, &learn_outcome.project)?;
                staging.write_artifact(ArtifactId::Observe, &observe_outcome.artifact)?;
                staging.write_artifact(ArtifactId::Traces, &observe_outcome.traces)?;
                staging.write_artifact(ArtifactId::Findings, &findings)?;
                staging.write_artifact(ArtifactId::Summary, &summary)?;
                staging.write_artifact(ArtifactId::RunStatus, &run_status)?;
                staging.write_artifact(ArtifactId::RunMeta, &meta)?;
                Ok(())
            })();
            if let Err(e) = write_result {
                staging.abort();
                return Err(e);
            }

            staging.finalize()?;
            prune_runs(config.out_dir.as_path(), config.retain, &[run_id.as_str()])?;

            let status = summary.status;
            info!(run_id = %run_id, status = status.as_str(), "run complete");
            Ok(RunReport {
                run_id,
                status,
                exit_code: status.exit_code(),
                bundle: ArtifactBundle {
                    learn: learn_outcome.artifact,
                    observe: observe_outcome.artifact,
                    findings,
                    summary,
                    run_status,
                },
            })
        }
        Err(e) => {
            // Poison marker stays behind; only staging is rolled back.
            staging.abort();
            Err(e)
        }
    }
}

type PhaseOutputs = (ObserveOutcome, FindingsArtifact, SummaryArtifact);

#[allow(clippy::too_many_arguments)]
fn execute_phases(
    config: &RunConfig,
    learn_outcome: &LearnOutcome,
    driver: &mut dyn BrowserDriver,
    providers: &Providers,
    budget: &Budget,
    staging: &StagingArea,
    cancel: &CancellationToken,
    options: &ObserveOptions,
) -> Result<PhaseOutputs, VeraxError> {
    let learn = &learn_outcome.artifact;

    // Empty-by-permission runs skip the browser entirely and produce a
    // SKIP-only findings set.
    let observe_outcome = if learn.expectations.is_empty() {
        ObserveOutcome {
            artifact: ObserveArtifact {
                contract_version: CONTRACT_VERSION,
                base_url: config.url.as_str().to_string(),
                observations: Vec::new(),
                evidence_index: Vec::new(),
                runtime_expectations: Vec::new(),
                skipped: Vec::new(),
                pages_visited: 0,
            },
            traces: TracesArtifact {
                contract_version: CONTRACT_VERSION,
                traces: Vec::new(),
            },
            incomplete_reasons: Vec::new(),
        }
    } else {
        run_observe(
            config, learn, driver, providers, budget, staging, cancel, options,
        )?
    };

    cancel.check()?;

    let phantom = observe_outcome.phantom_ids();
    let findings = with_timeout(&providers.clock, budget.detect_max_ms, "detect", || {
        run_detect(learn, &observe_outcome.artifact, &phantom)
    })?;

    let summary = build_summary(config, learn, &observe_outcome, &findings);
    Ok((observe_outcome, findings, summary))
}
