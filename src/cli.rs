//! Thin CLI glue over the library pipeline.
//!
//! All logic lives in the library; this module parses arguments, resolves
//! configuration, wires a browser driver, and maps outcomes to exit codes.
//! The external product CLI satisfies the same `RunInputs` surface.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::budget::RunMode;
use crate::config::{RunConfig, RunInputs};
use crate::error::VeraxError;
use crate::exit_codes::ExitCode;
use crate::observe::browser::{BrowserDriver, ScriptedBrowser, SiteSpec};
use crate::pipeline;
use crate::report;
use crate::timeout::CancellationToken;
use crate::types::Framework;

#[derive(Parser)]
#[command(
    name = "verax",
    version,
    about = "Silent-failure detector for web applications"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose diagnostics on stderr
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the learn → observe → detect pipeline against a URL
    Run(RunArgs),
}

#[derive(ValueEnum, Clone, Copy)]
enum ModeArg {
    Ci,
    Default,
    Test,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Ci => RunMode::Ci,
            ModeArg::Default => RunMode::Default,
            ModeArg::Test => RunMode::Test,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum FrameworkArg {
    Nextjs,
    Remix,
    React,
    Vue,
    Svelte,
    Static,
}

impl From<FrameworkArg> for Framework {
    fn from(framework: FrameworkArg) -> Self {
        match framework {
            FrameworkArg::Nextjs => Framework::Nextjs,
            FrameworkArg::Remix => Framework::Remix,
            FrameworkArg::React => Framework::React,
            FrameworkArg::Vue => Framework::Vue,
            FrameworkArg::Svelte => Framework::Svelte,
            FrameworkArg::Static => Framework::Static,
        }
    }
}

#[derive(Args)]
struct RunArgs {
    /// Target URL of the running application
    #[arg(long)]
    url: String,

    /// Root of the application's source tree
    #[arg(long = "source-root")]
    source_root: Utf8PathBuf,

    /// Budget profile
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Emit a single JSON object on stdout and nothing else
    #[arg(long)]
    json: bool,

    /// Preview up to 10 expectations before observing
    #[arg(long = "explain-expectations")]
    explain_expectations: bool,

    /// Coverage threshold below which the run is INCOMPLETE
    #[arg(long = "min-coverage")]
    min_coverage: Option<f64>,

    /// Substitute the computed total budget
    #[arg(long = "global-timeout-ms")]
    global_timeout_ms: Option<u64>,

    #[arg(long = "interaction-timeout-ms")]
    interaction_timeout_ms: Option<u64>,

    #[arg(long = "navigation-timeout-ms")]
    navigation_timeout_ms: Option<u64>,

    /// Disable runtime expectation discovery
    #[arg(long = "no-micro-crawl")]
    no_micro_crawl: bool,

    /// Number of runs to keep after pruning
    #[arg(long)]
    retain: Option<usize>,

    /// Force deterministic mode
    #[arg(long)]
    deterministic: bool,

    /// Output directory (default .verax)
    #[arg(long = "out-dir")]
    out_dir: Option<Utf8PathBuf>,

    /// Framework hint overriding detection
    #[arg(long, value_enum)]
    framework: Option<FrameworkArg>,

    /// Scan-root override
    #[arg(long = "scan-root")]
    scan_root: Option<Utf8PathBuf>,

    /// Permit a scan that yields zero expectations
    #[arg(long = "allow-empty-learn")]
    allow_empty_learn: bool,

    /// Drive a scripted site map instead of a real browser (test harness)
    #[arg(long = "scripted-site", value_name = "SITE_JSON")]
    scripted_site: Option<Utf8PathBuf>,
}

/// CLI entry point. Handles all output; callers only map the exit code.
pub fn run() -> Result<(), ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return Err(ExitCode::USAGE_ERROR);
        }
        Err(e) => {
            // --help and --version land here.
            let _ = e.print();
            return Ok(());
        }
    };

    let _ = crate::logging::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => run_command(args),
    }
}

fn run_command(args: RunArgs) -> Result<(), ExitCode> {
    let scripted_site = args.scripted_site.clone();
    let json = args.json;

    let inputs = RunInputs {
        url: Some(args.url),
        source_root: Some(args.source_root),
        out_dir: args.out_dir,
        mode: args.mode.map(RunMode::from),
        json: args.json,
        explain_expectations: args.explain_expectations,
        min_coverage: args.min_coverage,
        global_timeout_ms: args.global_timeout_ms,
        interaction_timeout_ms: args.interaction_timeout_ms,
        navigation_timeout_ms: args.navigation_timeout_ms,
        no_micro_crawl: args.no_micro_crawl,
        retain: args.retain,
        deterministic: args.deterministic,
        framework_hint: args.framework.map(Framework::from),
        scan_root_override: args.scan_root,
        allow_empty_learn: args.allow_empty_learn,
    };

    let config = match RunConfig::resolve(inputs) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("verax: {e}");
            return Err(e.to_exit_code());
        }
    };

    let mut driver = match build_driver(scripted_site) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("verax: {e}");
            return Err(e.to_exit_code());
        }
    };

    let cancel = CancellationToken::new();
    match pipeline::run(&config, driver.as_mut(), &cancel) {
        Ok(run_report) => {
            if json {
                match report::render_json(
                    &run_report.bundle.run_status,
                    &run_report.bundle.summary,
                    &run_report.bundle.findings,
                ) {
                    Ok(body) => println!("{body}"),
                    Err(e) => {
                        eprintln!("verax: {e}");
                        return Err(e.to_exit_code());
                    }
                }
            } else {
                print!(
                    "{}",
                    report::render_human(
                        &run_report.bundle.summary,
                        &run_report.bundle.findings,
                        &run_report.bundle.observe,
                    )
                );
            }
            if run_report.exit_code == ExitCode::SUCCESS {
                Ok(())
            } else {
                Err(run_report.exit_code)
            }
        }
        Err(e) => {
            eprintln!("verax: {e}");
            Err(e.to_exit_code())
        }
    }
}

/// Wire the browser capability. The scripted driver serves harnesses and
/// CI fixtures; real-browser integrations inject through the library API.
fn build_driver(
    scripted_site: Option<Utf8PathBuf>,
) -> Result<Box<dyn BrowserDriver>, VeraxError> {
    match scripted_site {
        Some(path) => {
            let content = std::fs::read_to_string(path.as_std_path()).map_err(|e| {
                VeraxError::Browser(crate::error::BrowserError::Unavailable {
                    reason: format!("cannot read site spec {path}: {e}"),
                })
            })?;
            let spec: SiteSpec = serde_json::from_str(&content).map_err(|e| {
                VeraxError::Browser(crate::error::BrowserError::Unavailable {
                    reason: format!("invalid site spec {path}: {e}"),
                })
            })?;
            Ok(Box::new(ScriptedBrowser::from_spec(spec)))
        }
        None => Err(VeraxError::Browser(
            crate::error::BrowserError::Unavailable {
                reason: "no browser driver available in this build; pass --scripted-site or \
                         inject a driver through the library API"
                    .to_string(),
            },
        )),
    }
}
