//! Structured logging setup.
//!
//! All diagnostics go through `tracing` to stderr; stdout is reserved for
//! the run output channels, so JSON mode never sees log chatter on stdout.

use tracing::{Level, span};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Verbose switches the default filter from `verax=info` to `verax=debug`;
/// `RUST_LOG` always wins when set.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("verax=debug,info")
            } else {
                EnvFilter::try_new("verax=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

/// Span wrapping one phase execution.
pub fn phase_span(run_id: &str, phase: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "phase",
        run_id = %run_id,
        phase = %phase,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_tolerant_of_double_init() {
        // Second init fails because a global subscriber exists; both
        // outcomes are acceptable in test processes.
        let first = init_tracing(false);
        let second = init_tracing(true);
        assert!(first.is_ok() || second.is_err());
    }

    #[test]
    fn phase_span_carries_name() {
        let span = phase_span("run-1", "learn");
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "phase");
        }
    }
}
