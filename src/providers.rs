//! Injected time and sequence providers.
//!
//! No component other than these providers may read wall-clock time or
//! randomness. In deterministic mode the clock is a fixed ISO source and the
//! sequence is a plain counter, so every ID and every persisted value is a
//! pure function of the inputs. Both carry an explicit `init`/`reset`
//! lifecycle and are handed to the three phases by injection — there are no
//! implicit singletons.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{SecondsFormat, Utc};

/// Clock behaviour selected at provider initialization.
#[derive(Debug)]
enum ClockMode {
    /// Real wall clock (non-deterministic runs only).
    Wall,
    /// Fixed ISO instant; `now_ms` never advances on its own.
    Fixed { iso: String },
}

/// The single time source for the whole run.
#[derive(Debug)]
pub struct Clock {
    mode: ClockMode,
    /// Manual offset applied on top of the fixed instant. Tests use this to
    /// script budget expiry; production code never calls `advance`.
    offset_ms: AtomicU64,
}

impl Clock {
    #[must_use]
    pub fn wall() -> Self {
        Self {
            mode: ClockMode::Wall,
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Fixed clock for deterministic mode, seeded from `VERAX_TEST_TIME`.
    #[must_use]
    pub fn fixed(iso: impl Into<String>) -> Self {
        Self {
            mode: ClockMode::Fixed { iso: iso.into() },
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Current instant as an RFC3339 UTC string.
    #[must_use]
    pub fn now_iso(&self) -> String {
        match &self.mode {
            ClockMode::Wall => Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            ClockMode::Fixed { iso } => iso.clone(),
        }
    }

    /// Milliseconds for budget arithmetic. The fixed clock only moves when a
    /// test advances it, so deterministic runs never hit spurious timeouts.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        let offset = self.offset_ms.load(Ordering::Relaxed);
        match &self.mode {
            ClockMode::Wall => Utc::now().timestamp_millis().max(0) as u64 + offset,
            ClockMode::Fixed { .. } => offset,
        }
    }

    /// True when persisted artifacts must not carry wall-clock timestamps.
    #[must_use]
    pub const fn is_deterministic(&self) -> bool {
        matches!(self.mode, ClockMode::Fixed { .. })
    }

    /// Advance the clock manually. Test seam for scripting timeouts.
    pub fn advance(&self, ms: u64) {
        self.offset_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Reset manual offset back to the seeded instant.
    pub fn reset(&self) {
        self.offset_ms.store(0, Ordering::Relaxed);
    }
}

/// Monotonic counter standing in for every randomness need.
#[derive(Debug, Default)]
pub struct IdSequence {
    counter: AtomicU64,
}

impl IdSequence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next value, starting at 0.
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }
}

/// Provider bundle injected into the three phases.
#[derive(Debug)]
pub struct Providers {
    pub clock: Clock,
    pub seq: IdSequence,
}

impl Providers {
    /// Initialize providers from the resolved determinism configuration.
    #[must_use]
    pub fn init(deterministic: bool, test_time: Option<&str>) -> Self {
        const DEFAULT_TEST_TIME: &str = "2000-01-01T00:00:00Z";
        let clock = if deterministic {
            Clock::fixed(test_time.unwrap_or(DEFAULT_TEST_TIME))
        } else {
            Clock::wall()
        };
        Self {
            clock,
            seq: IdSequence::new(),
        }
    }

    /// Reset both providers to their initial state.
    pub fn reset(&self) {
        self.clock.reset();
        self.seq.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_returns_seeded_iso() {
        let clock = Clock::fixed("2026-01-20T00:00:00Z");
        assert_eq!(clock.now_iso(), "2026-01-20T00:00:00Z");
        assert_eq!(clock.now_iso(), "2026-01-20T00:00:00Z");
        assert!(clock.is_deterministic());
    }

    #[test]
    fn fixed_clock_does_not_advance_on_its_own() {
        let clock = Clock::fixed("2026-01-20T00:00:00Z");
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn fixed_clock_advances_only_when_scripted() {
        let clock = Clock::fixed("2026-01-20T00:00:00Z");
        clock.advance(1500);
        assert_eq!(clock.now_ms(), 1500);
        clock.reset();
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn wall_clock_is_not_deterministic() {
        let clock = Clock::wall();
        assert!(!clock.is_deterministic());
        assert!(clock.now_ms() > 0);
        assert!(clock.now_iso().ends_with('Z'));
    }

    #[test]
    fn sequence_counts_from_zero() {
        let seq = IdSequence::new();
        assert_eq!(seq.next(), 0);
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        seq.reset();
        assert_eq!(seq.next(), 0);
    }

    #[test]
    fn providers_init_respects_determinism_flag() {
        let det = Providers::init(true, Some("2026-02-21T12:34:56Z"));
        assert!(det.clock.is_deterministic());
        assert_eq!(det.clock.now_iso(), "2026-02-21T12:34:56Z");

        let wall = Providers::init(false, None);
        assert!(!wall.clock.is_deterministic());
    }

    #[test]
    fn providers_reset_restores_initial_state() {
        let providers = Providers::init(true, Some("2026-01-20T00:00:00Z"));
        providers.clock.advance(10);
        providers.seq.next();
        providers.reset();
        assert_eq!(providers.clock.now_ms(), 0);
        assert_eq!(providers.seq.next(), 0);
    }
}
