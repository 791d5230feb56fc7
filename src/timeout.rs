//! Suspension-point budget wrapper and out-of-band cancellation.
//!
//! The observer suspends on exactly four operation families: browser
//! launch/close, navigation completion, the per-expectation settle window,
//! and evidence file writes. Every suspension is wrapped by [`with_timeout`],
//! which races the operation against the injected clock and raises a
//! classified error, never a platform exception.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::VeraxError;
use crate::providers::Clock;

/// Cancellation is out-of-band: an external signal flips the token, and the
/// observer checks it at the top of every loop iteration, at each suspension
/// point, and before every artifact write.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checkpoint: error out if cancellation was requested.
    pub fn check(&self) -> Result<(), VeraxError> {
        if self.is_cancelled() {
            Err(VeraxError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// An absolute deadline against the injected clock.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    ends_at_ms: u64,
}

impl Deadline {
    #[must_use]
    pub fn after(clock: &Clock, budget_ms: u64) -> Self {
        Self {
            ends_at_ms: clock.now_ms().saturating_add(budget_ms),
        }
    }

    #[must_use]
    pub fn expired(&self, clock: &Clock) -> bool {
        clock.now_ms() >= self.ends_at_ms
    }

    #[must_use]
    pub fn remaining_ms(&self, clock: &Clock) -> u64 {
        self.ends_at_ms.saturating_sub(clock.now_ms())
    }
}

/// Run a suspension-point operation under a budget.
///
/// The operation runs to completion (the driver is synchronous and carries
/// its own internal bound); afterwards the elapsed time is measured against
/// the budget and overruns raise `PhaseTimeout { phase }`.
pub fn with_timeout<T>(
    clock: &Clock,
    budget_ms: u64,
    phase: &str,
    op: impl FnOnce() -> Result<T, VeraxError>,
) -> Result<T, VeraxError> {
    let started = clock.now_ms();
    let result = op()?;
    let elapsed = clock.now_ms().saturating_sub(started);
    if elapsed > budget_ms {
        return Err(VeraxError::PhaseTimeout {
            phase: phase.to_string(),
            budget_ms,
        });
    }
    Ok(result)
}
