//! Pause-aware, cancellable waiting.

use std::time::{Duration, Instant};

use super::signal::RunSignals;

/// Upper bound on how long cancellation can go unnoticed.
pub const WAIT_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    Cancelled,
}

impl WaitOutcome {
    pub fn is_cancelled(self) -> bool {
        self == WaitOutcome::Cancelled
    }
}

/// Waits `duration` of unpaused time.
///
/// Returns `Cancelled` as soon as the run's cancellation is seen, paused or
/// not. Time spent paused is not counted against `duration`. A zero duration
/// still honours both signals once, so it works as a loop checkpoint.
pub fn wait_interruptible(duration: Duration, signals: &RunSignals) -> WaitOutcome {
    let mut remaining = duration;

    loop {
        if signals.is_cancelled() {
            return WaitOutcome::Cancelled;
        }

        if signals.is_paused() {
            // Cancel also sets runnable, but keep slicing so cancellation is
            // never missed even if only the cancel flag moves.
            signals.runnable().wait_set_timeout(WAIT_SLICE);
            continue;
        }

        if remaining.is_zero() {
            return WaitOutcome::Completed;
        }

        let slice = remaining.min(WAIT_SLICE);
        let started = Instant::now();
        if signals.cancellation().wait_set_timeout(slice) {
            return WaitOutcome::Cancelled;
        }
        // A pause that landed mid-slice voids the whole slice, so paused time
        // is never counted.
        if !signals.is_paused() {
            remaining = remaining.saturating_sub(started.elapsed());
        }
    }
}
