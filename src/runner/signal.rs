//! Manual-reset flags shared between the controller, the worker and the
//! hotkey listener.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A level-triggered boolean with blocking waits, in the manner of a
/// manual-reset event: it stays set until someone clears it.
#[derive(Debug, Default)]
pub struct LatchableFlag {
    set: Mutex<bool>,
    changed: Condvar,
}

impl LatchableFlag {
    pub fn new(initially_set: bool) -> Self {
        Self {
            set: Mutex::new(initially_set),
            changed: Condvar::new(),
        }
    }

    // A poisoned flag still holds a valid bool.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set(&self) {
        let mut set = self.lock();
        *set = true;
        self.changed.notify_all();
    }

    pub fn clear(&self) {
        *self.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Blocks until the flag is set or `timeout` passes. Returns whether the
    /// flag was set.
    pub fn wait_set_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut set = self.lock();
        while !*set {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            set = match self.changed.wait_timeout(set, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    pub fn wait_set(&self) {
        let mut set = self.lock();
        while !*set {
            set = match self.changed.wait(set) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

/// The two signals scoped to a single run.
///
/// `cancel` is monotonic for the life of the run. `runnable` is set while the
/// run may proceed and cleared while it is paused.
#[derive(Debug, Clone)]
pub struct RunSignals {
    cancel: Arc<LatchableFlag>,
    runnable: Arc<LatchableFlag>,
}

impl RunSignals {
    pub fn new() -> Self {
        Self {
            cancel: Arc::new(LatchableFlag::new(false)),
            runnable: Arc::new(LatchableFlag::new(true)),
        }
    }

    /// Cancels the run. Also marks it runnable so a paused waiter wakes up to
    /// observe the cancellation.
    pub fn cancel(&self) {
        self.cancel.set();
        self.runnable.set();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_set()
    }

    pub fn pause(&self) {
        self.runnable.clear();
    }

    pub fn resume(&self) {
        self.runnable.set();
    }

    pub fn is_paused(&self) -> bool {
        !self.runnable.is_set()
    }

    pub fn cancellation(&self) -> &LatchableFlag {
        &self.cancel
    }

    pub fn runnable(&self) -> &LatchableFlag {
        &self.runnable
    }
}

impl Default for RunSignals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn flag_starts_in_requested_state() {
        assert!(LatchableFlag::new(true).is_set());
        assert!(!LatchableFlag::new(false).is_set());
    }

    #[test]
    fn flag_stays_set_until_cleared() {
        let flag = LatchableFlag::new(false);
        flag.set();
        assert!(flag.is_set());
        assert!(flag.wait_set_timeout(Duration::ZERO));
        flag.clear();
        assert!(!flag.is_set());
    }

    #[test]
    fn wait_times_out_when_never_set() {
        let flag = LatchableFlag::new(false);
        let started = Instant::now();
        assert!(!flag.wait_set_timeout(Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn set_wakes_blocked_waiter() {
        let flag = Arc::new(LatchableFlag::new(false));
        let waiter = {
            let flag = Arc::clone(&flag);
            thread::spawn(move || flag.wait_set_timeout(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        flag.set();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn fresh_signals_are_runnable_and_not_cancelled() {
        let signals = RunSignals::new();
        assert!(!signals.is_cancelled());
        assert!(!signals.is_paused());
    }

    #[test]
    fn cancel_also_lifts_pause() {
        let signals = RunSignals::new();
        signals.pause();
        assert!(signals.is_paused());
        signals.cancel();
        assert!(signals.is_cancelled());
        assert!(!signals.is_paused());
    }

    #[test]
    fn clones_share_state() {
        let signals = RunSignals::new();
        let seen_by_worker = signals.clone();
        signals.cancel();
        assert!(seen_by_worker.is_cancelled());
    }
}
