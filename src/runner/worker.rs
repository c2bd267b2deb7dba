//! The automation loop. Runs on its own thread and only talks back to the
//! controller through [`WorkerReport`]s.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use super::config::{RunConfig, TargetPolicy};
use super::foreground::{wait_for_target, ForegroundProbe, TargetOutcome, WindowId};
use super::input::{InputAction, InputInjector};
use super::signal::RunSignals;
use super::types::{RunEnd, RunSummary, WorkerReport, WorkerStatus};
use super::wait::wait_interruptible;

/// Where the worker posts its lifecycle reports.
pub type ReportFn = Arc<dyn Fn(WorkerReport) + Send + Sync>;

pub struct Worker {
    pub run_id: Uuid,
    pub config: RunConfig,
    pub policy: TargetPolicy,
    pub control_window: Option<WindowId>,
    pub signals: RunSignals,
    pub probe: Arc<dyn ForegroundProbe>,
    pub input: Arc<dyn InputInjector>,
    pub report: ReportFn,
}

impl Worker {
    /// Runs the worker on its own thread. A panicking run still posts a
    /// `Finished` report so the controller leaves the live states.
    pub fn spawn(self) -> io::Result<JoinHandle<RunSummary>> {
        let run_id = self.run_id;
        let report = Arc::clone(&self.report);
        thread::Builder::new()
            .name("automation-worker".to_string())
            .spawn(move || match panic::catch_unwind(AssertUnwindSafe(|| self.run())) {
                Ok(summary) => summary,
                Err(_) => {
                    error!(%run_id, "automation worker panicked");
                    let summary = RunSummary::new(RunEnd::Cancelled);
                    report(WorkerReport {
                        run_id,
                        status: WorkerStatus::Finished(summary.clone()),
                    });
                    summary
                }
            })
    }

    /// Runs the whole lifecycle and posts the final report. The returned
    /// summary is the same one carried by that report.
    pub fn run(self) -> RunSummary {
        let span = info_span!("run", run_id = %self.run_id);
        let _entered = span.enter();

        let summary = self.drive();
        info!(
            end = ?summary.end,
            iterations = summary.iterations,
            injection_failures = summary.injection_failures,
            "automation worker finished"
        );
        self.post(WorkerStatus::Finished(summary.clone()));
        summary
    }

    fn drive(&self) -> RunSummary {
        debug!(control_window = ?self.control_window, "waiting for target window");
        let outcome = wait_for_target(
            self.probe.as_ref(),
            self.control_window,
            &self.policy,
            &self.signals,
        );
        if outcome == TargetOutcome::Cancelled {
            return RunSummary::new(RunEnd::CancelledBeforeTarget);
        }
        self.post(WorkerStatus::TargetReady);

        let mut summary = RunSummary::new(RunEnd::Exhausted);
        let delay = self.config.delay();

        for _ in 0..self.config.max_iterations {
            if self.pause_point(Duration::ZERO) {
                summary.end = RunEnd::Cancelled;
                break;
            }

            if self.inject(&self.config.trigger, &mut summary) {
                summary.triggers += 1;
            }

            if self.pause_point(delay) {
                summary.end = RunEnd::Cancelled;
                break;
            }

            if self.inject(&self.config.advance, &mut summary) {
                summary.advances += 1;
            }
            summary.iterations += 1;

            if self.pause_point(self.config.debounce) {
                summary.end = RunEnd::Cancelled;
                break;
            }
        }

        summary
    }

    /// Returns true when the run has been cancelled.
    fn pause_point(&self, duration: Duration) -> bool {
        wait_interruptible(duration, &self.signals).is_cancelled()
    }

    fn inject(&self, action: &InputAction, summary: &mut RunSummary) -> bool {
        match self.input.send(action) {
            Ok(()) => true,
            Err(error) => {
                summary.injection_failures += 1;
                warn!(%action, %error, "input injection failed");
                false
            }
        }
    }

    fn post(&self, status: WorkerStatus) {
        (self.report)(WorkerReport {
            run_id: self.run_id,
            status,
        });
    }
}
