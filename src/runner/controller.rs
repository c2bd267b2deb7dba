//! Run control. Owns the run state and the active run's resources, and is
//! only ever driven from the control thread.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::{RunConfig, TargetPolicy};
use super::error::RunError;
use super::foreground::{ForegroundProbe, SystemForeground, WindowId};
use super::input::{InputInjector, SystemInput};
use super::signal::RunSignals;
use super::state::{RunState, RunStateMachine};
use super::types::{RunSummary, StateChange, WorkerReport, WorkerStatus};
use super::worker::{ReportFn, Worker};

/// Receives `OnStateChanged` notifications on the control thread.
pub trait StateObserver {
    fn on_state_changed(&self, change: &StateChange);
}

impl<F> StateObserver for F
where
    F: Fn(&StateChange),
{
    fn on_state_changed(&self, change: &StateChange) {
        self(change)
    }
}

/// The worker thread together with the signals it waits on.
///
/// Dropping a handle cancels the run and joins the worker, so the signals
/// never outlive a join on any exit path.
pub struct RunHandle {
    run_id: Uuid,
    signals: RunSignals,
    thread: Option<JoinHandle<RunSummary>>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn signals(&self) -> &RunSignals {
        &self.signals
    }

    fn join(&mut self) -> Option<RunSummary> {
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(summary) => Some(summary),
            Err(_) => {
                error!(run_id = %self.run_id, "automation worker panicked");
                None
            }
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.signals.cancel();
            self.join();
        }
    }
}

pub struct RunController {
    machine: RunStateMachine,
    config: RunConfig,
    policy: TargetPolicy,
    control_window: Option<WindowId>,
    probe: Arc<dyn ForegroundProbe>,
    input: Arc<dyn InputInjector>,
    report: ReportFn,
    observer: Box<dyn StateObserver>,
    spawn: fn(Worker) -> io::Result<JoinHandle<RunSummary>>,
    active: Option<RunHandle>,
}

impl RunController {
    /// `report` must hand worker reports back to the control thread, which
    /// then feeds them to [`RunController::handle_report`].
    pub fn new(
        report: impl Fn(WorkerReport) + Send + Sync + 'static,
        observer: impl StateObserver + 'static,
    ) -> Self {
        Self {
            machine: RunStateMachine::new(),
            config: RunConfig::default(),
            policy: TargetPolicy::default(),
            control_window: None,
            probe: Arc::new(SystemForeground),
            input: Arc::new(SystemInput),
            report: Arc::new(report),
            observer: Box::new(observer),
            spawn: Worker::spawn,
            active: None,
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: TargetPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Pins the control dialog's window. Without one, whatever window has
    /// focus when a run starts is taken to be the control surface.
    pub fn with_control_window(mut self, window: WindowId) -> Self {
        self.control_window = Some(window);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn ForegroundProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_input(mut self, input: Arc<dyn InputInjector>) -> Self {
        self.input = input;
        self
    }

    pub fn state(&self) -> RunState {
        self.machine.current()
    }

    pub fn active_run(&self) -> Option<&RunHandle> {
        self.active.as_ref()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Starts a run with `delay_seconds` clamped into range.
    ///
    /// Fails without changing state if a run is live or the worker thread
    /// cannot be spawned.
    pub fn start(&mut self, delay_seconds: i64) -> Result<Uuid, RunError> {
        self.machine.can_start()?;

        let config = self.config.with_delay(delay_seconds);
        let run_id = Uuid::new_v4();
        let signals = RunSignals::new();
        let control_window = self.control_window.or_else(|| self.probe.foreground());

        let worker = Worker {
            run_id,
            config: config.clone(),
            policy: self.policy,
            control_window,
            signals: signals.clone(),
            probe: Arc::clone(&self.probe),
            input: Arc::clone(&self.input),
            report: Arc::clone(&self.report),
        };
        let thread = (self.spawn)(worker).map_err(RunError::Spawn)?;

        self.active = Some(RunHandle {
            run_id,
            signals,
            thread: Some(thread),
        });
        self.machine.start()?;
        info!(
            %run_id,
            delay_seconds = config.delay_seconds,
            max_iterations = config.max_iterations,
            trigger = %config.trigger,
            advance = %config.advance,
            "run started"
        );
        self.notify(Some(run_id), None);
        Ok(run_id)
    }

    /// Pauses a running run or resumes a paused one.
    pub fn toggle_pause(&mut self) -> Result<RunState, RunError> {
        let Some(run) = self.active.as_ref() else {
            self.machine.pause()?;
            return Ok(self.state());
        };

        match self.machine.current() {
            RunState::Paused => {
                self.machine.resume()?;
                run.signals.resume();
                info!(run_id = %run.run_id, "run resumed");
            }
            _ => {
                self.machine.pause()?;
                run.signals.pause();
                info!(run_id = %run.run_id, "run paused");
            }
        }
        self.notify(Some(run.run_id), None);
        Ok(self.state())
    }

    /// Requests cancellation. The state moves to `Stopped` only once the
    /// worker's final report has been handled.
    pub fn stop(&mut self) -> Result<(), RunError> {
        self.machine.can_stop()?;
        if let Some(run) = self.active.as_ref() {
            info!(run_id = %run.run_id, "stop requested");
            run.signals.cancel();
        }
        Ok(())
    }

    /// Stop requested by the global abort key. Ignored when nothing is live.
    pub fn abort(&mut self) {
        match self.stop() {
            Ok(()) => info!("abort hotkey stopped the run"),
            Err(error) => debug!(%error, "abort hotkey ignored"),
        }
    }

    /// Stops any live run and waits for its worker before returning.
    pub fn shutdown(&mut self) {
        if self.stop().is_err() {
            return;
        }
        let run_id = self.active.as_ref().map(RunHandle::run_id);
        let summary = self.release();
        self.finish(run_id, summary);
    }

    pub fn handle_report(&mut self, report: WorkerReport) {
        let is_current = self
            .active
            .as_ref()
            .is_some_and(|run| run.run_id == report.run_id);
        if !is_current {
            debug!(run_id = %report.run_id, "ignoring report from a finished run");
            return;
        }

        match report.status {
            WorkerStatus::TargetReady => match self.machine.target_ready() {
                Ok(()) => self.notify(Some(report.run_id), None),
                Err(error) => warn!(?error, "unexpected target-ready report"),
            },
            WorkerStatus::Finished(summary) => {
                // Joined before release; the report itself is the summary of record.
                let _ = self.release();
                self.finish(Some(report.run_id), Some(summary));
            }
        }
    }

    /// Joins the active worker and drops its signals.
    fn release(&mut self) -> Option<RunSummary> {
        let mut run = self.active.take()?;
        let summary = run.join();
        debug!(run_id = %run.run_id, "run resources released");
        summary
    }

    fn finish(&mut self, run_id: Option<Uuid>, summary: Option<RunSummary>) {
        if let Err(error) = self.machine.finish() {
            warn!(?error, "finish outside a live run");
            return;
        }
        self.notify(run_id, summary);
    }

    fn notify(&self, run_id: Option<Uuid>, summary: Option<RunSummary>) {
        let change = StateChange {
            state: self.state(),
            run_id,
            summary,
        };
        self.observer.on_state_changed(&change);
    }
}
