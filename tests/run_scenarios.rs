use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use kindle_downloader_lib::runner::error::InjectError;
use kindle_downloader_lib::runner::hotkey::{KeyEventPump, KeySink, PumpQuit, ReadySender};
use kindle_downloader_lib::runner::key_event::{KeyDirection, KeyEvent};
use kindle_downloader_lib::runner::{
    ForegroundProbe, HotkeyListener, InputAction, InputInjector, RunConfig, RunController, RunEnd,
    RunState, RunSummary, StateChange, TargetPolicy, VirtualKey, WindowId, WorkerReport,
};

const DIALOG: WindowId = WindowId(10);
const KINDLE: WindowId = WindowId(20);

/// Reports the dialog for the first `dialog_polls` polls, then the reader.
struct FocusScript {
    dialog_polls: usize,
    polls: AtomicUsize,
}

impl FocusScript {
    fn leaves_after(dialog_polls: usize) -> Arc<Self> {
        Arc::new(Self {
            dialog_polls,
            polls: AtomicUsize::new(0),
        })
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl ForegroundProbe for FocusScript {
    fn foreground(&self) -> Option<WindowId> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        if poll < self.dialog_polls {
            Some(DIALOG)
        } else {
            Some(KINDLE)
        }
    }
}

#[derive(Default)]
struct Recorder {
    actions: Mutex<Vec<InputAction>>,
}

impl Recorder {
    fn actions(&self) -> Vec<InputAction> {
        self.actions.lock().unwrap().clone()
    }

    fn count(&self) -> usize {
        self.actions.lock().unwrap().len()
    }
}

impl InputInjector for Recorder {
    fn send(&self, action: &InputAction) -> Result<(), InjectError> {
        self.actions.lock().unwrap().push(*action);
        Ok(())
    }
}

enum Message {
    Report(WorkerReport),
    Abort,
}

struct Harness {
    controller: RunController,
    messages: Receiver<Message>,
    sender: Sender<Message>,
    changes: Arc<Mutex<Vec<StateChange>>>,
    input: Arc<Recorder>,
    probe: Arc<FocusScript>,
}

impl Harness {
    fn new(max_iterations: u32, dialog_polls: usize) -> Self {
        let (sender, messages) = mpsc::channel();
        let report_tx = Mutex::new(sender.clone());
        let changes = Arc::new(Mutex::new(Vec::new()));
        let observed = Arc::clone(&changes);
        let input = Arc::new(Recorder::default());
        let probe = FocusScript::leaves_after(dialog_polls);

        let controller = RunController::new(
            move |report| {
                let _ = report_tx.lock().unwrap().send(Message::Report(report));
            },
            move |change: &StateChange| observed.lock().unwrap().push(change.clone()),
        )
        .with_config(RunConfig {
            max_iterations,
            debounce: Duration::from_millis(10),
            ..RunConfig::default()
        })
        .with_policy(TargetPolicy {
            poll_interval: Duration::from_millis(200),
            stable_polls: 3,
        })
        .with_control_window(DIALOG)
        .with_probe(probe.clone())
        .with_input(input.clone());

        Self {
            controller,
            messages,
            sender,
            changes,
            input,
            probe,
        }
    }

    /// Feeds messages to the controller the way the control thread does.
    fn pump_until(&mut self, state: RunState) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.controller.state() != state {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.messages.recv_timeout(remaining) {
                Ok(Message::Report(report)) => self.controller.handle_report(report),
                Ok(Message::Abort) => self.controller.abort(),
                Err(_) => panic!(
                    "timed out waiting for {state:?}, still {:?}",
                    self.controller.state()
                ),
            }
        }
    }

    fn states(&self) -> Vec<RunState> {
        self.changes.lock().unwrap().iter().map(|c| c.state).collect()
    }

    fn last_summary(&self) -> Option<RunSummary> {
        self.changes
            .lock()
            .unwrap()
            .last()
            .and_then(|change| change.summary.clone())
    }
}

fn trigger() -> InputAction {
    InputAction::Key(VirtualKey::Return)
}

fn advance() -> InputAction {
    InputAction::Key(VirtualKey::Up)
}

#[test]
fn start_waits_for_focus_to_settle_then_runs_one_pair() {
    let mut harness = Harness::new(1, 2);

    harness.controller.start(3).unwrap();
    assert_eq!(harness.controller.state(), RunState::AwaitingTarget);

    let started = Instant::now();
    harness.pump_until(RunState::Running);
    // Two dialog polls, then three stable reader polls.
    assert!(harness.probe.polls() >= 5);
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert!(harness.input.actions().len() <= 1);

    harness.pump_until(RunState::Stopped);
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(harness.input.actions(), vec![trigger(), advance()]);

    let summary = harness.last_summary().unwrap();
    assert_eq!(summary.end, RunEnd::Exhausted);
    assert_eq!(summary.iterations, 1);
    assert_eq!(
        harness.states(),
        vec![RunState::AwaitingTarget, RunState::Running, RunState::Stopped]
    );
}

#[test]
fn pause_freezes_injection_and_resume_continues_the_iteration() {
    let mut harness = Harness::new(2, 0);

    harness.controller.start(1).unwrap();
    harness.pump_until(RunState::Running);
    thread::sleep(Duration::from_millis(100));

    assert_eq!(harness.controller.toggle_pause().unwrap(), RunState::Paused);
    thread::sleep(Duration::from_millis(100));
    let frozen = harness.input.count();
    assert_eq!(frozen, 1, "only the first trigger went out before the pause");

    // Longer than the delay: paused time must not count toward it.
    thread::sleep(Duration::from_millis(1500));
    assert_eq!(harness.input.count(), frozen);

    assert_eq!(harness.controller.toggle_pause().unwrap(), RunState::Running);
    harness.pump_until(RunState::Stopped);

    assert_eq!(
        harness.input.actions(),
        vec![trigger(), advance(), trigger(), advance()]
    );
    assert_eq!(
        harness.states(),
        vec![
            RunState::AwaitingTarget,
            RunState::Running,
            RunState::Paused,
            RunState::Running,
            RunState::Stopped,
        ]
    );
}

#[test]
fn stop_mid_delay_skips_the_advance_and_a_new_run_starts_clean() {
    let mut harness = Harness::new(5, 0);

    let first = harness.controller.start(3).unwrap();
    harness.pump_until(RunState::Running);
    thread::sleep(Duration::from_millis(200));

    harness.controller.stop().unwrap();
    harness.pump_until(RunState::Stopped);

    assert_eq!(harness.input.actions(), vec![trigger()]);
    let summary = harness.last_summary().unwrap();
    assert_eq!(summary.end, RunEnd::Cancelled);
    assert_eq!(summary.advances, 0);
    assert!(harness.controller.active_run().is_none());

    let second = harness.controller.start(3).unwrap();
    assert_ne!(first, second);
    assert_eq!(harness.controller.state(), RunState::AwaitingTarget);
    let run = harness.controller.active_run().unwrap();
    assert!(!run.signals().is_cancelled());
    assert!(!run.signals().is_paused());

    harness.controller.shutdown();
    assert_eq!(harness.controller.state(), RunState::Stopped);
}

struct QuitFlag(Arc<AtomicBool>);

impl PumpQuit for QuitFlag {
    fn quit(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Replays key events sent over a channel, standing in for the OS hook.
struct ScriptedKeys(Receiver<KeyEvent>);

impl KeyEventPump for ScriptedKeys {
    fn run(self: Box<Self>, ready: ReadySender, mut sink: KeySink) {
        let quit = Arc::new(AtomicBool::new(false));
        let _ = ready.send(Ok(Box::new(QuitFlag(Arc::clone(&quit)))));
        while !quit.load(Ordering::SeqCst) {
            if let Ok(event) = self.0.recv_timeout(Duration::from_millis(10)) {
                sink(event);
            }
        }
    }
}

#[test]
fn abort_hotkey_stops_a_running_run_like_stop() {
    let mut harness = Harness::new(5, 0);
    let abort_key = VirtualKey::F(9);
    let code = abort_key.native_code().unwrap();

    let (keys_tx, keys_rx) = mpsc::channel();
    let abort_tx = Mutex::new(harness.sender.clone());
    let listener = HotkeyListener::start_with(Box::new(ScriptedKeys(keys_rx)), abort_key, move || {
        let _ = abort_tx.lock().unwrap().send(Message::Abort);
    })
    .unwrap();

    harness.controller.start(3).unwrap();
    harness.pump_until(RunState::Running);

    // Other keys and key-ups pass through untouched.
    keys_tx
        .send(KeyEvent::new(VirtualKey::Space.native_code().unwrap(), KeyDirection::Down))
        .unwrap();
    keys_tx.send(KeyEvent::new(code, KeyDirection::Up)).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(harness.controller.state(), RunState::Running);

    keys_tx.send(KeyEvent::new(code, KeyDirection::Down)).unwrap();
    harness.pump_until(RunState::Stopped);

    let summary = harness.last_summary().unwrap();
    assert_eq!(summary.end, RunEnd::Cancelled);
    assert_eq!(harness.input.actions(), vec![trigger()]);

    // Pressed again with nothing live: ignored.
    keys_tx.send(KeyEvent::new(code, KeyDirection::Down)).unwrap();
    thread::sleep(Duration::from_millis(100));
    while let Ok(message) = harness.messages.try_recv() {
        if let Message::Abort = message {
            harness.controller.abort();
        }
    }
    assert_eq!(harness.controller.state(), RunState::Stopped);

    listener.stop();
}

#[test]
fn worker_never_exceeds_max_iterations() {
    let mut harness = Harness::new(2, 0);

    harness.controller.start(1).unwrap();
    harness.pump_until(RunState::Stopped);

    let actions = harness.input.actions();
    assert_eq!(actions.len(), 4);
    assert_eq!(actions.iter().filter(|a| **a == trigger()).count(), 2);

    // Nothing further is injected once the worker has finished.
    thread::sleep(Duration::from_millis(300));
    assert_eq!(harness.input.count(), 4);

    let summary = harness.last_summary().unwrap();
    assert_eq!(summary.end, RunEnd::Exhausted);
    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.triggers, 2);
    assert_eq!(summary.advances, 2);
}

#[test]
fn cancel_before_target_reports_without_injecting() {
    // Focus never leaves the dialog.
    let mut harness = Harness::new(5, usize::MAX);

    harness.controller.start(1).unwrap();
    thread::sleep(Duration::from_millis(300));
    harness.controller.stop().unwrap();
    harness.pump_until(RunState::Stopped);

    assert!(harness.input.actions().is_empty());
    assert_eq!(
        harness.last_summary().map(|s| s.end),
        Some(RunEnd::CancelledBeforeTarget)
    );
    assert!(!harness
        .changes
        .lock()
        .unwrap()
        .iter()
        .any(|change| change.state == RunState::Running));
}
