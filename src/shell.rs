//! Console control surface: reads commands from stdin and prints state
//! changes. Stands in for the dialog window.

use std::io::{self, BufRead};
use std::ops::ControlFlow;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::runner::config::parse_delay;
use crate::runner::controller::RunController;
use crate::runner::state::{Controls, RunState};
use crate::runner::types::{StateChange, WorkerReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start with an explicit delay, or the configured one.
    Start(Option<u32>),
    TogglePause,
    Stop,
    Status,
    Help,
    Shutdown,
}

/// Everything the control thread reacts to, in arrival order.
#[derive(Debug)]
pub enum ControlMessage {
    Command(Command),
    Worker(WorkerReport),
    /// The global abort key was pressed.
    Abort,
    /// Stdin reached end of file.
    InputClosed,
}

pub const HELP: &str = "commands: start [seconds] | pause | stop | status | quit";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".to_string());
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "start" | "go" => Command::Start(words.next().map(parse_delay)),
        "pause" | "resume" | "p" => Command::TogglePause,
        "stop" | "s" => Command::Stop,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Shutdown,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(command)
}

/// Reads stdin lines on a background thread and forwards them as commands.
pub fn spawn_stdin_reader(messages: Sender<ControlMessage>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(command) => {
                        if messages.send(ControlMessage::Command(command)).is_err() {
                            return;
                        }
                    }
                    Err(error) => eprintln!("{error}; {HELP}"),
                }
            }
            let _ = messages.send(ControlMessage::InputClosed);
        })
}

/// Applies one message to the controller. Breaks once the process should
/// exit; by then any live run has been stopped and joined.
pub fn dispatch(controller: &mut RunController, message: ControlMessage) -> ControlFlow<()> {
    match message {
        ControlMessage::Worker(report) => controller.handle_report(report),
        ControlMessage::Abort => controller.abort(),
        ControlMessage::InputClosed | ControlMessage::Command(Command::Shutdown) => {
            controller.shutdown();
            return ControlFlow::Break(());
        }
        ControlMessage::Command(Command::Start(delay)) => {
            let delay = delay.unwrap_or(controller.config().delay_seconds);
            if let Err(error) = controller.start(i64::from(delay)) {
                warn!(%error, "start rejected");
            }
        }
        ControlMessage::Command(Command::TogglePause) => {
            if let Err(error) = controller.toggle_pause() {
                debug!(%error, "pause toggle ignored");
            }
        }
        ControlMessage::Command(Command::Stop) => {
            if let Err(error) = controller.stop() {
                debug!(%error, "stop ignored");
            }
        }
        ControlMessage::Command(Command::Status) => {
            println!("{}", render_status(controller.state()));
        }
        ControlMessage::Command(Command::Help) => println!("{HELP}"),
    }
    ControlFlow::Continue(())
}

/// Status line plus the commands the current state allows.
pub fn render_status(state: RunState) -> String {
    let controls = Controls::for_state(state);
    let mut offered = Vec::new();
    if controls.can_configure {
        offered.push("start");
    }
    if controls.can_toggle_pause {
        offered.push(if controls.pause_label == "Resume" {
            "resume"
        } else {
            "pause"
        });
    }
    if controls.can_stop {
        offered.push("stop");
    }
    offered.push("quit");
    format!("{}  [{}]", state.status_text(), offered.join(" | "))
}

/// Prints `OnStateChanged` notifications to stdout.
pub struct ConsoleObserver {
    json: bool,
}

impl ConsoleObserver {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn render(&self, change: &StateChange) -> String {
        if self.json {
            return serde_json::to_string(change).unwrap_or_else(|error| {
                format!(r#"{{"error":"failed to encode state change: {error}"}}"#)
            });
        }
        let mut line = render_status(change.state);
        if let Some(summary) = &change.summary {
            line.push_str(&format!(
                "  ({} iterations, {} failed injections, {:?})",
                summary.iterations, summary.injection_failures, summary.end
            ));
        }
        line
    }
}

impl crate::runner::controller::StateObserver for ConsoleObserver {
    fn on_state_changed(&self, change: &StateChange) {
        println!("{}", self.render(change));
    }
}
