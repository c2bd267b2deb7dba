mod cli;
mod logging;
mod shell;
pub mod runner;

use std::sync::mpsc;

use clap::Parser;
use tracing::{error, info, warn};

use cli::Cli;
use runner::controller::RunController;
use runner::hotkey::HotkeyListener;
use shell::{ControlMessage, ConsoleObserver};

pub fn run() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let (tx, rx) = mpsc::channel::<ControlMessage>();

    let report_tx = tx.clone();
    let mut controller = RunController::new(
        move |report| {
            let _ = report_tx.send(ControlMessage::Worker(report));
        },
        ConsoleObserver::new(cli.json),
    )
    .with_config(cli.run_config())
    .with_policy(cli.target_policy());

    let abort_tx = tx.clone();
    let hotkey = match HotkeyListener::start(cli.abort_key, move || {
        let _ = abort_tx.send(ControlMessage::Abort);
    }) {
        Ok(listener) => Some(listener),
        Err(error) => {
            warn!(%error, "abort hotkey unavailable; use the stop command instead");
            None
        }
    };

    if let Err(error) = shell::spawn_stdin_reader(tx) {
        error!(%error, "failed to start console input");
        controller.shutdown();
        return;
    }

    info!(abort_key = %cli.abort_key, "ready");
    println!("{}", shell::HELP);

    // Every sender lives on another thread or inside the controller, so the
    // loop ends through Shutdown or InputClosed rather than disconnection.
    for message in rx.iter() {
        if shell::dispatch(&mut controller, message).is_break() {
            break;
        }
    }

    controller.shutdown();
    if let Some(listener) = hotkey {
        listener.stop();
    }
}
