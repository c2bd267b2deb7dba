//! Global abort hotkey.
//!
//! A low-level keyboard hook only delivers events while the thread that
//! installed it keeps pumping messages, so the hook gets a dedicated thread.
//! The listener is passive: every event is handed on to the next hook.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::error::HookError;
use super::key_event::{KeyEvent, VirtualKey};
use super::platform::SystemKeyPump;

/// How long `start` waits for the hook thread to report in.
pub const READY_TIMEOUT: Duration = Duration::from_secs(2);

/// Receives every key event seen by the hook, on the hook thread.
pub type KeySink = Box<dyn FnMut(KeyEvent) + Send>;

/// One-shot handshake from the hook thread: either a way to end its loop,
/// or the reason the hook could not be installed.
pub type ReadySender = Sender<Result<Box<dyn PumpQuit>, HookError>>;

/// Ends a running pump from another thread.
pub trait PumpQuit: Send {
    fn quit(&self);
}

/// A source of global key events that owns its event loop.
pub trait KeyEventPump: Send + 'static {
    /// Installs the hook on the calling thread, reports through `ready`, then
    /// pumps events into `sink` until told to quit. Uninstalling the hook is
    /// the last thing it does.
    ///
    /// If sending on `ready` fails the launcher has given up waiting: the
    /// pump must uninstall the hook and return without pumping.
    fn run(self: Box<Self>, ready: ReadySender, sink: KeySink);
}

pub struct HotkeyListener {
    abort_key: VirtualKey,
    quit: Box<dyn PumpQuit>,
    handle: Option<JoinHandle<()>>,
}

impl HotkeyListener {
    /// Hooks the system keyboard and calls `on_abort` whenever `abort_key`
    /// goes down, whichever application has focus.
    pub fn start(
        abort_key: VirtualKey,
        on_abort: impl Fn() + Send + 'static,
    ) -> Result<Self, HookError> {
        Self::start_with(Box::new(SystemKeyPump), abort_key, on_abort)
    }

    /// Like [`HotkeyListener::start`] with an explicit event source. Blocks
    /// until the pump is live so no early keypress is missed.
    pub fn start_with(
        pump: Box<dyn KeyEventPump>,
        abort_key: VirtualKey,
        on_abort: impl Fn() + Send + 'static,
    ) -> Result<Self, HookError> {
        Self::start_with_timeout(pump, abort_key, on_abort, READY_TIMEOUT)
    }

    fn start_with_timeout(
        pump: Box<dyn KeyEventPump>,
        abort_key: VirtualKey,
        on_abort: impl Fn() + Send + 'static,
        ready_timeout: Duration,
    ) -> Result<Self, HookError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let sink: KeySink = Box::new(move |event: KeyEvent| {
            if event.is_press_of(abort_key) {
                debug!(code = event.code, "abort key pressed");
                on_abort();
            }
        });

        let handle = thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || pump.run(ready_tx, sink))
            .map_err(HookError::Spawn)?;

        match ready_rx.recv_timeout(ready_timeout) {
            Ok(Ok(quit)) => {
                info!(%abort_key, "abort hotkey installed");
                Ok(Self {
                    abort_key,
                    quit,
                    handle: Some(handle),
                })
            }
            Ok(Err(error)) => {
                let _ = handle.join();
                Err(error)
            }
            Err(RecvTimeoutError::Timeout) => {
                // A late ready send now fails, which tells the pump to unhook
                // and return, so the join is bounded by its setup.
                drop(ready_rx);
                warn!(
                    timeout = ?ready_timeout,
                    "hotkey thread slow to start; waiting for it to exit"
                );
                let _ = handle.join();
                Err(HookError::ReadyTimeout(ready_timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                Err(HookError::Disconnected)
            }
        }
    }

    pub fn abort_key(&self) -> VirtualKey {
        self.abort_key
    }

    /// Ends the hook thread's loop and joins it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.quit.quit();
        if handle.join().is_err() {
            warn!("hotkey listener thread panicked");
        } else {
            debug!("hotkey listener stopped");
        }
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}
