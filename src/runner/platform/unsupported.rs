use crate::runner::error::{HookError, InjectError};
use crate::runner::foreground::WindowId;
use crate::runner::hotkey::{KeyEventPump, KeySink, ReadySender};
use crate::runner::input::MouseButton;
use crate::runner::key_event::VirtualKey;

use super::SystemKeyPump;

pub fn send_key(_key: VirtualKey) -> Result<(), InjectError> {
    Err(InjectError::Unsupported)
}

pub fn send_clicks(_button: MouseButton, _count: u8) -> Result<(), InjectError> {
    Err(InjectError::Unsupported)
}

pub fn foreground_window() -> Option<WindowId> {
    None
}

impl KeyEventPump for SystemKeyPump {
    fn run(self: Box<Self>, ready: ReadySender, _sink: KeySink) {
        let _ = ready.send(Err(HookError::Unsupported));
    }
}
