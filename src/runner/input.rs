//! Synthetic input sent to whatever window has focus.

use std::fmt;
use std::str::FromStr;

use super::error::InjectError;
use super::key_event::VirtualKey;
use super::platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// One logical step of the automation: a key tap or a burst of clicks at the
/// current cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Key(VirtualKey),
    Click { button: MouseButton, count: u8 },
}

impl fmt::Display for InputAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputAction::Key(key) => write!(f, "{key}"),
            InputAction::Click {
                button: MouseButton::Left,
                count: 2,
            } => write!(f, "double-click"),
            InputAction::Click {
                button: MouseButton::Left,
                count,
            } => write!(f, "click x{count}"),
            InputAction::Click {
                button: MouseButton::Right,
                count,
            } => write!(f, "right-click x{count}"),
        }
    }
}

impl FromStr for InputAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let click = |button, count| InputAction::Click { button, count };
        match value.trim().to_ascii_lowercase().as_str() {
            "click" => Ok(click(MouseButton::Left, 1)),
            "double-click" | "doubleclick" => Ok(click(MouseButton::Left, 2)),
            "right-click" | "rightclick" => Ok(click(MouseButton::Right, 1)),
            _ => value.parse::<VirtualKey>().map(InputAction::Key),
        }
    }
}

/// Sends press/release pairs into the OS input stream.
pub trait InputInjector: Send + Sync {
    fn send(&self, action: &InputAction) -> Result<(), InjectError>;
}

/// Injector backed by the native input API of the running platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInput;

impl InputInjector for SystemInput {
    fn send(&self, action: &InputAction) -> Result<(), InjectError> {
        match *action {
            InputAction::Key(key) => platform::send_key(key),
            InputAction::Click { button, count } => platform::send_clicks(button, count),
        }
    }
}
