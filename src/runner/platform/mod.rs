//! Native input, focus and keyboard-hook backends.
//!
//! Windows and macOS have real implementations; everywhere else every call
//! reports that it is unsupported.

#[cfg(target_os = "macos")]
mod macos;
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
mod unsupported;
#[cfg(target_os = "windows")]
mod win32;

#[cfg(target_os = "macos")]
use macos as imp;
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
use unsupported as imp;
#[cfg(target_os = "windows")]
use win32 as imp;

pub use imp::{foreground_window, send_clicks, send_key};

/// The platform's global keyboard hook, as a [`KeyEventPump`].
///
/// [`KeyEventPump`]: super::hotkey::KeyEventPump
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemKeyPump;
