use std::io;
use std::time::Duration;

use thiserror::Error;

use super::state::{RunAction, RunState, RunStateError};

/// Errors returned by run-control commands. A command that fails leaves the
/// run state untouched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot {action:?} while {from:?}")]
    InvalidTransition { from: RunState, action: RunAction },

    #[error("failed to spawn automation worker: {0}")]
    Spawn(#[source] io::Error),
}

impl From<RunStateError> for RunError {
    fn from(error: RunStateError) -> Self {
        match error {
            RunStateError::InvalidTransition { from, action } => {
                RunError::InvalidTransition { from, action }
            }
        }
    }
}

/// Synthetic input that the OS did not take. Never changes run control flow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InjectError {
    #[error("input injection is not supported on this platform")]
    Unsupported,

    #[error("key {key} has no code on this platform")]
    UnmappedKey { key: String },

    #[error("OS accepted {sent} of {expected} input events")]
    Partial { sent: u32, expected: u32 },

    #[error("input injection failed: {0}")]
    Platform(String),
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("global keyboard hook is not supported on this platform")]
    Unsupported,

    #[error("failed to install keyboard hook: {0}")]
    Install(String),

    #[error("timed out after {0:?} waiting for keyboard hook setup")]
    ReadyTimeout(Duration),

    #[error("keyboard hook thread exited before signalling ready")]
    Disconnected,

    #[error("failed to spawn keyboard hook thread: {0}")]
    Spawn(#[source] io::Error),
}
