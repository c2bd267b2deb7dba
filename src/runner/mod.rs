//! Run control for the download automation: the state machine, the worker
//! that drives the target application, and the global abort hotkey.

pub mod config;
pub mod controller;
pub mod error;
pub mod foreground;
pub mod hotkey;
pub mod input;
pub mod key_event;
pub mod platform;
pub mod signal;
pub mod state;
pub mod types;
pub mod wait;
pub mod worker;

pub use config::{clamp_delay, parse_delay, RunConfig, TargetPolicy};
pub use controller::{RunController, RunHandle, StateObserver};
pub use error::{HookError, InjectError, RunError};
pub use foreground::{ForegroundProbe, WindowId};
pub use hotkey::HotkeyListener;
pub use input::{InputAction, InputInjector, MouseButton};
pub use key_event::VirtualKey;
pub use state::{Controls, RunState};
pub use types::{RunEnd, RunSummary, StateChange, WorkerReport};
