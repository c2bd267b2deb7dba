use std::time::Duration;

use super::input::InputAction;
use super::key_event::VirtualKey;

pub const DEFAULT_DELAY_SECONDS: u32 = 3;
pub const MIN_DELAY_SECONDS: u32 = 1;
pub const MAX_DELAY_SECONDS: u32 = 60;
pub const DEFAULT_MAX_ITERATIONS: u32 = 800;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);
pub const DEFAULT_STABLE_POLLS: u32 = 3;
pub const DEFAULT_ABORT_KEY: VirtualKey = VirtualKey::F(9);

/// Clamps a requested delay into range. Anything below the minimum is
/// treated as "no usable value" and replaced by the default.
pub fn clamp_delay(requested: i64) -> u32 {
    if requested < i64::from(MIN_DELAY_SECONDS) {
        DEFAULT_DELAY_SECONDS
    } else if requested > i64::from(MAX_DELAY_SECONDS) {
        MAX_DELAY_SECONDS
    } else {
        requested as u32
    }
}

/// Reads a delay the way the dialog's edit box was read: unparseable text
/// falls back to the default.
pub fn parse_delay(text: &str) -> u32 {
    match text.trim().parse::<i64>() {
        Ok(value) => clamp_delay(value),
        Err(_) => DEFAULT_DELAY_SECONDS,
    }
}

/// Settings captured when a run starts. Immutable for that run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub delay_seconds: u32,
    pub max_iterations: u32,
    pub debounce: Duration,
    pub trigger: InputAction,
    pub advance: InputAction,
}

impl RunConfig {
    /// Returns a copy with `delay_seconds` replaced by the clamped request.
    pub fn with_delay(&self, requested: i64) -> Self {
        Self {
            delay_seconds: clamp_delay(requested),
            ..self.clone()
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.delay_seconds))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            delay_seconds: DEFAULT_DELAY_SECONDS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            debounce: DEFAULT_DEBOUNCE,
            trigger: InputAction::Key(VirtualKey::Return),
            // Up, not Down: the library list is walked bottom to top.
            advance: InputAction::Key(VirtualKey::Up),
        }
    }
}

/// How the foreground detector decides the target window is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPolicy {
    pub poll_interval: Duration,
    pub stable_polls: u32,
}

impl Default for TargetPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            stable_polls: DEFAULT_STABLE_POLLS,
        }
    }
}
