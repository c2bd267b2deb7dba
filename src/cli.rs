use std::time::Duration;

use clap::Parser;

use crate::runner::config::{
    self, RunConfig, TargetPolicy, DEFAULT_ABORT_KEY, DEFAULT_MAX_ITERATIONS,
};
use crate::runner::input::InputAction;
use crate::runner::key_event::VirtualKey;

/// Presses "download" on each title of the focused library list, one after
/// another, until stopped or the iteration cap is reached.
#[derive(Debug, Parser)]
#[command(name = "kindle-downloader", version)]
pub struct Cli {
    /// Seconds to wait after each download trigger (1-60; out-of-range
    /// values are clamped)
    #[arg(long, default_value_t = config::DEFAULT_DELAY_SECONDS as i64, allow_negative_numbers = true)]
    pub delay: i64,

    /// Upper bound on trigger/advance iterations per run
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: u32,

    /// Action that starts a download: a key name or click/double-click/right-click
    #[arg(long, default_value = "enter")]
    pub trigger: InputAction,

    /// Action that moves to the next title
    #[arg(long, default_value = "up")]
    pub advance: InputAction,

    /// Global key that aborts the run from any application
    #[arg(long, default_value_t = DEFAULT_ABORT_KEY)]
    pub abort_key: VirtualKey,

    /// Foreground poll interval while waiting for the target window, in ms
    #[arg(long, default_value_t = config::DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub poll_ms: u64,

    /// Consecutive polls the target must hold focus before the run begins
    #[arg(long, default_value_t = config::DEFAULT_STABLE_POLLS)]
    pub stable_polls: u32,

    /// Emit state changes as JSON lines instead of status text
    #[arg(long)]
    pub json: bool,

    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            max_iterations: self.max_iterations,
            trigger: self.trigger,
            advance: self.advance,
            ..RunConfig::default()
        }
        .with_delay(self.delay)
    }

    pub fn target_policy(&self) -> TargetPolicy {
        TargetPolicy {
            poll_interval: Duration::from_millis(self.poll_ms.max(1)),
            stable_polls: self.stable_polls.max(1),
        }
    }
}
