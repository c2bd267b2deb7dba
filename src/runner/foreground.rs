//! Detects when the user has switched focus to the application to automate.

use tracing::{debug, trace};

use super::config::TargetPolicy;
use super::platform;
use super::signal::RunSignals;

/// Opaque identity of a top-level window (an HWND on Windows, the owning
/// pid on macOS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

pub trait ForegroundProbe: Send + Sync {
    /// The focused top-level window, if the OS reports one.
    fn foreground(&self) -> Option<WindowId>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemForeground;

impl ForegroundProbe for SystemForeground {
    fn foreground(&self) -> Option<WindowId> {
        platform::foreground_window()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    Ready,
    Cancelled,
}

/// Polls until some window other than `control` has held focus for
/// `policy.stable_polls` consecutive polls. Flicker back to the control
/// window, or to no window at all, restarts the count.
///
/// Never times out on its own; the only other exit is cancellation.
pub fn wait_for_target(
    probe: &dyn ForegroundProbe,
    control: Option<WindowId>,
    policy: &TargetPolicy,
    signals: &RunSignals,
) -> TargetOutcome {
    let required = policy.stable_polls.max(1);
    let mut stable = 0_u32;

    while !signals.is_cancelled() {
        match probe.foreground() {
            Some(window) if Some(window) != control => {
                stable += 1;
                trace!(?window, stable, "foreground away from control window");
                if stable >= required {
                    debug!(?window, "target window ready");
                    return TargetOutcome::Ready;
                }
            }
            other => {
                if stable > 0 {
                    trace!(?other, "focus returned; stability reset");
                }
                stable = 0;
            }
        }

        if signals.cancellation().wait_set_timeout(policy.poll_interval) {
            break;
        }
    }

    TargetOutcome::Cancelled
}
