use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    AwaitingTarget,
    Running,
    Paused,
    Stopped,
}

impl RunState {
    pub fn status_text(self) -> &'static str {
        match self {
            RunState::Idle => "Status: Idle",
            RunState::AwaitingTarget => "Status: Waiting for Kindle\u{2026}",
            RunState::Running => "Status: Running",
            RunState::Paused => "Status: Paused",
            RunState::Stopped => "Status: Stopped",
        }
    }

    /// A run is live from `Start` until the worker's stop report is handled.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            RunState::AwaitingTarget | RunState::Running | RunState::Paused
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAction {
    Start,
    Pause,
    Resume,
    Stop,
    TargetReady,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStateError {
    InvalidTransition { from: RunState, action: RunAction },
}

/// Which commands the control surface may offer in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub can_configure: bool,
    pub can_toggle_pause: bool,
    pub can_stop: bool,
    pub pause_label: &'static str,
}

impl Controls {
    pub fn for_state(state: RunState) -> Self {
        let can_configure = matches!(state, RunState::Idle | RunState::Stopped);
        let active = matches!(state, RunState::Running | RunState::Paused);
        Self {
            can_configure,
            can_toggle_pause: active,
            can_stop: active || state == RunState::AwaitingTarget,
            pause_label: if state == RunState::Paused {
                "Resume"
            } else {
                "Pause"
            },
        }
    }
}

pub struct RunStateMachine {
    state: RunState,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
        }
    }

    pub fn current(&self) -> RunState {
        self.state
    }

    fn transition(
        &mut self,
        allowed: &[RunState],
        to: RunState,
        action: RunAction,
    ) -> Result<(), RunStateError> {
        if allowed.contains(&self.state) {
            self.state = to;
            Ok(())
        } else {
            Err(RunStateError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    /// Checks a transition without applying it.
    fn check(&self, allowed: &[RunState], action: RunAction) -> Result<(), RunStateError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(RunStateError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    pub fn can_start(&self) -> Result<(), RunStateError> {
        self.check(&[RunState::Idle, RunState::Stopped], RunAction::Start)
    }

    pub fn start(&mut self) -> Result<(), RunStateError> {
        self.transition(
            &[RunState::Idle, RunState::Stopped],
            RunState::AwaitingTarget,
            RunAction::Start,
        )
    }

    pub fn target_ready(&mut self) -> Result<(), RunStateError> {
        self.transition(
            &[RunState::AwaitingTarget],
            RunState::Running,
            RunAction::TargetReady,
        )
    }

    pub fn pause(&mut self) -> Result<(), RunStateError> {
        self.transition(&[RunState::Running], RunState::Paused, RunAction::Pause)
    }

    pub fn resume(&mut self) -> Result<(), RunStateError> {
        self.transition(&[RunState::Paused], RunState::Running, RunAction::Resume)
    }

    /// Stop is a request; the state only moves once the worker has finished.
    pub fn can_stop(&self) -> Result<(), RunStateError> {
        self.check(
            &[RunState::AwaitingTarget, RunState::Running, RunState::Paused],
            RunAction::Stop,
        )
    }

    pub fn finish(&mut self) -> Result<(), RunStateError> {
        self.transition(
            &[RunState::AwaitingTarget, RunState::Running, RunState::Paused],
            RunState::Stopped,
            RunAction::Finish,
        )
    }
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_ready_pause_finish_flow() {
        let mut state = RunStateMachine::new();
        assert!(state.start().is_ok());
        assert_eq!(state.current(), RunState::AwaitingTarget);
        assert!(state.target_ready().is_ok());
        assert!(state.pause().is_ok());
        assert!(state.resume().is_ok());
        assert!(state.finish().is_ok());
        assert_eq!(state.current(), RunState::Stopped);
    }

    #[test]
    fn cannot_pause_when_idle() {
        let mut state = RunStateMachine::new();
        assert_eq!(
            state.pause(),
            Err(RunStateError::InvalidTransition {
                from: RunState::Idle,
                action: RunAction::Pause,
            })
        );
        assert_eq!(state.current(), RunState::Idle);
    }

    #[test]
    fn cannot_pause_while_awaiting_target() {
        let mut state = RunStateMachine::new();
        state.start().unwrap();
        assert!(state.pause().is_err());
        assert_eq!(state.current(), RunState::AwaitingTarget);
    }

    #[test]
    fn restart_allowed_only_after_stop() {
        let mut state = RunStateMachine::new();
        state.start().unwrap();
        assert!(state.can_start().is_err());
        assert!(state.start().is_err());
        state.finish().unwrap();
        assert!(state.can_start().is_ok());
        assert!(state.start().is_ok());
    }

    #[test]
    fn stop_only_offered_for_live_runs() {
        let mut state = RunStateMachine::new();
        assert!(state.can_stop().is_err());
        state.start().unwrap();
        assert!(state.can_stop().is_ok());
        state.finish().unwrap();
        assert!(state.can_stop().is_err());
    }

    #[test]
    fn controls_follow_state() {
        let idle = Controls::for_state(RunState::Idle);
        assert!(idle.can_configure && !idle.can_toggle_pause && !idle.can_stop);

        let waiting = Controls::for_state(RunState::AwaitingTarget);
        assert!(!waiting.can_configure && !waiting.can_toggle_pause && waiting.can_stop);

        let paused = Controls::for_state(RunState::Paused);
        assert!(paused.can_toggle_pause && paused.can_stop);
        assert_eq!(paused.pause_label, "Resume");
        assert_eq!(Controls::for_state(RunState::Running).pause_label, "Pause");
    }

    #[test]
    fn status_text_names_each_state() {
        assert_eq!(RunState::Running.status_text(), "Status: Running");
        assert!(RunState::AwaitingTarget.status_text().contains("Waiting"));
    }
}
