use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::RunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEnd {
    /// Cancelled before the target window was ever ready.
    CancelledBeforeTarget,
    Cancelled,
    /// Ran every iteration without being cancelled.
    Exhausted,
}

/// What a finished worker did. Failed injections are counted but still
/// advance the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub end: RunEnd,
    pub iterations: u32,
    pub triggers: u32,
    pub advances: u32,
    pub injection_failures: u32,
}

impl RunSummary {
    pub fn new(end: RunEnd) -> Self {
        Self {
            end,
            iterations: 0,
            triggers: 0,
            advances: 0,
            injection_failures: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    TargetReady,
    Finished(RunSummary),
}

/// Sent from the worker thread to the control thread. The worker never
/// touches run state directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub run_id: Uuid,
    pub status: WorkerStatus,
}

/// Payload of an `OnStateChanged` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub state: RunState,
    pub run_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}
