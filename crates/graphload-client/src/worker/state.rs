//! Worker lifecycle states

use std::fmt;

/// Where a worker is in its request loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Waiting for the next request
    Idle,
    /// Executing a statement
    Executing,
    /// Sleeping before the next attempt of the current statement
    Retrying,
    /// Acknowledging end of input
    Draining,
    /// The loop has exited
    Stopped,
}

impl WorkerState {
    pub fn is_stopped(self) -> bool {
        self == WorkerState::Stopped
    }

    /// Whether a request is currently in flight
    pub fn is_busy(self) -> bool {
        matches!(self, WorkerState::Executing | WorkerState::Retrying)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Idle => "idle",
            WorkerState::Executing => "executing",
            WorkerState::Retrying => "retrying",
            WorkerState::Draining => "draining",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
