//! Task state machine

use serde::{Deserialize, Serialize};

/// Possible states of a tracked generation task
///
/// States only move forward: `Creating -> Polling -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Creation call in flight, no remote id yet
    Creating,

    /// Remote task exists and is being checked on a schedule
    Polling,

    /// Remote task produced its tracks
    Succeeded,

    /// Remote service reported the job itself as failed
    Failed,

    /// Attempt or wall-clock ceiling reached while still in progress
    TimedOut,

    /// Creation failed or a status check failed permanently
    Errored,

    /// Caller went away; no business event is emitted
    Cancelled,
}

impl TaskState {
    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded
                | TaskState::Failed
                | TaskState::TimedOut
                | TaskState::Errored
                | TaskState::Cancelled
        )
    }

    /// Check if task is still being tracked
    pub fn is_active(&self) -> bool {
        matches!(self, TaskState::Creating | TaskState::Polling)
    }

    /// Check if task completed successfully
    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Succeeded)
    }

    /// Whether `next` is a legal forward transition from this state
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        match self {
            TaskState::Creating => next != TaskState::Creating,
            TaskState::Polling => next.is_terminal(),
            _ => false,
        }
    }

    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskState::Creating => "Creating",
            TaskState::Polling => "Polling",
            TaskState::Succeeded => "Succeeded",
            TaskState::Failed => "Failed",
            TaskState::TimedOut => "Timed out",
            TaskState::Errored => "Errored",
            TaskState::Cancelled => "Cancelled",
        }
    }

    /// Get a symbol for the state (for terminal output)
    pub fn symbol(&self) -> &'static str {
        match self {
            TaskState::Creating => "◯",
            TaskState::Polling => "⟳",
            TaskState::Succeeded => "✓",
            TaskState::Failed => "✗",
            TaskState::TimedOut => "⏱",
            TaskState::Errored => "!",
            TaskState::Cancelled => "⊘",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
