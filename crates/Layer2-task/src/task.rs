//! Task definition
//!
//! A `Task` is owned by exactly one poll loop. The registry only ever sees
//! its id, session and cancellation handle.

use crate::state::TaskState;
use cadence_foundation::{Error, GenerationKind, Result, SessionId, TaskId};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// One in-flight generation job
#[derive(Debug, Clone)]
pub struct Task {
    /// Remote task id (None while the creation call is in flight)
    pub id: Option<TaskId>,

    /// Session this task belongs to
    pub session_id: SessionId,

    /// Request kind (None when resuming an existing remote id)
    pub kind: Option<GenerationKind>,

    /// Current state
    pub state: TaskState,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// Status checks performed so far
    pub attempt_count: u32,

    /// When the most recent check was issued
    pub last_poll_at: Option<DateTime<Utc>>,

    /// When the task reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task whose creation call is about to be issued
    pub fn creating(session_id: SessionId, kind: GenerationKind) -> Self {
        Self {
            id: None,
            session_id,
            kind: Some(kind),
            state: TaskState::Creating,
            created_at: Utc::now(),
            attempt_count: 0,
            last_poll_at: None,
            completed_at: None,
        }
    }

    /// Resume tracking of a remote task that already exists
    pub fn resume(session_id: SessionId, id: TaskId) -> Self {
        Self {
            id: Some(id),
            session_id,
            kind: None,
            state: TaskState::Polling,
            created_at: Utc::now(),
            attempt_count: 0,
            last_poll_at: None,
            completed_at: None,
        }
    }

    /// Record the remote id and start polling
    pub fn created(&mut self, id: TaskId) -> Result<()> {
        self.advance(TaskState::Polling)?;
        self.id = Some(id);
        Ok(())
    }

    /// Move to `next`, rejecting backward moves and moves out of a terminal state
    pub fn advance(&mut self, next: TaskState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::Internal(format!(
                "illegal task transition {} -> {}",
                self.state, next
            )));
        }
        self.state = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Count a status check; returns the new attempt number (1-based)
    pub fn record_attempt(&mut self) -> u32 {
        self.attempt_count += 1;
        self.last_poll_at = Some(Utc::now());
        self.attempt_count
    }

    /// Check if task is still active (creating or polling)
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Time since creation (or until completion)
    pub fn age(&self) -> Duration {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        (end - self.created_at).to_std().unwrap_or_default()
    }

    /// Remote id for logging; "-" before creation completes
    pub fn label(&self) -> &str {
        self.id.as_ref().map(|id| id.as_str()).unwrap_or("-")
    }
}
