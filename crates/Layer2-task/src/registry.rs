//! Task Registry - active poll loops by task id
//!
//! Holds only cancellation handles and metadata. One live entry per task id;
//! register/cancel/iteration are serialized by a single mutex.

use cadence_foundation::{Error, Result, SessionId, TaskId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct Entry {
    session_id: SessionId,
    token: CancellationToken,
    created_at: DateTime<Utc>,
    started: Instant,
    attempts: Arc<AtomicU32>,
    generation: u64,
}

/// Handle returned to the poll loop that owns a registry entry
#[derive(Debug, Clone)]
pub struct Registration {
    pub task_id: TaskId,
    pub token: CancellationToken,
    /// Shared with the registry so `stats()` sees live attempt counts
    pub attempts: Arc<AtomicU32>,
    generation: u64,
}

impl Registration {
    pub fn set_attempts(&self, attempts: u32) {
        self.attempts.store(attempts, Ordering::Relaxed);
    }
}

/// Read-only view of one entry
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStats {
    pub task_id: TaskId,
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub age: Duration,
    pub attempts: u32,
}

/// Snapshot of the registry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryStats {
    pub active: usize,
    pub tasks: Vec<TaskStats>,
}

/// Concurrent map from task id to its polling context
#[derive(Default)]
pub struct TaskRegistry {
    entries: Mutex<HashMap<TaskId, Entry>>,
    next_generation: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a poll loop for `task_id`
    ///
    /// Fails with `DuplicateTask` while a live entry exists for the id.
    pub fn register(
        &self,
        task_id: TaskId,
        token: CancellationToken,
        session_id: SessionId,
    ) -> Result<Registration> {
        let mut entries = self.entries.lock();

        if entries.contains_key(&task_id) {
            warn!(task_id = %task_id, session_id = %session_id, "Task already tracked");
            return Err(Error::DuplicateTask(task_id.to_string()));
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let attempts = Arc::new(AtomicU32::new(0));

        entries.insert(
            task_id.clone(),
            Entry {
                session_id: session_id.clone(),
                token: token.clone(),
                created_at: Utc::now(),
                started: Instant::now(),
                attempts: Arc::clone(&attempts),
                generation,
            },
        );

        debug!(task_id = %task_id, session_id = %session_id, active = entries.len(), "Task registered");

        Ok(Registration {
            task_id,
            token,
            attempts,
            generation,
        })
    }

    /// Cancel one task. Unknown or finished ids are a no-op.
    ///
    /// Returns whether a live entry was cancelled.
    pub fn cancel(&self, task_id: &TaskId) -> bool {
        let removed = self.entries.lock().remove(task_id);
        match removed {
            Some(entry) => {
                entry.token.cancel();
                info!(task_id = %task_id, session_id = %entry.session_id, "Task cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every task owned by `session_id`; returns how many were cancelled
    pub fn cancel_all_for_session(&self, session_id: &SessionId) -> usize {
        let removed: Vec<(TaskId, Entry)> = {
            let mut entries = self.entries.lock();
            let ids: Vec<TaskId> = entries
                .iter()
                .filter(|(_, e)| &e.session_id == session_id)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| entries.remove(&id).map(|e| (id, e)))
                .collect()
        };

        for (_, entry) in &removed {
            entry.token.cancel();
        }

        if !removed.is_empty() {
            info!(session_id = %session_id, count = removed.len(), "Session tasks cancelled");
        }
        removed.len()
    }

    /// Drop the entry owned by `registration`, if it is still the live one
    pub fn release(&self, registration: &Registration) -> bool {
        let mut entries = self.entries.lock();
        let owned = entries
            .get(&registration.task_id)
            .map(|e| e.generation == registration.generation)
            .unwrap_or(false);

        if owned {
            entries.remove(&registration.task_id);
            debug!(task_id = %registration.task_id, active = entries.len(), "Task released");
        }
        owned
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.entries.lock().contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Ids owned by a session
    pub fn tasks_for_session(&self, session_id: &SessionId) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, e)| &e.session_id == session_id)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn active_for_session(&self, session_id: &SessionId) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|e| &e.session_id == session_id)
            .count()
    }

    /// Owned snapshot, sorted by task id
    pub fn stats(&self) -> RegistryStats {
        let entries = self.entries.lock();
        let mut tasks: Vec<TaskStats> = entries
            .iter()
            .map(|(id, e)| TaskStats {
                task_id: id.clone(),
                session_id: e.session_id.clone(),
                created_at: e.created_at,
                age: e.started.elapsed(),
                attempts: e.attempts.load(Ordering::Relaxed),
            })
            .collect();
        tasks.sort_by(|a, b| a.task_id.cmp(&b.task_id));

        RegistryStats {
            active: tasks.len(),
            tasks,
        }
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("active", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> SessionId {
        SessionId::from(id)
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = TaskRegistry::new();
        registry
            .register(TaskId::from("t-1"), CancellationToken::new(), session("a"))
            .unwrap();

        let err = registry
            .register(TaskId::from("t-1"), CancellationToken::new(), session("b"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateTask(ref id) if id == "t-1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let registry = TaskRegistry::new();
        let reg = registry
            .register(TaskId::from("t-1"), CancellationToken::new(), session("a"))
            .unwrap();

        assert!(registry.cancel(&reg.task_id));
        assert!(reg.token.is_cancelled());
        assert!(!registry.contains(&reg.task_id));

        assert!(!registry.cancel(&reg.task_id));
        assert!(!registry.cancel(&TaskId::from("never-registered")));
    }

    #[test]
    fn test_release_only_removes_own_entry() {
        let registry = TaskRegistry::new();
        let first = registry
            .register(TaskId::from("t-1"), CancellationToken::new(), session("a"))
            .unwrap();
        registry.cancel(&first.task_id);

        let second = registry
            .register(TaskId::from("t-1"), CancellationToken::new(), session("a"))
            .unwrap();

        // A stale loop finishing late must not evict the new entry
        assert!(!registry.release(&first));
        assert!(registry.contains(&second.task_id));
        assert!(registry.release(&second));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cancel_all_for_session() {
        let registry = TaskRegistry::new();
        let a1 = registry
            .register(TaskId::from("a-1"), CancellationToken::new(), session("a"))
            .unwrap();
        let a2 = registry
            .register(TaskId::from("a-2"), CancellationToken::new(), session("a"))
            .unwrap();
        let b1 = registry
            .register(TaskId::from("b-1"), CancellationToken::new(), session("b"))
            .unwrap();

        assert_eq!(registry.active_for_session(&session("a")), 2);
        assert_eq!(registry.cancel_all_for_session(&session("a")), 2);
        assert!(a1.token.is_cancelled() && a2.token.is_cancelled());
        assert!(!b1.token.is_cancelled());
        assert_eq!(registry.tasks_for_session(&session("b")), vec![TaskId::from("b-1")]);
        assert_eq!(registry.cancel_all_for_session(&session("a")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_snapshot() {
        let registry = TaskRegistry::new();
        let reg = registry
            .register(TaskId::from("t-1"), CancellationToken::new(), session("a"))
            .unwrap();
        reg.set_attempts(3);
        tokio::time::advance(Duration::from_secs(5)).await;

        let stats = registry.stats();
        assert_eq!(stats.active, 1);
        assert_eq!(stats.tasks[0].attempts, 3);
        assert_eq!(stats.tasks[0].session_id, session("a"));
        assert!(stats.tasks[0].age >= Duration::from_secs(5));

        // Snapshot is detached from the registry
        registry.cancel(&reg.task_id);
        assert_eq!(stats.active, 1);
        assert!(registry.stats().tasks.is_empty());
    }
}
