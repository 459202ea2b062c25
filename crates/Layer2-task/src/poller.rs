//! Task Poller - one task from creation to terminal outcome
//!
//! ```text
//!   Creating ──create ok──▶ Polling ──┬─▶ Succeeded
//!      │                      │  ▲    ├─▶ Failed
//!      └──create err──▶ Errored  │    ├─▶ TimedOut
//!                             └──┘    ├─▶ Errored
//!                          continue   └─▶ Cancelled (no event)
//! ```
//!
//! Each tracked task runs in its own spawned loop. The loop suspends only on
//! the scheduled delay and on the status call; both race the task's
//! cancellation token. Exactly one terminal event is emitted per task.

use crate::backoff::BackoffPolicy;
use crate::classify::{PollOutcome, StatusClassifier};
use crate::registry::{Registration, TaskRegistry};
use crate::session::SessionContext;
use crate::state::TaskState;
use crate::task::Task;
use cadence_foundation::{ApiLog, Error, PollingConfig, Result, TaskEvent, TaskId};
use cadence_provider::{GenerationRequest, RawStatus, RemoteClient, RemoteError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handle to a spawned poll loop
#[derive(Debug)]
pub struct TrackedTask {
    pub task_id: TaskId,
    join: JoinHandle<TaskState>,
}

impl TrackedTask {
    /// Wait for the loop to finish and return the final state
    pub async fn wait(self) -> TaskState {
        match self.join.await {
            Ok(state) => state,
            Err(e) if e.is_cancelled() => TaskState::Cancelled,
            Err(e) => {
                warn!(task_id = %self.task_id, "Poll loop panicked: {}", e);
                TaskState::Errored
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Creates remote tasks and drives their poll loops
pub struct TaskPoller {
    client: Arc<dyn RemoteClient>,
    registry: Arc<TaskRegistry>,
    config: Arc<PollingConfig>,
    classifier: Arc<StatusClassifier>,
    backoff: BackoffPolicy,
}

impl TaskPoller {
    pub fn new(
        client: Arc<dyn RemoteClient>,
        registry: Arc<TaskRegistry>,
        config: PollingConfig,
    ) -> Self {
        let classifier = Arc::new(StatusClassifier::from_config(&config));
        let backoff = BackoffPolicy::from_config(&config);
        Self {
            client,
            registry,
            config: Arc::new(config),
            classifier,
            backoff,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Cancel one task; no-op for unknown ids
    pub fn cancel(&self, task_id: &TaskId) -> bool {
        self.registry.cancel(task_id)
    }

    /// Validate, create and start polling a new generation task
    ///
    /// Every failure is reported to the session as a single `task_errored`
    /// and yields `None`. A closed session yields `None` silently.
    pub async fn submit(&self, ctx: &SessionContext, request: GenerationRequest) -> Option<TrackedTask> {
        let kind = request.kind();
        let mut task = Task::creating(ctx.id().clone(), kind);
        // The ceiling counts from here, so time spent in create is included
        let origin = Instant::now();

        if ctx.is_closed() {
            debug!(session_id = %ctx.id(), "Session closed, submission dropped");
            return None;
        }

        if let Err(e) = request.validate() {
            warn!(session_id = %ctx.id(), kind = %kind, "Request rejected: {}", e);
            return self.reject(ctx, &mut task, e.to_string(), e.code());
        }

        if let Err(e) = self.check_limits(ctx) {
            warn!(session_id = %ctx.id(), kind = %kind, "Creation rate limited: {}", e);
            return self.reject(ctx, &mut task, e.to_string(), e.code());
        }

        ctx.emit_log(ApiLog::Request {
            kind,
            data: self.client.payload_for(&request),
        });

        let request_timeout = self.config.request_timeout();
        let created = tokio::select! {
            biased;
            _ = ctx.token().cancelled() => {
                debug!(session_id = %ctx.id(), "Session closed during creation");
                return None;
            }
            result = timeout(request_timeout, self.client.create(&request)) => {
                result.unwrap_or_else(|_| Err(RemoteError::request_timeout(request_timeout)))
            }
        };

        let created = match created {
            Ok(created) => created,
            Err(e) => {
                warn!(session_id = %ctx.id(), kind = %kind, code = %e.code, "Task creation failed: {}", e.message);
                ctx.emit_log(ApiLog::Response {
                    kind,
                    data: json!({
                        "error": { "code": e.code.as_str(), "message": e.message, "httpStatus": e.http_status }
                    }),
                });
                return self.reject(ctx, &mut task, e.message.clone(), e.code.as_str().to_string());
            }
        };

        ctx.emit_log(ApiLog::Response {
            kind,
            data: created.response.clone(),
        });

        let task_id = created.task_id;
        if let Err(e) = task.created(task_id.clone()) {
            warn!(task_id = %task_id, "{}", e);
            return None;
        }

        let registration = match self.registry.register(
            task_id.clone(),
            ctx.token().child_token(),
            ctx.id().clone(),
        ) {
            Ok(registration) => registration,
            Err(e) => {
                // Another loop already owns this id and its events
                warn!(task_id = %task_id, "Poller not started: {}", e);
                return self.reject(ctx, &mut task, e.to_string(), e.code());
            }
        };

        info!(task_id = %task_id, session_id = %ctx.id(), kind = %kind, "Task created");
        ctx.emit_task(TaskEvent::TaskCreated {
            task_id: task_id.clone(),
        });

        Some(self.spawn(ctx, task, registration, origin, self.config.initial_delay()))
    }

    /// Start polling a task id that was created earlier
    pub async fn track(&self, ctx: &SessionContext, task_id: TaskId) -> Result<TrackedTask> {
        if ctx.is_closed() {
            return Err(Error::Cancelled);
        }
        let active = self.registry.active_for_session(ctx.id());
        if let Some(message) = ctx.limiter().check_active(active).message() {
            return Err(Error::RateLimited(message));
        }

        let registration = self.registry.register(
            task_id.clone(),
            ctx.token().child_token(),
            ctx.id().clone(),
        )?;

        info!(task_id = %task_id, session_id = %ctx.id(), "Tracking existing task");
        ctx.emit_task(TaskEvent::TaskCreated {
            task_id: task_id.clone(),
        });

        let task = Task::resume(ctx.id().clone(), task_id);
        Ok(self.spawn(ctx, task, registration, Instant::now(), Duration::ZERO))
    }

    fn check_limits(&self, ctx: &SessionContext) -> Result<()> {
        let active = self.registry.active_for_session(ctx.id());
        if let Some(message) = ctx.limiter().check_active(active).message() {
            return Err(Error::RateLimited(message));
        }
        // Counted against the window only once the active check passed
        if let Some(message) = ctx.limiter().try_acquire().message() {
            return Err(Error::RateLimited(message));
        }
        Ok(())
    }

    fn reject(
        &self,
        ctx: &SessionContext,
        task: &mut Task,
        reason: String,
        code: String,
    ) -> Option<TrackedTask> {
        if task.advance(TaskState::Errored).is_ok() {
            ctx.emit_task(TaskEvent::TaskErrored {
                task_id: None,
                reason,
                code,
            });
        }
        None
    }

    fn spawn(
        &self,
        ctx: &SessionContext,
        task: Task,
        registration: Registration,
        origin: Instant,
        first_delay: Duration,
    ) -> TrackedTask {
        let task_id = registration.task_id.clone();
        let poll_loop = PollLoop {
            client: Arc::clone(&self.client),
            classifier: Arc::clone(&self.classifier),
            config: Arc::clone(&self.config),
            backoff: self.backoff.clone(),
            ctx: ctx.clone(),
            token: registration.token.clone(),
            guard: RegistrationGuard {
                registry: Arc::clone(&self.registry),
                registration,
            },
            task,
        };

        TrackedTask {
            task_id,
            join: tokio::spawn(poll_loop.run(origin, first_delay)),
        }
    }
}

impl std::fmt::Debug for TaskPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPoller")
            .field("client", &self.client.id())
            .field("registry", &self.registry)
            .finish()
    }
}

/// Releases the registry entry when the loop ends, however it ends
struct RegistrationGuard {
    registry: Arc<TaskRegistry>,
    registration: Registration,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.release(&self.registration);
    }
}

struct PollLoop {
    client: Arc<dyn RemoteClient>,
    classifier: Arc<StatusClassifier>,
    config: Arc<PollingConfig>,
    backoff: BackoffPolicy,
    ctx: SessionContext,
    token: CancellationToken,
    guard: RegistrationGuard,
    task: Task,
}

impl PollLoop {
    fn task_id(&self) -> &TaskId {
        &self.guard.registration.task_id
    }

    /// `origin` is when the task was created; the wall-clock ceiling counts from it
    async fn run(mut self, origin: Instant, first_delay: Duration) -> TaskState {
        let deadline = origin + self.config.timeout();
        let max_attempts = self.config.max_attempts;
        let mut delay = first_delay;

        loop {
            let wake = (Instant::now() + delay).min(deadline);
            let cancelled = tokio::select! {
                biased;
                _ = self.token.cancelled() => true,
                _ = sleep_until(wake) => false,
            };
            if cancelled {
                return self.cancelled();
            }

            if Instant::now() >= deadline {
                return self.timed_out(origin);
            }

            let attempt = self.task.record_attempt();
            self.guard.registration.set_attempts(attempt);

            let call_timeout = self
                .config
                .request_timeout()
                .min(deadline.saturating_duration_since(Instant::now()));
            let result = tokio::select! {
                biased;
                _ = self.token.cancelled() => None,
                result = timeout(call_timeout, self.client.check_status(self.task_id())) => {
                    Some(result.unwrap_or_else(|_| Err(RemoteError::request_timeout(call_timeout))))
                }
            };
            let result = match result {
                Some(result) => result,
                None => return self.cancelled(),
            };

            // A result that lands after cancellation or the ceiling is discarded
            if self.token.is_cancelled() {
                return self.cancelled();
            }
            if Instant::now() >= deadline {
                return self.timed_out(origin);
            }

            if let Some(state) = self.handle(attempt, result) {
                return state;
            }

            if attempt >= max_attempts {
                return self.timed_out(origin);
            }

            delay = self.backoff.delay(attempt);
            debug!(task_id = %self.task_id(), attempt, delay_ms = delay.as_millis() as u64, "Next check scheduled");
        }
    }

    /// Apply one check result; `Some` means the loop is over
    fn handle(&mut self, attempt: u32, result: std::result::Result<RawStatus, RemoteError>) -> Option<TaskState> {
        let task_id = self.task_id().clone();

        if let Ok(ref raw) = result {
            self.ctx.emit_log(ApiLog::Poll {
                task_id: task_id.clone(),
                attempt,
                status: raw.status.clone(),
            });
        }

        match self.classifier.classify(result) {
            PollOutcome::Continue { status, tracks } => {
                debug!(task_id = %task_id, attempt, status = %status, "Task in progress");
                self.ctx.emit_task(TaskEvent::TaskProgress {
                    task_id,
                    status,
                    tracks,
                });
                None
            }
            PollOutcome::Success { tracks } => {
                info!(task_id = %task_id, attempt, tracks = tracks.len(), "Task succeeded");
                Some(self.finish(
                    TaskState::Succeeded,
                    TaskEvent::TaskSucceeded { task_id, tracks },
                ))
            }
            PollOutcome::Fatal {
                status,
                reason,
                code,
            } => {
                warn!(task_id = %task_id, attempt, status = %status, "Task failed: {}", reason);
                self.ctx.emit_log(ApiLog::Error {
                    task_id: Some(task_id.clone()),
                    code: code.clone().unwrap_or_else(|| status.clone()),
                    message: reason.clone(),
                });
                Some(self.finish(
                    TaskState::Failed,
                    TaskEvent::TaskFailed {
                        task_id,
                        reason,
                        code,
                    },
                ))
            }
            PollOutcome::TransientError(err) => {
                warn!(task_id = %task_id, attempt, code = %err.code, "Status check failed, will retry: {}", err.message);
                self.ctx.emit_log(ApiLog::Error {
                    task_id: Some(task_id),
                    code: err.code.as_str().to_string(),
                    message: err.message,
                });
                None
            }
            PollOutcome::PermanentError(err) => {
                warn!(task_id = %task_id, attempt, code = %err.code, "Status check failed permanently: {}", err.message);
                self.ctx.emit_log(ApiLog::Error {
                    task_id: Some(task_id.clone()),
                    code: err.code.as_str().to_string(),
                    message: err.message.clone(),
                });
                Some(self.finish(
                    TaskState::Errored,
                    TaskEvent::TaskErrored {
                        task_id: Some(task_id),
                        reason: err.message,
                        code: err.code.as_str().to_string(),
                    },
                ))
            }
        }
    }

    fn timed_out(&mut self, origin: Instant) -> TaskState {
        let attempts = self.task.attempt_count;
        let elapsed_ms = origin.elapsed().as_millis() as u64;
        warn!(task_id = %self.task_id(), attempts, elapsed_ms, "Task timed out");

        let event = TaskEvent::TaskTimedOut {
            task_id: self.task_id().clone(),
            attempts,
            elapsed_ms,
        };
        self.finish(TaskState::TimedOut, event)
    }

    fn cancelled(&mut self) -> TaskState {
        debug!(task_id = %self.task_id(), attempts = self.task.attempt_count, "Poll loop cancelled");
        if let Err(e) = self.task.advance(TaskState::Cancelled) {
            warn!(task_id = %self.task_id(), "{}", e);
        }
        self.task.state
    }

    /// Move to a terminal state and emit its event, at most once
    fn finish(&mut self, state: TaskState, event: TaskEvent) -> TaskState {
        match self.task.advance(state) {
            Ok(()) => self.ctx.emit_task(event),
            Err(e) => warn!(task_id = %self.task_id(), "Terminal event suppressed: {}", e),
        }
        self.task.state
    }
}
