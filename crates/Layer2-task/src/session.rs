//! Sessions
//!
//! A `SessionContext` is created per connected client and passed explicitly
//! into the poller. `SessionHandler` is the connection-level entry point.

use crate::limiter::RateLimiter;
use crate::poller::{TaskPoller, TrackedTask};
use cadence_foundation::{
    ApiLog, Error, EventSink, GenerationKind, Result, SessionEvent, SessionId, SessionLimits,
    TaskEvent, TaskId,
};
use cadence_provider::GenerationRequest;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Per-client context: identity, event sink, rate limiter
#[derive(Clone)]
pub struct SessionContext {
    id: SessionId,
    sink: Arc<dyn EventSink>,
    limiter: Arc<RateLimiter>,
    /// Parent of every task token in this session
    token: CancellationToken,
}

impl SessionContext {
    pub fn new(sink: Arc<dyn EventSink>, limits: SessionLimits) -> Self {
        Self::with_id(SessionId::new(), sink, limits)
    }

    pub fn with_id(id: SessionId, sink: Arc<dyn EventSink>, limits: SessionLimits) -> Self {
        Self {
            id,
            sink,
            limiter: Arc::new(RateLimiter::new(limits)),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn emit(&self, event: impl Into<SessionEvent>) {
        self.sink.emit(event.into());
    }

    pub fn emit_task(&self, event: TaskEvent) {
        self.emit(event);
    }

    pub fn emit_log(&self, log: ApiLog) {
        self.emit(log);
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("id", &self.id)
            .field("sink", &self.sink.name())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Connection-level façade over the poller
pub struct SessionHandler {
    ctx: SessionContext,
    poller: Arc<TaskPoller>,
}

impl SessionHandler {
    pub fn new(ctx: SessionContext, poller: Arc<TaskPoller>) -> Self {
        Self { ctx, poller }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn session_id(&self) -> &SessionId {
        self.ctx.id()
    }

    pub async fn generate(&self, request: GenerationRequest) -> Option<TrackedTask> {
        self.submit_as(GenerationKind::Generate, request).await
    }

    pub async fn cover(&self, request: GenerationRequest) -> Option<TrackedTask> {
        self.submit_as(GenerationKind::Cover, request).await
    }

    pub async fn extend(&self, request: GenerationRequest) -> Option<TrackedTask> {
        self.submit_as(GenerationKind::Extend, request).await
    }

    /// Resume polling of a task created elsewhere
    pub async fn track(&self, task_id: TaskId) -> Result<TrackedTask> {
        self.poller.track(&self.ctx, task_id).await
    }

    /// Active task ids owned by this session
    pub fn active_tasks(&self) -> Vec<TaskId> {
        self.poller.registry().tasks_for_session(self.ctx.id())
    }

    /// Cancel everything this session started; no terminal events follow
    pub fn disconnect(&self) -> usize {
        self.ctx.token.cancel();
        let cancelled = self.poller.registry().cancel_all_for_session(self.ctx.id());
        info!(session_id = %self.ctx.id(), cancelled, "Session disconnected");
        cancelled
    }

    async fn submit_as(&self, kind: GenerationKind, request: GenerationRequest) -> Option<TrackedTask> {
        if request.kind() != kind {
            let err = Error::Validation(format!(
                "{} request sent as {}",
                request.kind(),
                kind
            ));
            self.ctx.emit_task(TaskEvent::TaskErrored {
                task_id: None,
                reason: err.to_string(),
                code: err.code(),
            });
            return None;
        }
        self.poller.submit(&self.ctx, request).await
    }
}

impl Drop for SessionHandler {
    fn drop(&mut self) {
        if !self.ctx.is_closed() {
            self.disconnect();
        }
    }
}
