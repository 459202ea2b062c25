//! Shared fixtures: a scripted remote client and a collecting sink

#![allow(dead_code)]

use async_trait::async_trait;
use cadence_foundation::{
    EventSink, PollingConfig, SessionEvent, SessionLimits, TaskEvent, TaskId, Track,
};
use cadence_provider::{Created, GenerationRequest, Model, RawStatus, RemoteClient, RemoteError};
use cadence_task::{SessionContext, TaskPoller, TaskRegistry};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One scripted answer to `check_status`
#[derive(Debug, Clone)]
pub enum Step {
    Status(RawStatus),
    Fail(RemoteError),
    /// Never answers; only the per-call timeout ends it
    Hang,
}

pub fn processing() -> Step {
    Step::Status(RawStatus::new("PROCESSING"))
}

pub fn success() -> Step {
    Step::Status(RawStatus::new("SUCCESS").with_tracks(vec![track("track-1")]))
}

pub fn track(id: &str) -> Track {
    Track::new(id).audio_url(format!("https://example.com/{}.mp3", id))
}

pub struct ScriptedClient {
    create_error: Mutex<Option<RemoteError>>,
    fixed_id: Mutex<Option<String>>,
    create_delay: Duration,
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    next_id: AtomicU32,
    pub creates: AtomicU32,
    pub checks: AtomicU32,
}

impl ScriptedClient {
    pub fn new(script: Vec<Step>, fallback: Step) -> Self {
        Self {
            create_error: Mutex::new(None),
            fixed_id: Mutex::new(None),
            create_delay: Duration::ZERO,
            script: Mutex::new(script.into()),
            fallback,
            next_id: AtomicU32::new(1),
            creates: AtomicU32::new(0),
            checks: AtomicU32::new(0),
        }
    }

    pub fn failing_create(self, err: RemoteError) -> Self {
        *self.create_error.lock() = Some(err);
        self
    }

    /// Every creation returns the same id
    pub fn with_fixed_id(self, id: &str) -> Self {
        *self.fixed_id.lock() = Some(id.to_string());
        self
    }

    /// Creation answers only after `delay`
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn creates(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn checks(&self) -> u32 {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteClient for ScriptedClient {
    fn id(&self) -> &str {
        "scripted"
    }

    fn payload_for(&self, request: &GenerationRequest) -> Value {
        request.to_payload("https://example.com/callback")
    }

    async fn create(&self, _request: &GenerationRequest) -> Result<Created, RemoteError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        if let Some(err) = self.create_error.lock().clone() {
            return Err(err);
        }

        let id = match self.fixed_id.lock().clone() {
            Some(id) => id,
            None => format!("task-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        Ok(Created {
            task_id: TaskId::new(id.clone()),
            response: json!({"code": 200, "msg": "success", "data": {"taskId": id}}),
        })
    }

    async fn check_status(&self, _task_id: &TaskId) -> Result<RawStatus, RemoteError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Status(raw) => Ok(raw),
            Step::Fail(err) => Err(err),
            Step::Hang => std::future::pending().await,
        }
    }
}

#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl CollectingSink {
    pub fn all(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    pub fn task_events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| e.as_task().cloned())
            .collect()
    }

    pub fn task_event_names(&self) -> Vec<&'static str> {
        self.task_events().iter().map(|e| e.name()).collect()
    }
}

impl EventSink for CollectingSink {
    fn name(&self) -> &str {
        "collecting"
    }

    fn emit(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}

pub struct Harness {
    pub client: Arc<ScriptedClient>,
    pub registry: Arc<TaskRegistry>,
    pub poller: Arc<TaskPoller>,
    pub sink: Arc<CollectingSink>,
    pub ctx: SessionContext,
}

pub fn harness(client: ScriptedClient, config: PollingConfig) -> Harness {
    harness_with_limits(client, config, SessionLimits::unlimited())
}

pub fn harness_with_limits(
    client: ScriptedClient,
    config: PollingConfig,
    limits: SessionLimits,
) -> Harness {
    let client = Arc::new(client);
    let registry = Arc::new(TaskRegistry::new());
    let poller = Arc::new(TaskPoller::new(client.clone(), registry.clone(), config));
    let sink = Arc::new(CollectingSink::default());
    let ctx = SessionContext::new(sink.clone(), limits);

    Harness {
        client,
        registry,
        poller,
        sink,
        ctx,
    }
}

pub fn request() -> GenerationRequest {
    GenerationRequest::generate(Model::V4, "calm piano with soft rain")
}

/// Exactly one terminal event, and it is the last task event
pub fn assert_single_terminal(events: &[TaskEvent]) {
    let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1, "terminal events: {:?}", terminal);
    assert!(
        events.last().map(|e| e.is_terminal()).unwrap_or(false),
        "events after terminal: {:?}",
        events
    );
}
