//! Remote client trait
//!
//! The two calls the task subsystem needs from the generation service.
//! Implementations hold no per-task state and are shared across poll loops.

use crate::error::RemoteError;
use crate::request::GenerationRequest;
use crate::status::RawStatus;
use async_trait::async_trait;
use cadence_foundation::TaskId;
use serde_json::Value;

/// Outcome of a successful creation call
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    pub task_id: TaskId,
    /// Raw response body, for observability records
    pub response: Value,
}

/// Remote generation service
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Client identifier (for logs)
    fn id(&self) -> &str;

    /// Body that `create` will send for `request` (already validated)
    fn payload_for(&self, request: &GenerationRequest) -> Value;

    /// Submit a generation job; returns the vendor task id
    async fn create(&self, request: &GenerationRequest) -> Result<Created, RemoteError>;

    /// Fetch the current status of a task
    async fn check_status(&self, task_id: &TaskId) -> Result<RawStatus, RemoteError>;
}
