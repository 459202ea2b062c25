//! # cadence-task
//!
//! Asynchronous task tracking for Cadence.
//! Creates remote generation tasks and follows each one to a single terminal
//! outcome.
//!
//! ## Features
//!
//! - Task state machine with forward-only transitions
//! - Status classification driven by configured vocabularies
//! - Stepped exponential backoff with jitter, attempt and wall-clock ceilings
//! - Registry with duplicate prevention and per-session bulk cancellation
//! - Per-session creation rate limiting

pub mod backoff;
pub mod classify;
pub mod limiter;
pub mod poller;
pub mod registry;
pub mod session;
pub mod state;
pub mod task;

// Task system
pub use poller::{TaskPoller, TrackedTask};
pub use registry::{Registration, RegistryStats, TaskRegistry, TaskStats};
pub use state::TaskState;
pub use task::Task;

// Scheduling and classification
pub use backoff::BackoffPolicy;
pub use classify::{PollOutcome, StatusClass, StatusClassifier};

// Sessions
pub use limiter::RateLimiter;
pub use session::{SessionContext, SessionHandler};
