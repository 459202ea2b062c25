//! # cadence-provider
//!
//! Client layer for the remote music generation service.
//!
//! ## Features
//! - Generation requests with per-model validation
//! - Status checks normalized into `RawStatus`
//! - HTTP and vendor error codes classified as retryable or permanent
//! - Automatic retry with exponential backoff for auxiliary calls

pub mod error;
pub mod providers;
pub mod request;
pub mod retry;
pub mod status;
pub mod r#trait;

// Core traits and types
pub use r#trait::{Created, RemoteClient};
pub use request::{GenerationMode, GenerationRequest, Model};
pub use status::RawStatus;

// Error and retry
pub use error::{ErrorCode, RemoteError};
pub use retry::RetryConfig;

// Client implementations
pub use providers::suno::SunoClient;
