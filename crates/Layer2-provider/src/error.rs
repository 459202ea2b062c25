//! Remote service error types
//!
//! RemoteError carries enough to decide between "back off and retry" and
//! "terminate now". Converts into cadence_foundation::Error.

use crate::retry::{RetryDecision, RetryableError};
use cadence_foundation::Error as FoundationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Closed set of failure codes the client produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidApiKey,
    InsufficientCredits,
    AccessDenied,
    TaskNotFound,
    Conflict,
    InvalidRequest,
    ValidationError,
    RateLimitExceeded,
    ServiceUnavailable,
    ServerError,
    RequestTimeout,
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    InvalidResponse,
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidApiKey => "INVALID_API_KEY",
            ErrorCode::InsufficientCredits => "INSUFFICIENT_CREDITS",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::TaskNotFound => "TASK_NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::RequestTimeout => "REQUEST_TIMEOUT",
            ErrorCode::Network => "NETWORK_ERROR",
            ErrorCode::InvalidResponse => "INVALID_RESPONSE",
            ErrorCode::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Whether a failure with this code may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RateLimitExceeded
                | ErrorCode::ServiceUnavailable
                | ErrorCode::ServerError
                | ErrorCode::RequestTimeout
                | ErrorCode::Network
        )
    }

    /// Map an HTTP status (or a vendor envelope code) to an error code
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::InvalidRequest,
            401 => ErrorCode::InvalidApiKey,
            402 => ErrorCode::InsufficientCredits,
            403 => ErrorCode::AccessDenied,
            404 => ErrorCode::TaskNotFound,
            408 => ErrorCode::RequestTimeout,
            409 => ErrorCode::Conflict,
            413 | 422 => ErrorCode::ValidationError,
            429 => ErrorCode::RateLimitExceeded,
            503 => ErrorCode::ServiceUnavailable,
            500..=599 => ErrorCode::ServerError,
            _ => ErrorCode::Unknown,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error from a remote call
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: ErrorCode,
    pub message: String,
    pub http_status: Option<u16>,
    pub retryable: bool,
    /// Server-requested wait before the next call (`Retry-After`)
    pub retry_after: Option<Duration>,
}

impl RemoteError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
            retryable: code.is_retryable(),
            retry_after: None,
        }
    }

    /// Create from HTTP status code and body/message
    pub fn from_http_status(status: u16, message: &str) -> Self {
        let code = ErrorCode::from_status(status);
        let message = if message.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            message.to_string()
        };

        Self {
            code,
            message,
            http_status: Some(status),
            retryable: code.is_retryable(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, after: Option<Duration>) -> Self {
        self.retry_after = after;
        self
    }

    /// Vendor envelope carried a non-200 `code` (HTTP itself may have been 200)
    pub fn from_envelope(vendor_code: i64, msg: Option<&str>) -> Self {
        let status = u16::try_from(vendor_code).unwrap_or(0);
        let mut err = Self::from_http_status(status, msg.unwrap_or("API Error"));
        err.http_status = Some(status).filter(|s| *s != 0);
        err
    }

    pub fn request_timeout(after: Duration) -> Self {
        Self::new(
            ErrorCode::RequestTimeout,
            format!("request timed out after {:?}", after),
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    /// Normalize a reqwest failure
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::new(ErrorCode::RequestTimeout, err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::from_http_status(status.as_u16(), &err.to_string());
        }
        if err.is_decode() {
            return Self::invalid_response(err.to_string());
        }
        Self::network(err.to_string())
    }
}

impl RetryableError for RemoteError {
    fn retry_decision(&self) -> RetryDecision {
        if !self.retryable {
            return RetryDecision::Permanent;
        }
        match self.code {
            ErrorCode::RateLimitExceeded | ErrorCode::ServiceUnavailable => {
                RetryDecision::Throttled {
                    retry_after: self.retry_after,
                }
            }
            _ => RetryDecision::Transient,
        }
    }
}

// ============================================================================
// cadence_foundation::Error 변환
// ============================================================================

impl From<RemoteError> for FoundationError {
    fn from(err: RemoteError) -> Self {
        match err.code {
            ErrorCode::ValidationError | ErrorCode::InvalidRequest => {
                FoundationError::Validation(err.message)
            }
            ErrorCode::TaskNotFound => FoundationError::NotFound(err.message),
            ErrorCode::RateLimitExceeded => FoundationError::RateLimited(err.message),
            _ => FoundationError::remote(err.code.as_str(), err.message, err.retryable),
        }
    }
}
