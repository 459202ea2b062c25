//! Error types for Cadence
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Cadence 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 요청 검증
    // ========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // 태스크 / 세션 관련
    // ========================================================================
    #[error("Task already tracked: {0}")]
    DuplicateTask(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // ========================================================================
    // 원격 서비스 관련
    // ========================================================================
    #[error("Remote error [{code}]: {message}")]
    Remote {
        code: String,
        message: String,
        retryable: bool,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 재시도 가능한 에러인지 확인
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Remote { retryable, .. } => *retryable,
            Error::Timeout(_) | Error::Http(_) => true,
            _ => false,
        }
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::RateLimited(_)
                | Error::NotFound(_)
                | Error::DuplicateTask(_)
                | Error::Cancelled
        )
    }

    /// 이벤트에 실어 보낼 에러 코드
    pub fn code(&self) -> String {
        match self {
            Error::Config(_) => "CONFIG_ERROR".to_string(),
            Error::Validation(_) => "VALIDATION_ERROR".to_string(),
            Error::DuplicateTask(_) => "DUPLICATE_TASK".to_string(),
            Error::RateLimited(_) => "RATE_LIMIT_EXCEEDED".to_string(),
            Error::NotFound(_) => "NOT_FOUND".to_string(),
            Error::Remote { code, .. } => code.clone(),
            Error::Http(_) => "NETWORK_ERROR".to_string(),
            Error::Timeout(_) => "REQUEST_TIMEOUT".to_string(),
            Error::Cancelled => "CANCELLED".to_string(),
            Error::Io(_) | Error::Json(_) | Error::Internal(_) => "INTERNAL_ERROR".to_string(),
        }
    }

    /// Remote 에러 생성 헬퍼
    pub fn remote(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Error::Remote {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
