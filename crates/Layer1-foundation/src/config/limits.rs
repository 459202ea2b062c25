//! Limits Configuration - 세션별 생성 요청 제한
//!
//! 세션이 짧은 시간에 보낼 수 있는 생성 요청 수와 동시 추적 태스크 수를 제한합니다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 세션별 제한
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionLimits {
    /// 윈도우당 최대 생성 요청 수
    pub max_creations_per_window: Option<u32>,
    /// 윈도우 길이 (ms)
    pub window_ms: u64,
    /// 세션당 동시에 추적 중인 최대 태스크 수
    pub max_active_tasks: Option<usize>,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_creations_per_window: Some(10), // 10 requests
            window_ms: 60_000,                  // per minute
            max_active_tasks: Some(10),
        }
    }
}

impl SessionLimits {
    pub fn unlimited() -> Self {
        Self {
            max_creations_per_window: None,
            window_ms: 60_000,
            max_active_tasks: None,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// 윈도우 내 요청 수 확인
    pub fn check_creations(&self, recent: u32) -> LimitCheckResult {
        if let Some(max) = self.max_creations_per_window {
            if recent >= max {
                return LimitCheckResult::Exceeded {
                    limit_type: "session_creations".to_string(),
                    current: recent as u64,
                    max: max as u64,
                };
            }
        }
        LimitCheckResult::Ok
    }

    /// 동시 추적 태스크 수 확인
    pub fn check_active_tasks(&self, active: usize) -> LimitCheckResult {
        if let Some(max) = self.max_active_tasks {
            if active >= max {
                return LimitCheckResult::Exceeded {
                    limit_type: "session_active_tasks".to_string(),
                    current: active as u64,
                    max: max as u64,
                };
            }
        }
        LimitCheckResult::Ok
    }
}

/// 제한 확인 결과
#[derive(Debug, Clone, PartialEq)]
pub enum LimitCheckResult {
    /// 제한 내
    Ok,
    /// 제한 초과
    Exceeded {
        limit_type: String,
        current: u64,
        max: u64,
    },
}

impl LimitCheckResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, LimitCheckResult::Ok)
    }

    /// 사용자에게 보여줄 메시지
    pub fn message(&self) -> Option<String> {
        match self {
            LimitCheckResult::Ok => None,
            LimitCheckResult::Exceeded {
                limit_type,
                current,
                max,
            } => Some(format!("{} limit reached ({}/{})", limit_type, current, max)),
        }
    }
}
