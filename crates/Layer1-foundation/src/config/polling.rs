//! Polling Configuration - 상태 조회 스케줄 설정
//!
//! 기본 간격, 백오프, 지터, 시도 횟수/시간 상한, 상태 문자열 분류 집합

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 상태 조회(폴링) 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollingConfig {
    /// 첫 조회 전 대기 시간 (ms)
    pub initial_delay_ms: u64,

    /// 기본 조회 간격 (ms)
    pub base_interval_ms: u64,

    /// 최대 조회 간격 (ms)
    pub max_interval_ms: u64,

    /// 몇 번의 시도마다 간격을 늘릴지
    pub backoff_step: u32,

    /// 간격 증가 배수
    pub backoff_multiplier: f64,

    /// 매 지연에 더해지는 무작위 지터 상한 (ms)
    pub jitter_ms: u64,

    /// 최대 조회 횟수
    pub max_attempts: u32,

    /// 태스크 생성 후 전체 제한 시간 (ms)
    pub timeout_ms: u64,

    /// 원격 호출 1회당 제한 시간 (ms)
    pub request_timeout_ms: u64,

    /// 정확히 일치하면 치명적 실패로 보는 상태
    pub fatal_statuses: Vec<String>,

    /// 포함되어 있으면 치명적 실패로 보는 부분 문자열
    pub fatal_substrings: Vec<String>,

    /// 성공으로 보는 상태
    pub success_statuses: Vec<String>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 8_000,
            base_interval_ms: 8_000,
            max_interval_ms: 30_000,
            backoff_step: 5,
            backoff_multiplier: 2.0,
            jitter_ms: 1_000,
            max_attempts: 60,
            timeout_ms: 600_000,
            request_timeout_ms: 30_000,
            fatal_statuses: vec![
                "FAILED".to_string(),
                "SENSITIVE_WORD_ERROR".to_string(),
                "CALLBACK_EXCEPTION".to_string(),
            ],
            fatal_substrings: vec!["FAILED".to_string()],
            success_statuses: vec!["SUCCESS".to_string()],
        }
    }
}

impl PollingConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 설정 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.base_interval_ms == 0 {
            return Err(Error::Config("baseIntervalMs must be > 0".to_string()));
        }
        if self.max_interval_ms < self.base_interval_ms {
            return Err(Error::Config(format!(
                "maxIntervalMs ({}) must be >= baseIntervalMs ({})",
                self.max_interval_ms, self.base_interval_ms
            )));
        }
        if self.backoff_step == 0 {
            return Err(Error::Config("backoffStep must be > 0".to_string()));
        }
        if !(self.backoff_multiplier >= 1.0) {
            return Err(Error::Config("backoffMultiplier must be >= 1.0".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("maxAttempts must be > 0".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config("timeoutMs must be > 0".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("requestTimeoutMs must be > 0".to_string()));
        }
        Ok(())
    }

    /// 다른 설정과 병합 (other가 기본값과 다르면 우선)
    pub fn merge(&mut self, other: PollingConfig) {
        let defaults = PollingConfig::default();

        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field != defaults.$field {
                    self.$field = other.$field;
                })*
            };
        }

        take!(
            initial_delay_ms,
            base_interval_ms,
            max_interval_ms,
            backoff_step,
            backoff_multiplier,
            jitter_ms,
            max_attempts,
            timeout_ms,
            request_timeout_ms,
            fatal_statuses,
            fatal_substrings,
            success_statuses
        );
    }
}
