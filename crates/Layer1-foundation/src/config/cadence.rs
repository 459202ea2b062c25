//! Cadence Config - 통합 설정
//!
//! 글로벌 → 프로젝트 → 환경 변수 순서로 병합합니다.

use crate::storage::{JsonStore, WriteMode};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::{PollingConfig, SessionLimits};

/// 설정 파일명
pub const CADENCE_CONFIG_FILE: &str = "config.json";

/// 원격 서비스 base URL 환경 변수
pub const ENV_BASE_URL: &str = "SUNO_BASE_URL";

/// 원격 서비스 API 키 환경 변수
pub const ENV_API_KEY: &str = "SUNO_API_KEY";

// ============================================================================
// Cadence Config (통합)
// ============================================================================

/// Cadence 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CadenceConfig {
    /// 원격 서비스 설정
    #[serde(default)]
    pub api: ApiConfig,

    /// 폴링 설정
    #[serde(default)]
    pub polling: PollingConfig,

    /// 세션 제한
    #[serde(default)]
    pub limits: SessionLimits,
}

impl CadenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 + 환경 변수 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) =
                global.read::<CadenceConfig>(CADENCE_CONFIG_FILE)?
            {
                debug!(path = %global.file_path(CADENCE_CONFIG_FILE).display(), "Loaded global config");
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(project_config) =
                project.read::<CadenceConfig>(CADENCE_CONFIG_FILE)?
            {
                debug!(path = %project.file_path(CADENCE_CONFIG_FILE).display(), "Loaded project config");
                config.merge(project_config);
            }
        }

        // 3. 환경 변수
        config.apply_env(|key| std::env::var(key).ok());

        config.polling.validate()?;
        Ok(config)
    }

    /// 특정 저장소에서만 로드 (환경 변수 미적용)
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        let config = store
            .read::<CadenceConfig>(CADENCE_CONFIG_FILE)?
            .unwrap_or_default();
        config.polling.validate()?;
        Ok(config)
    }

    /// 저장소에 설정 기록 (API 키는 기록하지 않음)
    pub fn save_to(&self, store: &JsonStore, overwrite: bool) -> Result<PathBuf> {
        let mut config = self.clone();
        config.api.api_key = None;

        let mode = if overwrite {
            WriteMode::Replace
        } else {
            WriteMode::CreateNew
        };
        store.write(CADENCE_CONFIG_FILE, &config, mode)
    }

    /// 환경 변수 적용 (lookup은 테스트에서 교체 가능)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.api.base_url = Some(url);
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
            self.api.api_key = Some(key);
        }
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: CadenceConfig) {
        self.api.merge(other.api);
        self.polling.merge(other.polling);
        if other.limits != SessionLimits::default() {
            self.limits = other.limits;
        }
    }
}

// ============================================================================
// Api Config
// ============================================================================

/// 원격 서비스 접속 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bearer 토큰
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// 원격 호출 1회당 제한 시간 (ms)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// 생성 요청에 넣을 콜백 URL
    #[serde(default = "default_callback_url")]
    pub callback_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            request_timeout_ms: default_request_timeout_ms(),
            callback_url: default_callback_url(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// base URL 필수 확인
    pub fn require_base_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{} is not set", ENV_BASE_URL)))
    }

    /// API 키 필수 확인
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{} is not set", ENV_API_KEY)))
    }

    fn merge(&mut self, other: ApiConfig) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.request_timeout_ms != default_request_timeout_ms() {
            self.request_timeout_ms = other.request_timeout_ms;
        }
        if other.callback_url != default_callback_url() {
            self.callback_url = other.callback_url;
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_callback_url() -> String {
    "https://example.com/callback".to_string()
}
