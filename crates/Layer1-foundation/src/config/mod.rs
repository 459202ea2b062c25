//! Config - 통합 설정 관리
//!
//! - `cadence.rs` - CadenceConfig 통합 설정
//! - `polling.rs` - 폴링 스케줄/분류 설정
//! - `limits.rs` - 세션별 요청 제한

mod cadence;
mod limits;
mod polling;

pub use cadence::{ApiConfig, CadenceConfig, CADENCE_CONFIG_FILE, ENV_API_KEY, ENV_BASE_URL};
pub use limits::{LimitCheckResult, SessionLimits};
pub use polling::PollingConfig;
