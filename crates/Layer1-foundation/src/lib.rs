//! # cadence-foundation
//!
//! Foundation layer for Cadence:
//! - Core: 공용 도메인 타입 (TaskId, SessionId, Track, GenerationKind)
//! - Config: 통합 설정 (CadenceConfig, PollingConfig, SessionLimits)
//! - Event: 세션으로 나가는 이벤트와 EventSink
//! - Storage: JsonStore (설정 파일)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Layer4: cadence-cli                                    │
//! │                     │                                   │
//! │  Layer2: cadence-task  ──▶  cadence-provider            │
//! │          (poller, registry)   (remote client)           │
//! │                     │                                   │
//! │  Layer1: cadence-foundation (config, error, events)     │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (공용 타입)
// ============================================================================
pub use core::{GenerationKind, SessionId, TaskId, Track};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    ApiConfig, CadenceConfig, LimitCheckResult, PollingConfig, SessionLimits,
    CADENCE_CONFIG_FILE, ENV_API_KEY, ENV_BASE_URL,
};

// ============================================================================
// Event (이벤트)
// ============================================================================
pub use event::{ApiLog, ChannelSink, EventBus, EventBusConfig, EventSink, SessionEvent, TaskEvent};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{JsonStore, WriteMode};
