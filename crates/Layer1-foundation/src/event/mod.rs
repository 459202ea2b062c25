//! Event System - 세션 이벤트 발행
//!
//! 폴러가 만들어내는 모든 알림은 `EventSink::emit`을 통해 세션 계층으로 나갑니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────┐   emit(SessionEvent)   ┌──────────────────────┐
//! │  TaskPoller  │ ─────────────────────▶ │  EventSink           │
//! │  (per task)  │                        │  ├── ChannelSink     │
//! └──────────────┘                        │  └── EventBus        │
//!                                         └──────────────────────┘
//! ```
//!
//! ## 이벤트 종류
//!
//! - `TaskEvent` - task_created / task_progress / task_succeeded /
//!   task_failed / task_timed_out / task_errored
//! - `ApiLog` - request / response / poll / error 관측 기록

pub mod sink;
pub mod types;

pub use sink::{ChannelSink, EventBus, EventBusConfig, EventSink};
pub use types::{ApiLog, SessionEvent, TaskEvent};
