//! Core - 모든 레이어가 공유하는 도메인 타입

pub mod types;

pub use types::{GenerationKind, SessionId, TaskId, Track};
