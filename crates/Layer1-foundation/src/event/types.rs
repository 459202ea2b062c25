//! Event Types - 세션으로 전달되는 이벤트 정의
//!
//! 태스크 생명주기 이벤트(`TaskEvent`)와 관측용 기록(`ApiLog`)

use crate::core::{GenerationKind, TaskId, Track};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// TaskEvent - 태스크 생명주기
// ============================================================================

/// 태스크 하나에 대한 단방향 알림
///
/// 태스크마다 종료 이벤트(`succeeded`, `failed`, `timed_out`, `errored`)는
/// 정확히 한 번만 발행되며 그 뒤로는 아무 이벤트도 없습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    /// 원격 태스크 생성 완료, 폴링 시작
    TaskCreated { task_id: TaskId },

    /// 아직 진행 중
    TaskProgress {
        task_id: TaskId,
        status: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tracks: Vec<Track>,
    },

    /// 결과물 생성 완료
    TaskSucceeded { task_id: TaskId, tracks: Vec<Track> },

    /// 원격 서비스가 작업 자체를 실패로 보고
    TaskFailed {
        task_id: TaskId,
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// 시도 횟수 또는 전체 시간 상한 초과
    TaskTimedOut {
        task_id: TaskId,
        attempts: u32,
        elapsed_ms: u64,
    },

    /// 생성 실패 또는 재시도 불가능한 조회 실패
    TaskErrored {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<TaskId>,
        reason: String,
        code: String,
    },
}

impl TaskEvent {
    /// 종료 이벤트인지 확인
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskEvent::TaskSucceeded { .. }
                | TaskEvent::TaskFailed { .. }
                | TaskEvent::TaskTimedOut { .. }
                | TaskEvent::TaskErrored { .. }
        )
    }

    /// 대상 태스크 ID (생성 실패는 None)
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            TaskEvent::TaskCreated { task_id }
            | TaskEvent::TaskProgress { task_id, .. }
            | TaskEvent::TaskSucceeded { task_id, .. }
            | TaskEvent::TaskFailed { task_id, .. }
            | TaskEvent::TaskTimedOut { task_id, .. } => Some(task_id),
            TaskEvent::TaskErrored { task_id, .. } => task_id.as_ref(),
        }
    }

    /// 이벤트 이름 (wire 형식과 동일)
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::TaskCreated { .. } => "task_created",
            TaskEvent::TaskProgress { .. } => "task_progress",
            TaskEvent::TaskSucceeded { .. } => "task_succeeded",
            TaskEvent::TaskFailed { .. } => "task_failed",
            TaskEvent::TaskTimedOut { .. } => "task_timed_out",
            TaskEvent::TaskErrored { .. } => "task_errored",
        }
    }
}

// ============================================================================
// ApiLog - 요청/응답 관측 기록
// ============================================================================

/// 원격 호출 관측 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiLog {
    /// 생성 요청 본문
    Request { kind: GenerationKind, data: Value },

    /// 생성 요청 응답 (성공 또는 에러 요약)
    Response { kind: GenerationKind, data: Value },

    /// 상태 조회 1회
    Poll {
        task_id: TaskId,
        attempt: u32,
        status: String,
    },

    /// 조회 중 발생한 에러 (일시적 포함)
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<TaskId>,
        code: String,
        message: String,
    },
}

// ============================================================================
// SessionEvent - 싱크로 전달되는 모든 것
// ============================================================================

/// 세션 싱크로 전달되는 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    Task(TaskEvent),
    ApiLog(ApiLog),
}

impl SessionEvent {
    pub fn as_task(&self) -> Option<&TaskEvent> {
        match self {
            SessionEvent::Task(event) => Some(event),
            SessionEvent::ApiLog(_) => None,
        }
    }
}

impl From<TaskEvent> for SessionEvent {
    fn from(event: TaskEvent) -> Self {
        SessionEvent::Task(event)
    }
}

impl From<ApiLog> for SessionEvent {
    fn from(log: ApiLog) -> Self {
        SessionEvent::ApiLog(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_event_wire_shape() {
        let event = TaskEvent::TaskFailed {
            task_id: TaskId::from("t-1"),
            reason: "bad prompt".to_string(),
            code: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "task_failed");
        assert_eq!(json["task_id"], "t-1");
        assert_eq!(json["reason"], "bad prompt");
        assert!(json.get("code").is_none());
        assert_eq!(event.name(), "task_failed");
    }

    #[test]
    fn test_terminal_classification() {
        let id = TaskId::from("t-1");
        assert!(!TaskEvent::TaskCreated { task_id: id.clone() }.is_terminal());
        assert!(!TaskEvent::TaskProgress {
            task_id: id.clone(),
            status: "PENDING".into(),
            tracks: vec![],
        }
        .is_terminal());
        assert!(TaskEvent::TaskTimedOut {
            task_id: id.clone(),
            attempts: 3,
            elapsed_ms: 1000,
        }
        .is_terminal());
        assert!(TaskEvent::TaskErrored {
            task_id: None,
            reason: "x".into(),
            code: "INSUFFICIENT_CREDITS".into(),
        }
        .is_terminal());
    }

    #[test]
    fn test_session_event_envelope() {
        let event: SessionEvent = ApiLog::Poll {
            task_id: TaskId::from("t-9"),
            attempt: 2,
            status: "PENDING".into(),
        }
        .into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["channel"], "api_log");
        assert_eq!(json["payload"]["type"], "poll");
        assert!(event.as_task().is_none());
    }
}
