//! Event Sink - 세션 이벤트 전달
//!
//! 폴러는 `emit(event)` 하나만 알면 됩니다.
//! 전달은 best-effort: 싱크가 실패해도 태스크 결과에는 영향이 없습니다.

use super::types::SessionEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc};
use tracing::trace;

// ============================================================================
// EventSink Trait
// ============================================================================

/// 이벤트 싱크 trait
///
/// UI/세션 계층이 구현합니다. `emit`은 블로킹하지 않아야 합니다.
pub trait EventSink: Send + Sync {
    /// 싱크 이름 (디버깅용)
    fn name(&self) -> &str {
        "sink"
    }

    /// 이벤트 전달
    fn emit(&self, event: SessionEvent);
}

// ============================================================================
// ChannelSink - mpsc 채널로 전달
// ============================================================================

/// 이벤트를 unbounded mpsc 채널로 넘기는 싱크
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    /// 싱크와 수신자 생성
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    fn emit(&self, event: SessionEvent) {
        // 수신자가 이미 사라졌으면 버림
        if self.sender.send(event).is_err() {
            trace!("Channel sink receiver dropped, event discarded");
        }
    }
}

// ============================================================================
// EventBus - broadcast + 히스토리
// ============================================================================

/// 이벤트 버스 설정
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// 브로드캐스트 채널 용량
    pub channel_capacity: usize,

    /// 이벤트 히스토리 보관 개수
    pub history_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            history_size: 1000,
        }
    }
}

/// 이벤트 버스
///
/// 여러 구독자에게 broadcast 하고 최근 이벤트를 보관합니다.
///
/// ## 사용법
///
/// ```ignore
/// let bus = Arc::new(EventBus::new());
/// let mut rx = bus.receiver();
///
/// bus.emit(TaskEvent::TaskCreated { task_id }.into());
/// let event = rx.recv().await?;
/// ```
pub struct EventBus {
    /// 설정
    config: EventBusConfig,

    /// 브로드캐스트 채널 송신자
    sender: broadcast::Sender<SessionEvent>,

    /// 이벤트 히스토리 (오래된 것부터)
    history: Mutex<VecDeque<SessionEvent>>,

    /// 발행된 이벤트 수
    event_count: AtomicU64,
}

impl EventBus {
    /// 기본 설정으로 이벤트 버스 생성
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// 커스텀 설정으로 이벤트 버스 생성
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));

        Self {
            config,
            sender,
            history: Mutex::new(VecDeque::new()),
            event_count: AtomicU64::new(0),
        }
    }

    /// 브로드캐스트 수신자 생성 (스트림 방식)
    pub fn receiver(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// 히스토리 조회 (발행 순서)
    pub fn history(&self) -> Vec<SessionEvent> {
        self.history.lock().iter().cloned().collect()
    }

    /// 총 발행된 이벤트 수
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::SeqCst)
    }

    /// 히스토리 클리어
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn name(&self) -> &str {
        "event_bus"
    }

    fn emit(&self, event: SessionEvent) {
        let count = self.event_count.fetch_add(1, Ordering::SeqCst);
        trace!(event_no = count + 1, "Publishing session event");

        {
            let mut history = self.history.lock();
            history.push_back(event.clone());

            // 히스토리 크기 제한
            while history.len() > self.config.history_size {
                history.pop_front();
            }
        }

        // 구독자가 없으면 send가 실패하지만 무시
        let _ = self.sender.send(event);
    }
}

// ============================================================================
// 테스트
// ============================================================================
