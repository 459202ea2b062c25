//! Poller integration tests - scripted remote client, paused clock
//!
//! `cargo test -p cadence-task --test poller_test`

mod common;

use cadence_foundation::{ApiLog, PollingConfig, SessionEvent, SessionLimits, TaskEvent, TaskId};
use cadence_provider::{ErrorCode, GenerationRequest, Model, RawStatus, RemoteError};
use cadence_task::TaskState;
use common::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_success_on_first_check() {
    let h = harness(ScriptedClient::new(vec![success()], processing()), PollingConfig::default());

    let tracked = h.poller.submit(&h.ctx, request()).await.expect("task not started");
    assert_eq!(tracked.task_id, TaskId::from("task-1"));
    assert!(h.registry.contains(&tracked.task_id));

    assert_eq!(tracked.wait().await, TaskState::Succeeded);
    assert_eq!(h.sink.task_event_names(), vec!["task_created", "task_succeeded"]);

    match h.sink.task_events().last() {
        Some(TaskEvent::TaskSucceeded { tracks, .. }) => assert_eq!(tracks, &vec![track("track-1")]),
        other => panic!("unexpected terminal event {:?}", other),
    }
    assert!(h.registry.is_empty());
    assert_eq!(h.client.checks(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_records_request_response_and_poll() {
    let h = harness(ScriptedClient::new(vec![success()], processing()), PollingConfig::default());

    let tracked = h.poller.submit(&h.ctx, request()).await.unwrap();
    tracked.wait().await;

    let logs: Vec<ApiLog> = h
        .sink
        .all()
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::ApiLog(log) => Some(log),
            _ => None,
        })
        .collect();

    assert!(matches!(&logs[0], ApiLog::Request { data, .. } if data["prompt"] == "calm piano with soft rain"));
    assert!(matches!(&logs[1], ApiLog::Response { data, .. } if data["data"]["taskId"] == "task-1"));
    assert!(matches!(&logs[2], ApiLog::Poll { attempt: 1, status, .. } if status == "SUCCESS"));

    // The terminal event is the last thing the session sees
    assert!(matches!(
        h.sink.all().last(),
        Some(SessionEvent::Task(TaskEvent::TaskSucceeded { .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_progress_then_vendor_failure() {
    let script = vec![
        processing(),
        processing(),
        processing(),
        Step::Status(RawStatus::new("FAILED").with_error("bad prompt", None)),
    ];
    let h = harness(ScriptedClient::new(script, success()), PollingConfig::default());

    let tracked = h.poller.submit(&h.ctx, request()).await.unwrap();
    assert_eq!(tracked.wait().await, TaskState::Failed);

    let events = h.sink.task_events();
    assert_eq!(
        h.sink.task_event_names(),
        vec![
            "task_created",
            "task_progress",
            "task_progress",
            "task_progress",
            "task_failed"
        ]
    );
    match events.last() {
        Some(TaskEvent::TaskFailed { reason, .. }) => assert_eq!(reason, "bad prompt"),
        other => panic!("unexpected terminal event {:?}", other),
    }

    // Silence afterwards: the fallback would have succeeded
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.sink.task_events().len(), events.len());
    assert_eq!(h.client.checks(), 4);
    assert!(h.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_check_times_out() {
    let h = harness(ScriptedClient::new(vec![], Step::Hang), PollingConfig::default());

    let tracked = h.poller.submit(&h.ctx, request()).await.unwrap();
    assert_eq!(tracked.wait().await, TaskState::TimedOut);

    let events = h.sink.task_events();
    assert_single_terminal(&events);
    assert_eq!(h.sink.task_event_names(), vec!["task_created", "task_timed_out"]);

    match events.last() {
        Some(TaskEvent::TaskTimedOut {
            attempts,
            elapsed_ms,
            ..
        }) => {
            assert!(*attempts >= 1 && *attempts <= 60);
            assert!(*elapsed_ms >= 600_000 && *elapsed_ms <= 601_000, "elapsed {}", elapsed_ms);
        }
        other => panic!("unexpected terminal event {:?}", other),
    }

    // Each timed-out call is recorded as a transient error
    let timeouts = h
        .sink
        .all()
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::ApiLog(ApiLog::Error { code, .. }) if code == "REQUEST_TIMEOUT"))
        .count();
    assert!(timeouts >= 1);
    assert!(h.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ceiling_includes_slow_creation() {
    let client = ScriptedClient::new(vec![], Step::Hang).with_create_delay(Duration::from_secs(25));
    let h = harness(client, PollingConfig::default());

    let submitted = tokio::time::Instant::now();
    let tracked = h.poller.submit(&h.ctx, request()).await.unwrap();
    assert_eq!(submitted.elapsed(), Duration::from_secs(25));

    assert_eq!(tracked.wait().await, TaskState::TimedOut);
    let since_created = submitted.elapsed();
    assert!(since_created <= Duration::from_secs(600), "ceiling exceeded: {:?}", since_created);

    match h.sink.task_events().last() {
        Some(TaskEvent::TaskTimedOut { elapsed_ms, .. }) => {
            assert_eq!(*elapsed_ms, since_created.as_millis() as u64);
        }
        other => panic!("unexpected terminal event {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_max_attempts_ceiling() {
    let config = PollingConfig {
        max_attempts: 3,
        ..Default::default()
    };
    let h = harness(ScriptedClient::new(vec![], processing()), config);

    let tracked = h.poller.submit(&h.ctx, request()).await.unwrap();
    assert_eq!(tracked.wait().await, TaskState::TimedOut);

    assert_eq!(
        h.sink.task_event_names(),
        vec![
            "task_created",
            "task_progress",
            "task_progress",
            "task_progress",
            "task_timed_out"
        ]
    );
    assert!(matches!(
        h.sink.task_events().last(),
        Some(TaskEvent::TaskTimedOut { attempts: 3, .. })
    ));
    assert_eq!(h.client.checks(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_are_retried() {
    let script = vec![
        Step::Fail(RemoteError::from_http_status(503, "maintenance")),
        Step::Fail(RemoteError::from_http_status(429, "slow down")),
        success(),
    ];
    let h = harness(ScriptedClient::new(script, processing()), PollingConfig::default());

    let tracked = h.poller.submit(&h.ctx, request()).await.unwrap();
    assert_eq!(tracked.wait().await, TaskState::Succeeded);

    assert_eq!(h.sink.task_event_names(), vec!["task_created", "task_succeeded"]);
    let errors = h
        .sink
        .all()
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::ApiLog(ApiLog::Error { .. })))
        .count();
    assert_eq!(errors, 2);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_check_error() {
    let script = vec![
        processing(),
        Step::Fail(RemoteError::from_http_status(401, "Invalid API key")),
    ];
    let h = harness(ScriptedClient::new(script, success()), PollingConfig::default());

    let tracked = h.poller.submit(&h.ctx, request()).await.unwrap();
    assert_eq!(tracked.wait().await, TaskState::Errored);

    let events = h.sink.task_events();
    assert_single_terminal(&events);
    match events.last() {
        Some(TaskEvent::TaskErrored {
            task_id,
            reason,
            code,
        }) => {
            assert_eq!(task_id.as_ref(), Some(&TaskId::from("task-1")));
            assert_eq!(reason, "Invalid API key");
            assert_eq!(code, ErrorCode::InvalidApiKey.as_str());
        }
        other => panic!("unexpected terminal event {:?}", other),
    }
    assert_eq!(h.client.checks(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_create_rejected_with_402() {
    let client = ScriptedClient::new(vec![], success())
        .failing_create(RemoteError::from_http_status(402, "Insufficient credits"));
    let h = harness(client, PollingConfig::default());

    assert!(h.poller.submit(&h.ctx, request()).await.is_none());

    assert_eq!(
        h.sink.task_events(),
        vec![TaskEvent::TaskErrored {
            task_id: None,
            reason: "Insufficient credits".to_string(),
            code: "INSUFFICIENT_CREDITS".to_string(),
        }]
    );
    assert!(h.registry.is_empty());
    assert_eq!(h.client.checks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_request_never_reaches_remote() {
    let h = harness(ScriptedClient::new(vec![], success()), PollingConfig::default());

    let invalid = GenerationRequest::generate(Model::V4, "");
    assert!(h.poller.submit(&h.ctx, invalid).await.is_none());

    match h.sink.task_events().as_slice() {
        [TaskEvent::TaskErrored { task_id: None, code, .. }] => assert_eq!(code, "VALIDATION_ERROR"),
        other => panic!("unexpected events {:?}", other),
    }
    assert_eq!(h.client.creates(), 0);
    assert!(h.sink.all().len() == 1);
}

#[tokio::test(start_paused = true)]
async fn test_creation_rate_limit() {
    let limits = SessionLimits {
        max_creations_per_window: Some(1),
        window_ms: 60_000,
        max_active_tasks: None,
    };
    let h = harness_with_limits(
        ScriptedClient::new(vec![], processing()),
        PollingConfig::default(),
        limits,
    );

    let first = h.poller.submit(&h.ctx, request()).await;
    assert!(first.is_some());
    assert!(h.poller.submit(&h.ctx, request()).await.is_none());

    let rejected: Vec<_> = h
        .sink
        .task_events()
        .into_iter()
        .filter(|e| matches!(e, TaskEvent::TaskErrored { code, .. } if code == "RATE_LIMIT_EXCEEDED"))
        .collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(h.client.creates(), 1);

    // In-flight polling is unaffected by the rejection
    assert_eq!(h.registry.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_active_task_ceiling() {
    let limits = SessionLimits {
        max_creations_per_window: None,
        window_ms: 60_000,
        max_active_tasks: Some(1),
    };
    let h = harness_with_limits(
        ScriptedClient::new(vec![], processing()),
        PollingConfig::default(),
        limits,
    );

    let _first = h.poller.submit(&h.ctx, request()).await.unwrap();
    assert!(h.poller.submit(&h.ctx, request()).await.is_none());
    assert_eq!(h.client.creates(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_task_id_starts_one_poller() {
    let client = ScriptedClient::new(vec![], processing()).with_fixed_id("same");
    let h = harness(client, PollingConfig::default());

    let first = h.poller.submit(&h.ctx, request()).await;
    let second = h.poller.submit(&h.ctx, request()).await;

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(h.client.creates(), 2);
    assert_eq!(h.registry.len(), 1);

    let created = h
        .sink
        .task_events()
        .into_iter()
        .filter(|e| matches!(e, TaskEvent::TaskCreated { .. }))
        .count();
    assert_eq!(created, 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_task_id_from_other_session_is_reported() {
    let client = ScriptedClient::new(vec![], processing()).with_fixed_id("shared");
    let h = harness(client, PollingConfig::default());

    let other_sink = std::sync::Arc::new(CollectingSink::default());
    let other_ctx = cadence_task::SessionContext::new(other_sink.clone(), SessionLimits::unlimited());

    let owner = h.poller.submit(&h.ctx, request()).await;
    let loser = h.poller.submit(&other_ctx, request()).await;
    assert!(owner.is_some());
    assert!(loser.is_none());

    match other_sink.task_events().as_slice() {
        [TaskEvent::TaskErrored { task_id: None, code, .. }] => assert_eq!(code, "DUPLICATE_TASK"),
        other => panic!("unexpected events {:?}", other),
    }
    // The owning session keeps the task's only stream
    assert_eq!(h.sink.task_event_names(), vec!["task_created"]);
    assert_eq!(h.registry.tasks_for_session(other_ctx.id()).len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting() {
    let h = harness(ScriptedClient::new(vec![], processing()), PollingConfig::default());

    let tracked = h.poller.submit(&h.ctx, request()).await.unwrap();
    let task_id = tracked.task_id.clone();

    // Let a couple of checks happen
    tokio::time::sleep(Duration::from_secs(20)).await;
    let progressed = h.sink.task_events().len();
    assert!(progressed >= 2);

    assert!(h.poller.cancel(&task_id));
    assert!(!h.registry.contains(&task_id));
    assert_eq!(tracked.wait().await, TaskState::Cancelled);

    // Idempotent, and no terminal event
    assert!(!h.poller.cancel(&task_id));
    assert!(!h.poller.cancel(&task_id));
    let events = h.sink.task_events();
    assert!(events.iter().all(|e| !e.is_terminal()));

    let checks = h.client.checks();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.client.checks(), checks);
    assert_eq!(h.sink.task_events().len(), events.len());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_inflight_check() {
    let h = harness(ScriptedClient::new(vec![], Step::Hang), PollingConfig::default());

    let tracked = h.poller.submit(&h.ctx, request()).await.unwrap();

    // Past the initial delay, inside the first call
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.client.checks(), 1);

    let before = tokio::time::Instant::now();
    h.poller.cancel(&tracked.task_id);
    assert_eq!(tracked.wait().await, TaskState::Cancelled);
    assert!(before.elapsed() < Duration::from_secs(1));

    assert!(h.sink.task_events().iter().all(|e| !e.is_terminal()));
    assert!(h.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_track_existing_task() {
    let h = harness(
        ScriptedClient::new(vec![processing(), success()], processing()),
        PollingConfig::default(),
    );

    let tracked = h
        .poller
        .track(&h.ctx, TaskId::from("external-1"))
        .await
        .unwrap();

    let err = h
        .poller
        .track(&h.ctx, TaskId::from("external-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, cadence_foundation::Error::DuplicateTask(_)));

    assert_eq!(tracked.wait().await, TaskState::Succeeded);
    assert_eq!(
        h.sink.task_event_names(),
        vec!["task_created", "task_progress", "task_succeeded"]
    );
    assert_eq!(h.client.creates(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stats_reflect_live_attempts() {
    let h = harness(ScriptedClient::new(vec![], processing()), PollingConfig::default());

    let tracked = h.poller.submit(&h.ctx, request()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;

    let stats = h.registry.stats();
    assert_eq!(stats.active, 1);
    assert_eq!(stats.tasks[0].task_id, tracked.task_id);
    assert_eq!(&stats.tasks[0].session_id, h.ctx.id());
    assert!(stats.tasks[0].attempts >= 1);

    h.poller.cancel(&tracked.task_id);
    tracked.wait().await;
}
