mod common;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use common::{fast_defaults, MockBackend};
use trialmatch::agent::{AgentConfig, AgentSession, Parsed, ResponseFormat};
use trialmatch::error::{BackendError, MatchError};

fn session_with(backend: Arc<MockBackend>) -> AgentSession {
    let session = AgentSession::new(backend, &fast_defaults());
    session.register(
        AgentConfig::new("helper", "test-model").with_response_format(ResponseFormat::Text),
    );
    session
}

#[tokio::test]
async fn test_chat_returns_backend_text() {
    let backend = MockBackend::new().reply("pong").into_arc();
    let session = session_with(Arc::clone(&backend));

    let reply = session.chat_with_retry("helper", "ping").await.unwrap();
    assert_eq!(reply, "pong");
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_retry_recovers_after_transient_failure() {
    let backend = MockBackend::new()
        .fail("connection refused")
        .reply("recovered")
        .into_arc();
    let session = session_with(Arc::clone(&backend));

    let reply = session.chat_with_retry("helper", "ping").await.unwrap();
    assert_eq!(reply, "recovered");
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_retries_exhaust_after_max_attempts() {
    let backend = MockBackend::new()
        .fail("down")
        .fail("down")
        .fail("down")
        .into_arc();
    let session = session_with(Arc::clone(&backend));

    let err = session.chat_with_retry("helper", "ping").await.unwrap_err();
    match err {
        MatchError::AgentExhausted {
            agent, attempts, ..
        } => {
            assert_eq!(agent, "helper");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    // Default max_retries is 3: exactly three underlying calls, no more.
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn test_permanent_error_is_not_retried() {
    // An HTTP 400 is a permanent failure: exactly one underlying call,
    // no backoff, the error surfaces as-is.
    let backend = MockBackend::new()
        .fail_status(400, "bad request")
        .reply("never reached")
        .into_arc();
    let session = session_with(Arc::clone(&backend));

    let err = session.chat_with_retry("helper", "ping").await.unwrap_err();
    match err {
        MatchError::Backend(BackendError::Status { status, .. }) => assert_eq!(status, 400),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_rate_limit_is_retried_as_transient() {
    let backend = MockBackend::new()
        .fail_status(429, "slow down")
        .reply("recovered")
        .into_arc();
    let session = session_with(Arc::clone(&backend));

    let reply = session.chat_with_retry("helper", "ping").await.unwrap();
    assert_eq!(reply, "recovered");
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_unregistered_agent_fails_without_calling_backend() {
    let backend = MockBackend::new().reply("never sent").into_arc();
    let session = AgentSession::new(backend.clone(), &fast_defaults());

    let err = session.chat_with_retry("ghost", "ping").await.unwrap_err();
    assert!(matches!(err, MatchError::AgentNotFound(_)));
    assert_eq!(backend.calls(), 0);
}

#[derive(Debug, Deserialize, JsonSchema)]
struct Verdict {
    ok: bool,
}

#[tokio::test]
async fn test_structured_strict_retries_unparseable_output() {
    let backend = MockBackend::new()
        .reply("sure, let me think about that")
        .reply(r#"{"ok": true}"#)
        .into_arc();
    let session = session_with(Arc::clone(&backend));

    let verdict: Verdict = session
        .chat_structured_strict("helper", "judge this")
        .await
        .unwrap();
    assert!(verdict.ok);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_structured_lenient_degrades_to_raw_text() {
    let backend = MockBackend::new().reply("free-form prose").into_arc();
    let session = session_with(Arc::clone(&backend));

    let parsed: Parsed<Verdict> = session
        .chat_structured_with_retry("helper", "judge this")
        .await
        .unwrap();
    match parsed {
        Parsed::Unstructured(raw) => assert_eq!(raw, "free-form prose"),
        Parsed::Structured(_) => panic!("prose should not parse"),
    }
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_structured_accepts_json_wrapped_in_commentary() {
    let backend = MockBackend::new()
        .reply("Here is my verdict: {\"ok\": false} as requested.")
        .into_arc();
    let session = session_with(backend);

    let verdict: Verdict = session
        .chat_structured_strict("helper", "judge this")
        .await
        .unwrap();
    assert!(!verdict.ok);
}

#[tokio::test]
async fn test_chat_many_collects_partial_failures() {
    let backend = MockBackend::new()
        .reply("first")
        .fail("down")
        .fail("down")
        .fail("down")
        .into_arc();
    let session = session_with(backend);

    let results = session
        .chat_many(vec![
            ("helper".to_string(), "a".to_string()),
            ("helper".to_string(), "b".to_string()),
        ])
        .await;
    assert_eq!(results.len(), 2);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
}

#[tokio::test]
async fn test_history_accumulates_per_agent() {
    let backend = MockBackend::new().reply("one").reply("two").into_arc();
    let session = session_with(backend);

    session.chat_with_history("helper", "first").await.unwrap();
    session.chat_with_history("helper", "second").await.unwrap();
    session.clear_history("helper");
    // Clearing must not unregister the agent.
    assert!(session.agent_names().contains(&"helper".to_string()));
}
