mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{Reply, ScriptedTransport, network_down, ok, start_clock};
use deckmaster::config::GatewayConfig;
use deckmaster::gateway::client::Gateway;
use deckmaster::gateway::transport::{ApiRequest, Transport, TransportResponse};
use deckmaster::TransportError;

fn gateway(transport: Arc<ScriptedTransport>) -> (Gateway, Arc<deckmaster::clock::ManualClock>) {
    let clock = start_clock();
    let gateway = Gateway::new(transport, clock.clone(), GatewayConfig::default());
    (gateway, clock)
}

#[tokio::test]
async fn fail_fail_succeed_waits_one_then_two_seconds() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on_get(
        "/health",
        vec![
            network_down(),
            Reply::Json(503, json!({"error": "warming up"})),
            ok(json!({"status": "healthy", "message": "DeckMaster is running perfectly"})),
        ],
    );
    let (gateway, clock) = gateway(transport.clone());

    let health = gateway.health().await.unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(transport.count(Method::GET, "/health"), 3);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn three_failures_are_terminal() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on_get("/plans", vec![network_down()]);
    let (gateway, clock) = gateway(transport.clone());

    let err = gateway.list_plans().await.unwrap_err();

    assert_eq!(err.attempts, 3);
    assert_eq!(
        err.last_error,
        TransportError::Network("connection refused".into())
    );
    assert_eq!(transport.count(Method::GET, "/plans"), 3);
    assert_eq!(clock.sleeps().len(), 2);
}

#[tokio::test]
async fn client_errors_are_retried_and_reported_with_status() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on_get(
        "/job/missing",
        vec![Reply::Json(404, json!({"error": "Job not found"}))],
    );
    let (gateway, _) = gateway(transport.clone());

    let err = gateway.job_status("missing").await.unwrap_err();

    assert_eq!(err.attempts, 3);
    assert_eq!(err.status(), Some(404));
    assert!(err.is_client_rejection());
    assert_eq!(
        err.to_string(),
        "API request failed after 3 attempts: HTTP 404: Job not found"
    );
}

#[tokio::test]
async fn undecodable_body_counts_as_a_failed_attempt() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on_get(
        "/designs",
        vec![
            ok(json!({"unexpected": true})),
            ok(json!({"designs": [{"id": "minimal_1", "name": "Minimal Professional"}]})),
        ],
    );
    let (gateway, clock) = gateway(transport.clone());

    let designs = gateway.list_designs().await.unwrap();

    assert_eq!(designs.designs.len(), 1);
    assert_eq!(transport.count(Method::GET, "/designs"), 2);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
}

#[tokio::test(start_paused = true)]
async fn timed_out_attempt_is_retried() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on_get(
        "/health",
        vec![Reply::Hang, ok(json!({"status": "healthy"}))],
    );
    let (gateway, clock) = gateway(transport.clone());

    let health = gateway.health().await.unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(transport.count(Method::GET, "/health"), 2);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
}

#[tokio::test(start_paused = true)]
async fn every_attempt_timing_out_reports_timeout() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on_get("/health", vec![Reply::Hang]);
    let (gateway, _) = gateway(transport.clone());

    let err = gateway.health().await.unwrap_err();

    assert_eq!(err.attempts, 3);
    assert_eq!(
        err.last_error,
        TransportError::Timeout(Duration::from_secs(30))
    );
}

#[tokio::test]
async fn cancelled_call_is_not_attempted() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on_get("/health", vec![ok(json!({"status": "healthy"}))]);
    let (gateway, _) = gateway(transport.clone());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = gateway
        .call_cancellable::<serde_json::Value>(ApiRequest::get("/health"), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.attempts, 1);
    assert!(transport.calls().is_empty());
}

/// Fails every call and cancels the caller's token while doing so.
struct FailAndCancel {
    cancel: CancellationToken,
    calls: AtomicU32,
}

#[async_trait]
impl Transport for FailAndCancel {
    async fn send(&self, _request: &ApiRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
        Err(TransportError::Network("connection reset".into()))
    }
}

#[tokio::test]
async fn cancellation_during_backoff_stops_retrying() {
    let cancel = CancellationToken::new();
    let transport = Arc::new(FailAndCancel {
        cancel: cancel.clone(),
        calls: AtomicU32::new(0),
    });
    let clock = start_clock();
    let gateway = Gateway::new(transport.clone(), clock.clone(), GatewayConfig::default());

    let err = gateway
        .call_cancellable::<serde_json::Value>(ApiRequest::get("/health"), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.attempts, 1);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert!(clock.sleeps().is_empty());
}
