use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use deckmaster::clock::SystemClock;
use deckmaster::config::GatewayConfig;
use deckmaster::gateway::client::Gateway;
use deckmaster::gateway::http::ReqwestTransport;
use deckmaster::gateway::transport::{ApiRequest, Transport};
use deckmaster::models::generation::GenerationRequest;
use deckmaster::models::plan::PlanId;

fn fast_gateway(server: &MockServer) -> Gateway {
    let transport = ReqwestTransport::new(&format!("{}/api", server.uri()));
    Gateway::new(
        Arc::new(transport),
        Arc::new(SystemClock),
        GatewayConfig {
            request_timeout: Duration::from_secs(5),
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        },
    )
}

#[tokio::test]
async fn get_hits_base_url_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "timestamp": 1714564800.0,
            "message": "DeckMaster is running perfectly"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let health = fast_gateway(&server).health().await.unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(
        health.message.as_deref(),
        Some("DeckMaster is running perfectly")
    );
}

#[tokio::test]
async fn non_2xx_is_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Job not found"})))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&format!("{}/api/", server.uri()));
    let response = transport.send(&ApiRequest::get("/job/nope")).await.unwrap();

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/u1/plan"))
        .and(body_json(json!({"plan": "elite"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "user": {
                "user_id": "u1",
                "plan": "elite",
                "daily_usage": 0,
                "total_usage": 4,
                "last_reset_date": "2024-05-01"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = fast_gateway(&server)
        .update_plan("u1", PlanId::Elite)
        .await
        .unwrap();

    assert_eq!(payload.user.plan, PlanId::Elite);
    assert!(payload.plan.is_none());
}

#[tokio::test]
async fn generation_body_carries_every_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(json!({
            "user_id": "u1",
            "task": "Quarterly sales review",
            "url": "",
            "design_style": "minimal_1",
            "slide_count": 3,
            "graphs": false,
            "tables": true,
            "pie_charts": false,
            "images": false
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "job_id": "j1", "estimated_time": 30})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut request = GenerationRequest::new("Quarterly sales review");
    request.tables = true;
    let submitted = fast_gateway(&server)
        .submit_generation("u1", &request)
        .await
        .unwrap();

    assert_eq!(submitted.job_id, "j1");
    assert_eq!(submitted.estimated_time, Some(30.0));
}

#[tokio::test]
async fn service_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plans": {
                "free": {"name": "Free", "daily_limit": 3, "total_limit": 3, "max_slides": 5,
                         "has_ads": true, "visual_elements": false, "price": 0}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let plans = fast_gateway(&server).list_plans().await.unwrap();

    assert_eq!(plans.plans["free"].max_slides, 5);
}

#[tokio::test]
async fn slow_backend_times_out_each_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "healthy"}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&format!("{}/api", server.uri()));
    let gateway = Gateway::new(
        Arc::new(transport),
        Arc::new(SystemClock),
        GatewayConfig {
            request_timeout: Duration::from_millis(50),
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
        },
    );

    let err = gateway.health().await.unwrap_err();

    assert_eq!(err.attempts, 2);
    assert_eq!(
        err.last_error,
        deckmaster::TransportError::Timeout(Duration::from_millis(50))
    );
}
