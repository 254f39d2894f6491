#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use http::Method;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use deckmaster::clock::ManualClock;
use deckmaster::events::SessionEvent;
use deckmaster::gateway::transport::{ApiRequest, Transport, TransportResponse};
use deckmaster::state::SessionContext;
use deckmaster::store::kv::KvStore;
use deckmaster::store::local::USER_ID_KEY;
use deckmaster::store::memory::MemoryStore;
use deckmaster::{Config, DeckClient, TransportError};

pub const API_URL: &str = "http://deckmaster.test/api";
pub const USER_ID: &str = "user_1714564800000_test";
pub const ADMIN_SECRET: &str = "open-sesame";

/// One scripted reply.
#[derive(Clone, Debug)]
pub enum Reply {
    Json(u16, Value),
    Fail(TransportError),
    /// Never answers.
    Hang,
}

pub fn ok(body: Value) -> Reply {
    Reply::Json(200, body)
}

pub fn network_down() -> Reply {
    Reply::Fail(TransportError::Network("connection refused".into()))
}

/// A transport answering from per-route queues.
///
/// Each route pops its next reply; the last reply of a queue repeats forever.
/// Unscripted routes fail with a network error.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, method: Method, path: &str, replies: Vec<Reply>) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), replies.into());
    }

    pub fn on_get(&self, path: &str, replies: Vec<Reply>) {
        self.script(Method::GET, path, replies);
    }

    pub fn on_post(&self, path: &str, replies: Vec<Reply>) {
        self.script(Method::POST, path, replies);
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    /// JSON bodies sent to `path`, in call order.
    pub fn bodies(&self, path: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path == path)
            .filter_map(|c| c.body.as_ref())
            .map(|b| serde_json::from_slice(b).unwrap())
            .collect()
    }

    fn next_reply(&self, request: &ApiRequest) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(&(request.method.clone(), request.path.clone()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());

        match self.next_reply(request) {
            Some(Reply::Json(status, body)) => Ok(TransportResponse {
                status,
                body: serde_json::to_vec(&body).unwrap(),
            }),
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::Hang) => futures::future::pending().await,
            None => Err(TransportError::Network(format!(
                "no route for {} {}",
                request.method, request.path
            ))),
        }
    }
}

pub struct Harness {
    pub client: DeckClient,
    pub transport: Arc<ScriptedTransport>,
    pub clock: Arc<ManualClock>,
    pub store: MemoryStore,
    pub events: broadcast::Receiver<SessionEvent>,
}

impl Harness {
    /// Events received so far, without waiting.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Waits (in tokio time) for the next event.
    pub async fn next_event(&mut self) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(3600), self.events.recv())
            .await
            .expect("no event within an hour")
            .expect("event channel closed")
    }
}

pub fn config() -> Config {
    Config::new(API_URL).with_admin_secret(ADMIN_SECRET)
}

/// 2024-05-01 12:00:00 UTC.
pub fn start_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ))
}

pub async fn harness_with(config: Config, transport: ScriptedTransport) -> Harness {
    let transport = Arc::new(transport);
    let clock = start_clock();
    let store = MemoryStore::new();
    store.set(USER_ID_KEY, USER_ID).await.unwrap();

    let ctx = SessionContext::from_parts(
        config,
        transport.clone(),
        Arc::new(store.clone()),
        clock.clone(),
    )
    .await;
    let client = DeckClient::from_context(ctx);
    let events = client.subscribe();

    Harness {
        client,
        transport,
        clock,
        store,
        events,
    }
}

pub async fn harness(transport: ScriptedTransport) -> Harness {
    harness_with(config(), transport).await
}

pub fn user_path() -> String {
    format!("/user/{}", USER_ID)
}

pub fn user_body(plan: &str, daily_usage: u32, total_usage: u32, last_reset_date: &str) -> Value {
    json!({
        "user": {
            "user_id": USER_ID,
            "plan": plan,
            "daily_usage": daily_usage,
            "total_usage": total_usage,
            "last_reset_date": last_reset_date,
            "created_at": "2024-04-01T10:00:00",
            "last_activity": "2024-05-01T10:00:00"
        }
    })
}

/// A transport whose user endpoint reports the given plan and usage today.
pub fn transport_with_user(plan: &str, daily_usage: u32, total_usage: u32) -> ScriptedTransport {
    let transport = ScriptedTransport::new();
    transport.on_get(
        &user_path(),
        vec![ok(user_body(plan, daily_usage, total_usage, "2024-05-01"))],
    );
    transport
}

pub fn admin_activation(seconds: u64) -> Reply {
    ok(json!({
        "success": true,
        "message": "Admin mode activated",
        "admin_status": {"is_admin": true, "time_remaining": seconds}
    }))
}

pub fn job(state: &str) -> Reply {
    match state {
        "DONE" => ok(json!({
            "state": "DONE",
            "filename": "deck.pptx",
            "download_url": "/api/download/job-1"
        })),
        "FAILED" => ok(json!({"state": "FAILED", "error": "LLM quota exhausted"})),
        other => ok(json!({"state": other})),
    }
}

pub fn submitted(estimated_time: f64) -> Reply {
    ok(json!({"success": true, "job_id": "job-1", "estimated_time": estimated_time}))
}
