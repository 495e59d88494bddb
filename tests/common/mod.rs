//! Shared helpers for the HTTP tests.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use todo_gateway::config::LimiterSettings;
use todo_gateway::rate_limit::{EnvLookup, MemoryStore, RateLimitGate, WindowRequest};
use todo_gateway::state::AppState;
use todo_gateway::todos::TodoList;
use tower::ServiceExt;

pub const CLIENT_HEADER: &str = "CF-Connecting-IP";

pub fn sample_todos() -> TodoList {
    TodoList::from_json(r#"{"todos": [{"task": "buy milk"}, {"task": "walk dog"}]}"#).unwrap()
}

/// Router over the sample list with an in-memory counter store.
pub fn memory_app() -> Router {
    let gate = RateLimitGate::new(LimiterSettings::in_memory());
    app_with_gate(gate)
}

pub fn app_with_gate(gate: RateLimitGate) -> Router {
    let header = HeaderName::from_static("cf-connecting-ip");
    let state = Arc::new(AppState::new(sample_todos(), gate, header));
    todo_gateway::app(state)
}

pub async fn get(app: &Router, uri: &str, client: Option<&str>) -> (StatusCode, String) {
    let mut builder = Request::builder().uri(uri);
    if let Some(client) = client {
        builder = builder.header(CLIENT_HEADER, client);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

pub fn env_lookup(pairs: Vec<(&'static str, String)>) -> EnvLookup {
    Arc::new(move |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.clone())
    })
}

/// In-process stand-in for an Upstash REST endpoint.
pub struct FakeUpstash {
    pub url: String,
    pub token: &'static str,
    pub calls: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct FakeState {
    token: &'static str,
    store: Arc<MemoryStore>,
    calls: Arc<AtomicUsize>,
}

pub async fn spawn_fake_upstash(token: &'static str) -> FakeUpstash {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = FakeState {
        token,
        store: Arc::new(MemoryStore::new()),
        calls: calls.clone(),
    };

    let app = Router::new().route("/", post(fake_command)).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeUpstash {
        url: format!("http://{addr}"),
        token,
        calls,
    }
}

// Understands exactly the EVAL call the sliding log limiter sends
async fn fake_command(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(args): Json<Vec<String>>,
) -> Response {
    state.calls.fetch_add(1, Ordering::SeqCst);

    let expected = format!("Bearer {}", state.token);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "WRONGPASS invalid or missing auth token"})),
        )
            .into_response();
    }

    if args.len() != 8 || args[0] != "EVAL" || args[2] != "1" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "ERR unsupported command"})),
        )
            .into_response();
    }

    let request = WindowRequest {
        key: args[3].clone(),
        limit: args[4].parse().unwrap(),
        now_ms: args[5].parse().unwrap(),
        window_ms: args[6].parse().unwrap(),
        member: args[7].clone(),
    };
    let outcome = state.store.admit_now(&request);
    let remaining = if outcome.admitted {
        i64::from(outcome.remaining)
    } else {
        -1
    };

    Json(json!({ "result": [remaining, outcome.reset_ms] })).into_response()
}
