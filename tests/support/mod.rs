#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chat_relay::app::ServerConfig;
use chat_relay::{
    build_router, AppState, BindingTable, ComponentTemplate, ExtractorChain, RemotePipeline,
    SessionPolicy, SessionProxy,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const FLOW: &str = "test-flow";

/// What the fake pipeline does for one call
#[derive(Clone, Debug)]
pub enum Behaviour {
    Json(Value),
    Status(StatusCode, String),
    Text(String),
    Delay(Duration, Value),
}

#[derive(Clone, Default)]
struct FakeState {
    script: Arc<Mutex<VecDeque<Behaviour>>>,
    received: Arc<Mutex<Vec<Value>>>,
    api_keys: Arc<Mutex<Vec<Option<String>>>>,
}

impl FakeState {
    /// Pops scripted behaviours; the last one repeats
    fn next(&self) -> Behaviour {
        let mut script = self.script.lock().expect("script lock");
        if script.len() > 1 {
            script.pop_front().expect("non-empty script")
        } else {
            script.front().cloned().expect("script must not be empty")
        }
    }
}

pub struct FakePipeline {
    pub addr: SocketAddr,
    state: FakeState,
}

impl FakePipeline {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().expect("received lock").clone()
    }

    pub fn api_keys(&self) -> Vec<Option<String>> {
        self.state.api_keys.lock().expect("api key lock").clone()
    }
}

async fn run_handler(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.received.lock().expect("received lock").push(body);
    state.api_keys.lock().expect("api key lock").push(
        headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );

    match state.next() {
        Behaviour::Json(value) => Json(value).into_response(),
        Behaviour::Status(status, text) => (status, text).into_response(),
        Behaviour::Text(text) => (StatusCode::OK, text).into_response(),
        Behaviour::Delay(delay, value) => {
            tokio::time::sleep(delay).await;
            Json(value).into_response()
        }
    }
}

pub async fn spawn_pipeline(script: Vec<Behaviour>) -> FakePipeline {
    let state = FakeState {
        script: Arc::new(Mutex::new(script.into())),
        ..FakeState::default()
    };
    let app = Router::new()
        .route(&format!("/api/v1/run/{}", FLOW), post(run_handler))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve fake pipeline") });

    FakePipeline { addr, state }
}

/// A URL nothing listens on
pub fn closed_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{}", addr)
}

pub fn native_reply(text: &str) -> Value {
    json!({
        "session_id": "ignored-by-extraction-0000000000",
        "outputs": [{
            "inputs": {"input_value": "question"},
            "outputs": [{"results": {"message": {"text": text, "sender": "Machine"}}}]
        }]
    })
}

pub fn remote(base_url: &str, timeout: Duration) -> RemotePipeline {
    RemotePipeline::new(base_url, FLOW, timeout, None).expect("remote pipeline")
}

pub fn proxy_for(base_url: &str, timeout: Duration, policy: SessionPolicy) -> SessionProxy {
    SessionProxy::new(
        ComponentTemplate::builtin().expect("bundled template"),
        BindingTable::standard(),
        ExtractorChain::standard(),
        Arc::new(remote(base_url, timeout)),
        policy,
    )
    .expect("session proxy")
}

pub async fn spawn_proxy(proxy: SessionProxy) -> SocketAddr {
    spawn_proxy_with(proxy, ServerConfig::default()).await
}

pub async fn spawn_proxy_with(proxy: SessionProxy, server: ServerConfig) -> SocketAddr {
    let app = build_router(AppState::new(proxy, server));
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve proxy") });
    addr
}

pub async fn post_predict(addr: SocketAddr, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/predict", addr))
        .json(&body)
        .send()
        .await
        .expect("predict request");
    let status = StatusCode::from_u16(response.status().as_u16()).expect("status");
    let json = response.json::<Value>().await.expect("predict json");
    (status, json)
}
