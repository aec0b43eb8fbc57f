//! Test doubles shared by the handler and client tests.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::{to_bytes, Body},
    extract::{Query, State},
    http::{header::CONTENT_TYPE, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use crate::{db::DBLayer, state::AppState, upstream::UpstreamClient};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub query: HashMap<String, String>,
}

#[derive(Clone, Default)]
struct Shared {
    responses: Arc<Mutex<HashMap<String, (u16, String)>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

/// A real HTTP server on an ephemeral loopback port standing in for the GPS
/// API. Unconfigured paths answer 404.
pub struct FakeUpstream {
    addr: SocketAddr,
    shared: Shared,
}

impl FakeUpstream {
    pub async fn start() -> Self {
        let shared = Shared::default();
        let app = Router::new().fallback(record).with_state(shared.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, shared }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn respond(&self, path: &str, body: Value) {
        self.respond_raw(path, 200, body.to_string());
    }

    pub fn respond_raw(&self, path: &str, status: u16, body: impl Into<String>) {
        self.shared
            .responses
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.into()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.shared.calls.lock().unwrap().clone()
    }
}

async fn record(
    State(shared): State<Shared>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let path = uri.path().to_string();
    shared.calls.lock().unwrap().push(RecordedCall {
        path: path.clone(),
        query,
    });

    let canned = shared.responses.lock().unwrap().get(&path).cloned();
    match canned {
        Some((status, body)) => (
            StatusCode::from_u16(status).unwrap(),
            [(CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// App state backed by an in-memory database and the given fake upstream.
pub async fn test_state(upstream: &FakeUpstream) -> AppState {
    let db = DBLayer::new("sqlite::memory:").await.unwrap();
    let client =
        UpstreamClient::new(&upstream.base_url(), "test-key", Duration::from_secs(2)).unwrap();
    AppState::new(db, client)
}

/// Sends one request through `app` and returns the status plus JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn put_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
