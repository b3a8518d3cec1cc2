//! In-process fake of the SDP REST API for tests.
//!
//! Serves canned JSON responses keyed by `"METHOD /path"` and records every
//! request it receives. Unknown routes answer 404.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request seen by the fake server
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RecordedCall {
    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `"METHOD /path"`, handy for asserting call sequences
    pub fn route(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Clone)]
struct FakeState {
    responses: Arc<HashMap<String, (u16, Value)>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

/// Running fake server; aborted on drop
pub struct FakeSdp {
    pub base_url: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    handle: JoinHandle<()>,
}

impl FakeSdp {
    /// Bind to an ephemeral localhost port and start serving
    pub async fn start(routes: Vec<(&str, u16, Value)>) -> Self {
        let responses = routes
            .into_iter()
            .map(|(route, status, body)| (route.to_string(), (status, body)))
            .collect();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            responses: Arc::new(responses),
            calls: calls.clone(),
        };

        let app = Router::new().fallback(respond).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake SDP listener");
        let addr = listener.local_addr().expect("fake SDP local addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            calls,
            handle,
        }
    }

    /// Every request received so far, in arrival order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Routes received so far, e.g. `["PUT /api/v3/cmdb/ci/CI001"]`
    pub fn routes(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::route).collect()
    }
}

impl Drop for FakeSdp {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let route = format!("{} {}", method, uri.path());
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };

    if let Ok(mut calls) = state.calls.lock() {
        calls.push(RecordedCall {
            method: method.to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers,
            body,
        });
    }

    let (status, payload) = state
        .responses
        .get(&route)
        .cloned()
        .unwrap_or((404, serde_json::json!({ "error": format!("no route for {}", route) })));

    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        payload.to_string(),
    )
}
