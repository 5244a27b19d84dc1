//! Stub upstream API and recording collaborators shared by the service tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tokio::sync::watch;

use crate::fetch::fetcher::{HandlerFuture, PayloadHandler, PollRequest, RetryScheduler, RetryTask};

const STUB_PREFIX: &str = "/api/v1/";

#[derive(Debug, Clone)]
pub struct StubResponse {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: String,
    hold: Option<watch::Receiver<bool>>,
}

impl StubResponse {
    pub fn json(body: Value) -> Self {
        Self::text(body.to_string()).with_header("content-type", "application/json")
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: body.into(),
            hold: None,
        }
    }

    /// Quota exhausted. The body is deliberately not JSON so a parse attempt would show up.
    pub fn rate_limited(retry_after: &str) -> Self {
        Self::text("{rate limited")
            .with_status(StatusCode::TOO_MANY_REQUESTS)
            .with_header("X-Ratelimit-Limit", "5")
            .with_header("X-RateLimit-Remaining", "0")
            .with_header("Retry-After", retry_after)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Delay the response until the paired sender publishes `true`.
    pub fn held_until(mut self, release: watch::Receiver<bool>) -> Self {
        self.hold = Some(release);
        self
    }
}

#[derive(Default)]
struct StubState {
    sticky: Mutex<HashMap<String, StubResponse>>,
    queued: Mutex<HashMap<String, VecDeque<StubResponse>>>,
    hits: Mutex<HashMap<String, usize>>,
    order: Mutex<Vec<String>>,
    last_headers: Mutex<HashMap<String, HeaderMap>>,
}

pub struct StubUpstream {
    state: Arc<StubState>,
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl StubUpstream {
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .fallback(stub_handler)
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub upstream listener");
        let addr = listener.local_addr().expect("stub upstream address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve stub upstream");
        });

        Self {
            state,
            base_url: format!("http://{addr}/api/v1"),
            handle,
        }
    }

    /// Serve `response` for `endpoint` on every request with nothing queued.
    pub fn respond(&self, endpoint: &str, response: StubResponse) {
        self.state
            .sticky
            .lock()
            .expect("stub sticky lock")
            .insert(endpoint.to_string(), response);
    }

    /// Serve `response` for the next request to `endpoint` only.
    pub fn respond_once(&self, endpoint: &str, response: StubResponse) {
        self.state
            .queued
            .lock()
            .expect("stub queue lock")
            .entry(endpoint.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn hits(&self, endpoint: &str) -> usize {
        self.state
            .hits
            .lock()
            .expect("stub hits lock")
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    /// Endpoints in the order their requests arrived.
    pub fn request_order(&self) -> Vec<String> {
        self.state.order.lock().expect("stub order lock").clone()
    }

    pub fn last_headers(&self, endpoint: &str) -> Option<HeaderMap> {
        self.state
            .last_headers
            .lock()
            .expect("stub headers lock")
            .get(endpoint)
            .cloned()
    }

    pub async fn wait_for_hits(&self, endpoint: &str, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.hits(endpoint) < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("stub upstream should see the expected requests");
    }
}

impl Drop for StubUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn stub_handler(
    State(state): State<Arc<StubState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let endpoint = uri
        .path()
        .strip_prefix(STUB_PREFIX)
        .unwrap_or(uri.path())
        .to_string();

    *state
        .hits
        .lock()
        .expect("stub hits lock")
        .entry(endpoint.clone())
        .or_default() += 1;
    state
        .order
        .lock()
        .expect("stub order lock")
        .push(endpoint.clone());
    state
        .last_headers
        .lock()
        .expect("stub headers lock")
        .insert(endpoint.clone(), headers);

    let queued = state
        .queued
        .lock()
        .expect("stub queue lock")
        .get_mut(&endpoint)
        .and_then(VecDeque::pop_front);
    let response = queued.or_else(|| {
        state
            .sticky
            .lock()
            .expect("stub sticky lock")
            .get(&endpoint)
            .cloned()
    });
    let Some(response) = response else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(mut release) = response.hold.clone() {
        let _ = release.wait_for(|released| *released).await;
    }

    let mut out = (response.status, response.body).into_response();
    for (name, value) in response.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            out.headers_mut().insert(name, value);
        }
    }
    out
}

/// Records every payload handed off by the fetcher.
#[derive(Default)]
pub struct RecordingHandler {
    payloads: Mutex<Vec<(String, Value)>>,
}

impl RecordingHandler {
    pub fn payloads(&self) -> Vec<(String, Value)> {
        self.payloads.lock().expect("handler lock").clone()
    }
}

impl PayloadHandler for RecordingHandler {
    fn handle<'a>(&'a self, request: &'a PollRequest, payload: &'a Value) -> HandlerFuture<'a> {
        Box::pin(async move {
            self.payloads
                .lock()
                .expect("handler lock")
                .push((request.endpoint().to_string(), payload.clone()));
        })
    }
}

/// Captures scheduled retries instead of spawning them.
#[derive(Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<(Duration, RetryTask)>>,
}

impl RecordingScheduler {
    pub fn delays(&self) -> Vec<Duration> {
        self.scheduled
            .lock()
            .expect("scheduler lock")
            .iter()
            .map(|(delay, _)| *delay)
            .collect()
    }

    pub fn take(&self) -> Vec<(Duration, RetryTask)> {
        std::mem::take(&mut *self.scheduled.lock().expect("scheduler lock"))
    }
}

impl RetryScheduler for RecordingScheduler {
    fn schedule(&self, delay: Duration, task: RetryTask) {
        self.scheduled
            .lock()
            .expect("scheduler lock")
            .push((delay, task));
    }
}
