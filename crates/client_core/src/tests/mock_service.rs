//! In-process stand-in for the spreadsheet web app, served over real HTTP.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
pub(crate) struct Reply {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl Reply {
    pub(crate) fn json(body: Value) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    pub(crate) fn with_status(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Holds the response back, like a slow script execution.
    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct MockState {
    snapshot: Reply,
    replies: HashMap<String, Reply>,
    requests: Vec<Value>,
    snapshot_reads: usize,
}

#[derive(Clone)]
pub(crate) struct MockService {
    state: Arc<Mutex<MockState>>,
}

impl MockService {
    pub(crate) async fn set_snapshot(&self, reply: Reply) {
        self.state.lock().await.snapshot = reply;
    }

    pub(crate) async fn set_reply(&self, action: &str, reply: Reply) {
        self.state
            .lock()
            .await
            .replies
            .insert(action.to_string(), reply);
    }

    /// Every POST body received, oldest first.
    pub(crate) async fn requests(&self) -> Vec<Value> {
        self.state.lock().await.requests.clone()
    }

    pub(crate) async fn actions(&self) -> Vec<String> {
        self.requests()
            .await
            .iter()
            .map(|request| request["action"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub(crate) async fn snapshot_reads(&self) -> usize {
        self.state.lock().await.snapshot_reads
    }
}

async fn read_snapshot(State(service): State<MockService>) -> impl IntoResponse {
    let reply = {
        let mut state = service.state.lock().await;
        state.snapshot_reads += 1;
        state.snapshot.clone()
    };
    respond(reply).await
}

async fn post_action(
    State(service): State<MockService>,
    Json(request): Json<Value>,
) -> impl IntoResponse {
    let reply = {
        let mut state = service.state.lock().await;
        let action = request["action"].as_str().unwrap_or_default().to_string();
        state.requests.push(request);
        state
            .replies
            .get(&action)
            .cloned()
            .unwrap_or_else(|| Reply::json(json!({"result": "Success"})))
    };
    respond(reply).await
}

async fn respond(reply: Reply) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
}

/// Starts the mock on an ephemeral port. Returns the web app URL.
pub(crate) async fn spawn() -> (String, MockService) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock service");
    let addr = listener.local_addr().expect("mock service addr");
    let service = MockService {
        state: Arc::new(Mutex::new(MockState {
            snapshot: Reply::json(json!({"employees": [], "reports": []})),
            replies: HashMap::new(),
            requests: Vec::new(),
            snapshot_reads: 0,
        })),
    };
    let app = Router::new()
        .route("/exec", get(read_snapshot).post(post_action))
        .with_state(service.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/exec"), service)
}
