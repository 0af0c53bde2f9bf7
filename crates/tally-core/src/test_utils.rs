//! Test utilities for tally-core
//!
//! Mock servers for the external APIs tally talks to. Each binds an
//! ephemeral local port and shuts down when dropped.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Map, Value};
use tokio::sync::oneshot;

/// Bind an ephemeral port and serve `app` until the sender fires
async fn spawn(app: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

// ----------------------------------------------------------------------------
// Clerk
// ----------------------------------------------------------------------------

#[derive(Clone)]
struct ClerkState {
    secret: String,
    users: Arc<Mutex<HashMap<String, Value>>>,
}

/// Mock Clerk backend API
///
/// Supports `GET /v1/users/:id` and `PATCH /v1/users/:id/metadata` with
/// Clerk's merge semantics (`null` deletes a key). Requests must carry the
/// secret the server was started with.
pub struct MockClerkServer {
    addr: SocketAddr,
    users: Arc<Mutex<HashMap<String, Value>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockClerkServer {
    /// Start the mock server on an available port
    pub async fn start(secret: &str) -> Self {
        let users = Arc::new(Mutex::new(HashMap::new()));
        let state = ClerkState {
            secret: secret.to_string(),
            users: users.clone(),
        };

        let app = Router::new()
            .route("/v1/users/:id", get(handle_get_user))
            .route("/v1/users/:id/metadata", patch(handle_update_metadata))
            .with_state(state);

        let (addr, shutdown_tx) = spawn(app).await;

        Self {
            addr,
            users,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Register a user with empty metadata
    pub fn add_user(&self, user_id: &str) {
        self.users.lock().unwrap().insert(
            user_id.to_string(),
            json!({
                "id": user_id,
                "public_metadata": {},
                "private_metadata": {},
            }),
        );
    }

    /// The raw user object as Clerk would return it
    pub fn user(&self, user_id: &str) -> Option<Value> {
        self.users.lock().unwrap().get(user_id).cloned()
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockClerkServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_get_user(
    State(state): State<ClerkState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if bearer(&headers) != Some(state.secret.as_str()) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user = state.users.lock().unwrap().get(&id).cloned();
    user.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn handle_update_metadata(
    State(state): State<ClerkState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if bearer(&headers) != Some(state.secret.as_str()) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let mut users = state.users.lock().unwrap();
    let user = users.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    for section in ["public_metadata", "private_metadata"] {
        let Some(Value::Object(changes)) = body.get(section) else {
            continue;
        };
        let target = user
            .as_object_mut()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?
            .entry(section)
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(target) = target else {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        };
        for (key, value) in changes {
            if value.is_null() {
                target.remove(key);
            } else {
                target.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(Json(user.clone()))
}

// ----------------------------------------------------------------------------
// Chat completions
// ----------------------------------------------------------------------------

#[derive(Clone)]
struct CompletionState {
    reply: Option<String>,
    requests: Arc<Mutex<Vec<Value>>>,
    authorization: Arc<Mutex<Option<String>>>,
}

/// Mock OpenAI-compatible completion server
///
/// Answers every `POST /v1/chat/completions` with a fixed reply and records
/// the request bodies.
pub struct MockCompletionServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
    authorization: Arc<Mutex<Option<String>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockCompletionServer {
    /// Start a server that answers with `reply`
    pub async fn start(reply: &str) -> Self {
        Self::start_with(Some(reply.to_string())).await
    }

    /// Start a server that answers every request with HTTP 500
    pub async fn start_failing() -> Self {
        Self::start_with(None).await
    }

    async fn start_with(reply: Option<String>) -> Self {
        let state = CompletionState {
            reply,
            requests: Arc::new(Mutex::new(Vec::new())),
            authorization: Arc::new(Mutex::new(None)),
        };
        let requests = state.requests.clone();
        let authorization = state.authorization.clone();

        let app = Router::new()
            .route("/v1/chat/completions", post(handle_chat_completion))
            .with_state(state);

        let (addr, shutdown_tx) = spawn(app).await;

        Self {
            addr,
            requests,
            authorization,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// `Authorization` header of the most recent request
    pub fn last_authorization(&self) -> Option<String> {
        self.authorization.lock().unwrap().clone()
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockCompletionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_chat_completion(
    State(state): State<CompletionState>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    *state.authorization.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let model = request["model"].clone();
    state.requests.lock().unwrap().push(request);

    let reply = state.reply.ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": reply},
            "finish_reason": "stop"
        }]
    })))
}
