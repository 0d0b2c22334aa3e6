//! Purpose: Loopback fake of the tagging service for integration tests.
//! Exports: `FakeTagStore`, `RecordedAuth`, `bearer_token`, `TestResult`.
//! Role: Real HTTP server (axum on a private tokio runtime) speaking the tag store routes.
//! Invariants: Tags are keyed by `(identity, resource_type, resource_name)`; duplicates get 409.
//! Invariants: The server shuts down and its thread is joined on drop.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use tagfolders::api::Tag;

pub type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

pub const SLOW_IDENTITY: &str = "user_slow_down";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordedAuth {
    pub authorization: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Default)]
pub struct StoreState {
    pub tags: Vec<Tag>,
    pub auth: Vec<RecordedAuth>,
    pub requests: Vec<String>,
    pub fail_next: Option<(u16, String)>,
}

type Shared = Arc<Mutex<StoreState>>;

pub struct FakeTagStore {
    base_url: String,
    state: Shared,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FakeTagStore {
    pub fn start() -> TestResult<Self> {
        let state: Shared = Arc::new(Mutex::new(StoreState::default()));
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let app = router(state.clone());
        let thread = std::thread::spawn(move || {
            runtime.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("fake tag store");
            });
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn fail_next(&self, status: u16, body: &str) {
        self.state().fail_next = Some((status, body.to_string()));
    }
}

impl Drop for FakeTagStore {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Unsigned token whose claims resolve to `user_{authns}_{user}`.
pub fn bearer_token(authns: &str, user: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(json!({ "authns": authns, "user": user }).to_string());
    format!("{header}.{claims}.unsigned")
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/tags", post(create_tag).put(update_tag))
        .route("/tags/*rest", get(read_tags).delete(delete_tags))
        .with_state(state)
}

fn record(state: &Shared, headers: &HeaderMap, line: String) -> Option<Response> {
    let mut guard = state.lock().unwrap_or_else(|poison| poison.into_inner());
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    guard.auth.push(RecordedAuth {
        authorization: header("authorization"),
        api_key: header("x-api-key"),
    });
    guard.requests.push(line);
    guard.fail_next.take().map(|(status, body)| {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, body).into_response()
    })
}

fn same_key(a: &Tag, b: &Tag) -> bool {
    a.identity == b.identity && a.resource_type == b.resource_type && a.resource_name == b.resource_name
}

fn with_created_at(tag: &Tag) -> serde_json::Value {
    let mut value = serde_json::to_value(tag).unwrap_or_default();
    value["created_at"] = json!(1_700_000_000);
    value
}

async fn create_tag(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(tag): Json<Tag>,
) -> Response {
    if let Some(failure) = record(&state, &headers, "POST /tags".to_string()) {
        return failure;
    }
    let mut guard = state.lock().unwrap_or_else(|poison| poison.into_inner());
    if guard.tags.iter().any(|existing| same_key(existing, &tag)) {
        return (StatusCode::CONFLICT, Json(json!({ "detail": "tag exists" }))).into_response();
    }
    guard.tags.push(tag.clone());
    (StatusCode::CREATED, Json(with_created_at(&tag))).into_response()
}

async fn update_tag(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(tag): Json<Tag>,
) -> Response {
    if let Some(failure) = record(&state, &headers, "PUT /tags".to_string()) {
        return failure;
    }
    let mut guard = state.lock().unwrap_or_else(|poison| poison.into_inner());
    match guard.tags.iter_mut().find(|existing| same_key(existing, &tag)) {
        Some(existing) => {
            *existing = tag.clone();
            Json(with_created_at(&tag)).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({ "detail": "no such tag" }))).into_response(),
    }
}

async fn read_tags(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(rest): Path<String>,
) -> Response {
    if let Some(failure) = record(&state, &headers, format!("GET /tags/{rest}")) {
        return failure;
    }
    let segments: Vec<&str> = rest.split('/').collect();
    let matched: Vec<Tag> = match segments.as_slice() {
        ["by_resource", identity, selector @ ..] => {
            let guard = state.lock().unwrap_or_else(|poison| poison.into_inner());
            guard
                .tags
                .iter()
                .filter(|tag| tag.identity == *identity && resource_prefix(tag, selector))
                .cloned()
                .collect()
        }
        ["by_tag_name", identity, tag_name, selector @ ..] => {
            if *identity == SLOW_IDENTITY {
                tokio::time::sleep(Duration::from_millis(800)).await;
            }
            let guard = state.lock().unwrap_or_else(|poison| poison.into_inner());
            guard
                .tags
                .iter()
                .filter(|tag| {
                    tag.identity == *identity
                        && tag.tag_name == *tag_name
                        && selector.first().is_none_or(|t| tag.resource_type == *t)
                        && selector.get(1).is_none_or(|n| tag.resource_name == *n)
                })
                .cloned()
                .collect()
        }
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(matched).into_response()
}

async fn delete_tags(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(rest): Path<String>,
) -> Response {
    if let Some(failure) = record(&state, &headers, format!("DELETE /tags/{rest}")) {
        return failure;
    }
    let segments: Vec<&str> = rest.split('/').collect();
    let Some((identity, selector)) = segments.split_first() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut guard = state.lock().unwrap_or_else(|poison| poison.into_inner());
    guard
        .tags
        .retain(|tag| !(tag.identity == *identity && resource_prefix(tag, selector)));
    StatusCode::NO_CONTENT.into_response()
}

fn resource_prefix(tag: &Tag, selector: &[&str]) -> bool {
    let fields = [&tag.resource_type, &tag.resource_name, &tag.tag_name];
    selector
        .iter()
        .zip(fields)
        .all(|(wanted, actual)| actual.as_str() == *wanted)
}
