//! Test helpers: spawn the backend and an in-process stand-in for the
//! repository contents API.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use base64::Engine;
use ideavote_backend::server::spawn_server;
use ideavote_backend::state::AppState;
use serde::Deserialize;

pub const GOOD_TOKEN: &str = "ghp_test";

pub async fn spawn_backend(state: AppState) -> String {
    let port = spawn_server(state).await.expect("bind backend");
    format!("http://127.0.0.1:{}", port)
}

#[derive(Default)]
pub struct FakeFile {
    pub content: Vec<u8>,
    pub sha: String,
}

#[derive(Default)]
pub struct FakeContents {
    pub file: Mutex<Option<FakeFile>>,
    pub commits: Mutex<Vec<String>>,
    /// `ref` query of every GET, in order.
    pub read_refs: Mutex<Vec<Option<String>>>,
    /// `branch` body field of every PUT, in order.
    pub write_branches: Mutex<Vec<Option<String>>>,
    /// Files larger than this are served with empty `content`, like the
    /// real API does above 1 MB.
    pub inline_limit: Mutex<Option<usize>>,
    next_sha: Mutex<u32>,
}

impl FakeContents {
    pub fn seed(&self, content: &[u8]) -> String {
        let sha = self.fresh_sha();
        *self.file.lock().unwrap() = Some(FakeFile {
            content: content.to_vec(),
            sha: sha.clone(),
        });
        sha
    }

    pub fn current(&self) -> Option<(Vec<u8>, String)> {
        self.file
            .lock()
            .unwrap()
            .as_ref()
            .map(|f| (f.content.clone(), f.sha.clone()))
    }

    pub fn set_inline_limit(&self, limit: usize) {
        *self.inline_limit.lock().unwrap() = Some(limit);
    }

    fn exceeds_inline_limit(&self, len: usize) -> bool {
        self.inline_limit
            .lock()
            .unwrap()
            .is_some_and(|limit| len > limit)
    }

    fn fresh_sha(&self) -> String {
        let mut next = self.next_sha.lock().unwrap();
        *next += 1;
        format!("{:040x}", *next)
    }
}

type Shared = Arc<FakeContents>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("token {}", GOOD_TOKEN))
        .unwrap_or(false)
}

fn accepts_raw(headers: &HeaderMap) -> bool {
    headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "application/vnd.github.raw")
}

fn reply(status: StatusCode, body: serde_json::Value) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(body))
}

async fn get_contents(
    State(fake): State<Shared>,
    Path((_owner, _repo, _path)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    fake.read_refs.lock().unwrap().push(query.get("ref").cloned());
    if !authorized(&headers) {
        return reply(
            StatusCode::UNAUTHORIZED,
            serde_json::json!({"message": "Bad credentials"}),
        );
    }
    match fake.current() {
        None => reply(
            StatusCode::NOT_FOUND,
            serde_json::json!({"message": "Not Found"}),
        ),
        Some((content, _)) if accepts_raw(&headers) => reply(
            StatusCode::OK,
            serde_json::from_slice(&content).unwrap_or(serde_json::Value::Null),
        ),
        Some((content, sha)) if fake.exceeds_inline_limit(content.len()) => reply(
            StatusCode::OK,
            serde_json::json!({"content": "", "encoding": "none", "sha": sha}),
        ),
        Some((content, sha)) => {
            // Wrapped at 60 columns the way the real API does it.
            let encoded = base64::engine::general_purpose::STANDARD.encode(content);
            let wrapped: Vec<String> = encoded
                .as_bytes()
                .chunks(60)
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect();
            reply(
                StatusCode::OK,
                serde_json::json!({
                    "content": wrapped.join("\n") + "\n",
                    "encoding": "base64",
                    "sha": sha,
                }),
            )
        }
    }
}

#[derive(Deserialize)]
struct PutBody {
    message: String,
    content: String,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    branch: Option<String>,
}

async fn put_contents(
    State(fake): State<Shared>,
    Path((_owner, _repo, _path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<PutBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    fake.write_branches.lock().unwrap().push(body.branch.clone());
    if !authorized(&headers) {
        return reply(
            StatusCode::UNAUTHORIZED,
            serde_json::json!({"message": "Bad credentials"}),
        );
    }
    let current_sha = fake.current().map(|(_, sha)| sha);
    match (current_sha.as_deref(), body.sha.as_deref()) {
        (Some(cur), Some(given)) if cur != given => {
            return reply(
                StatusCode::CONFLICT,
                serde_json::json!({"message": format!("is at {} but expected {}", cur, given)}),
            )
        }
        (Some(_), None) => {
            return reply(
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({"message": "\"sha\" wasn't supplied."}),
            )
        }
        (None, Some(_)) => {
            return reply(
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({"message": "sha does not match"}),
            )
        }
        _ => {}
    }

    let content = match base64::engine::general_purpose::STANDARD.decode(&body.content) {
        Ok(content) => content,
        Err(e) => {
            return reply(
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({"message": e.to_string()}),
            )
        }
    };
    let sha = fake.seed(&content);
    fake.commits.lock().unwrap().push(body.message);
    reply(
        StatusCode::CREATED,
        serde_json::json!({"content": {"sha": sha}, "commit": {"sha": "c0ffee"}}),
    )
}

/// Start the fake contents API; returns its base URL and shared state.
pub async fn spawn_fake_contents() -> (String, Shared) {
    let fake: Shared = Arc::new(FakeContents::default());
    let app = Router::new()
        .route(
            "/repos/{owner}/{repo}/contents/{*path}",
            get(get_contents).put(put_contents),
        )
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake contents API");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), fake)
}
