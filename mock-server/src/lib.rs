use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Body served by `GET /stream`.
pub const STREAM_BODY: &str = "# Streamed document\n\nThis text is served as a plain-text attachment\nso clients can exercise streamed downloads.\n";

/// Returned by `POST /stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub file_name: String,
    pub bytes: usize,
}

#[derive(Clone, Default)]
pub struct AppState {
    /// Bytes received by the most recent `POST /stream`.
    pub uploads: Arc<RwLock<Vec<u8>>>,
    /// Requests served by `GET /cache/{secs}`.
    pub cache_hits: Arc<AtomicU64>,
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/status/{code}", get(status_code))
        .route("/json", get(get_json).post(post_json).put(put_json).patch(patch_json))
        .route("/json/{id}", delete(delete_json))
        .route("/stream", get(get_stream).post(post_stream))
        .route("/stream/last", get(last_upload))
        .route("/cache/{secs}", get(cached))
        .route("/headers", get(echo_headers))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn status_code(Path(code): Path<u16>) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, Json(json!({ "statusCodeReceived": code }))))
}

async fn get_json() -> Json<Value> {
    Json(json!({ "hello": 200 }))
}

async fn post_json(body: Bytes) -> Json<Value> {
    let received: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Json(json!({ "id": 123, "received": received }))
}

async fn put_json() -> Json<Value> {
    Json(json!({ "updated": "something" }))
}

async fn patch_json() -> Json<Value> {
    Json(json!({ "patched": "something" }))
}

async fn delete_json(Path(id): Path<u64>) -> Json<Value> {
    Json(json!({ "deleted": "something", "id": id }))
}

async fn get_stream() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/plain"),
            (header::CONTENT_DISPOSITION, "attachment; filename=README.md"),
        ],
        STREAM_BODY,
    )
}

async fn post_stream(State(state): State<AppState>, body: Bytes) -> Json<UploadReceipt> {
    let len = body.len();
    *state.uploads.write().await = body.to_vec();
    tracing::debug!(bytes = len, "stored streamed upload");
    Json(UploadReceipt {
        file_name: "file.md".to_string(),
        bytes: len,
    })
}

async fn last_upload(State(state): State<AppState>) -> Vec<u8> {
    state.uploads.read().await.clone()
}

async fn cached(State(state): State<AppState>, Path(secs): Path<u64>) -> impl IntoResponse {
    let hits = state.cache_hits.fetch_add(1, Ordering::SeqCst) + 1;
    (
        [(header::CACHE_CONTROL, format!("public, max-age={secs}"))],
        Json(json!({ "hits": hits })),
    )
}

async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    Json(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect(),
    )
}
