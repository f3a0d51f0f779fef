//! API routes for the Warden web front end.
//!
//! Request bodies are parsed leniently: a malformed or missing body falls
//! back to field defaults (`log_from = 0`, empty text) instead of a 4xx, so
//! a single bad poll never breaks a client's refresh loop. Dispatch faults
//! are reported as `{ok: false, message}` rather than propagated.

use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use warden_core::{DispatchError, LogEntry, dispatch};

/// Poll request: the client's last-known log cursor.
#[derive(Debug, Default, Deserialize)]
pub struct PollRequest {
    #[serde(default)]
    pub log_from: i64,
}

/// Poll response: an incremental log slice plus reset-detection metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct PollResponse {
    pub ok: bool,
    /// Entries at or after the client's cursor.
    pub logs: Vec<LogEntry>,
    /// Echo guidance for the client; the authoritative advance cursor is
    /// `log_from + logs.len()`.
    pub log_to: u64,
    /// Process-instance id. A change means the server restarted and the
    /// client must re-poll from zero.
    pub log_guid: String,
    /// Mutation counter; moves even when entries only changed in place.
    pub log_version: u64,
    pub paused: bool,
}

/// Message request body shared by `/msg` and `/msg_sync`.
#[derive(Debug, Default, Deserialize)]
pub struct MsgRequest {
    #[serde(default)]
    pub text: String,
}

/// Message response. `response` carries the agent's final text for the
/// synchronous endpoint and is omitted for fire-and-forget.
#[derive(Debug, Serialize, Deserialize)]
pub struct MsgResponse {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl MsgResponse {
    fn received() -> Self {
        Self {
            ok: true,
            message: "Message received.".to_string(),
            response: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            response: None,
        }
    }
}

/// Lenient body parse: malformed JSON degrades to the type's defaults.
fn parse_body<T: Default + DeserializeOwned>(bytes: &Bytes) -> T {
    serde_json::from_slice(bytes).unwrap_or_default()
}

/// Health check.
async fn ok() -> &'static str {
    "OK"
}

/// Incremental log poll. Infallible: the log clamps bad cursors itself.
async fn poll(State(state): State<AppState>, body: Bytes) -> Json<PollResponse> {
    let req: PollRequest = parse_body(&body);
    let slice = state.ctx.log.get_range(req.log_from);

    Json(PollResponse {
        ok: true,
        logs: slice.entries,
        log_to: slice.version,
        log_guid: slice.guid,
        log_version: slice.version,
        paused: state.ctx.state.is_paused(),
    })
}

/// Runs one dispatch on the blocking pool. Shared by both message
/// endpoints so they report errors identically.
async fn run_dispatch(state: AppState, text: String) -> Result<String, DispatchError> {
    tokio::task::spawn_blocking(move || dispatch(&state.ctx, state.agent.as_ref(), &text))
        .await
        .map_err(|e| DispatchError::Agent(anyhow::anyhow!("dispatch task failed: {e}")))?
}

/// Fire-and-forget message dispatch: responds immediately, the stream runs
/// detached, and dispatch errors are only logged.
async fn msg(State(state): State<AppState>, body: Bytes) -> Json<MsgResponse> {
    let req: MsgRequest = parse_body(&body);

    tokio::spawn(async move {
        if let Err(e) = run_dispatch(state, req.text).await {
            tracing::warn!(error = %e, "detached message dispatch failed");
        }
    });

    Json(MsgResponse::received())
}

/// Synchronous message dispatch: blocks until the agent's final response.
async fn msg_sync(State(state): State<AppState>, body: Bytes) -> Json<MsgResponse> {
    let req: MsgRequest = parse_body(&body);

    match run_dispatch(state, req.text).await {
        Ok(response) => Json(MsgResponse {
            response: Some(response),
            ..MsgResponse::received()
        }),
        Err(e) => Json(MsgResponse::failed(e.to_string())),
    }
}

/// Builds the API router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/ok", get(ok).post(ok))
        .route("/poll", post(poll))
        .route("/msg", post(msg))
        .route("/msg_sync", post(msg_sync))
        .with_state(state)
}
