use axum::{
    http::StatusCode,
    routing::{any, get},
    Router,
};
use serde::Serialize;

mod error;
mod status;
mod votes;

pub use error::ApiError;

use crate::state::AppState;

/// Axum REST API routes.
///
///   POST /api/save-vote   -> append one vote record to the store
///   GET  /api/get-votes   -> every stored vote record ([] if none yet)
///   GET  /status          -> health check (+ store kind, configured flag)
///   GET  /logs            -> recent backend log entries
///
/// The vote routes accept any verb and answer 405 themselves so the body
/// matches the rest of the error responses.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/save-vote", any(votes::save_vote))
        .route("/api/get-votes", any(votes::get_votes))
        .route("/status", get(status::status))
        .route("/logs", get(status::list_logs))
}

// ── Shared types and helpers used across sub-modules ────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

fn log_api_issue(status: StatusCode, target: &'static str, message: impl AsRef<str>) {
    let message = message.as_ref();
    if status.is_server_error() {
        log::error!(target: target, "{}", message);
    } else {
        log::warn!(target: target, "{}", message);
    }
}
