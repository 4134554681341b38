use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ideavote_core::persistence::VoteError;

use super::{log_api_issue, ErrorResponse};

/// A `VoteError` on its way out of a handler, tagged with the handler's log
/// target.
#[derive(Debug)]
pub struct ApiError {
    pub target: &'static str,
    pub inner: VoteError,
    details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(target: &'static str, inner: VoteError) -> Self {
        Self {
            target,
            inner,
            details: None,
        }
    }

    /// Attach a diagnostic for errors whose kind carries none.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref().or_else(|| self.inner.details())
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.inner.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.inner.to_string(),
            details: self.details().cloned(),
        };
        match &body.details {
            Some(details) => log_api_issue(
                status,
                self.target,
                format!("{}: {}", body.error, details),
            ),
            None => log_api_issue(status, self.target, &body.error),
        }
        (status, Json(body)).into_response()
    }
}
