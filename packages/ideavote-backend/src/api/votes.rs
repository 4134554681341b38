use axum::{body::Bytes, extract::State, http::Method, Json};
use ideavote_core::persistence::{SubmitAck, SubmitVote, VoteError, VotePersistence};
use ideavote_core::types::VoteRecord;

use super::ApiError;
use crate::state::AppState;

const SAVE_TARGET: &str = "ideavote.api.save_vote";
const GET_TARGET: &str = "ideavote.api.get_votes";

/// Decode a submission body. An empty body is an empty submission, which
/// then fails validation like any other missing field.
fn parse_submission(body: &[u8]) -> Result<SubmitVote, ApiError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(SubmitVote::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError::new(
            SAVE_TARGET,
            VoteError::Validation("Invalid JSON body".to_string()),
        )
        .with_details(serde_json::Value::String(e.to_string()))
    })
}

/// POST /api/save-vote
pub async fn save_vote(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<Json<SubmitAck>, ApiError> {
    if method != Method::POST {
        return Err(ApiError::new(SAVE_TARGET, VoteError::MethodNotAllowed));
    }
    let submission = parse_submission(&body)?;
    submission
        .validate()
        .map_err(|e| ApiError::new(SAVE_TARGET, e))?;

    let store = state
        .vote_store()
        .map_err(|e| ApiError::new(SAVE_TARGET, e))?;
    let ack = VotePersistence::new(store.as_ref())
        .with_write_attempts(state.write_attempts)
        .submit(&submission)
        .await
        .map_err(|e| ApiError::new(SAVE_TARGET, e))?;
    Ok(Json(ack))
}

/// GET /api/get-votes
pub async fn get_votes(
    State(state): State<AppState>,
    method: Method,
) -> Result<Json<Vec<VoteRecord>>, ApiError> {
    if method != Method::GET {
        return Err(ApiError::new(GET_TARGET, VoteError::MethodNotAllowed));
    }
    let store = state
        .vote_store()
        .map_err(|e| ApiError::new(GET_TARGET, e))?;
    let records = VotePersistence::new(store.as_ref())
        .list_votes()
        .await
        .map_err(|e| ApiError::new(GET_TARGET, e))?;
    log::debug!(target: GET_TARGET, "Returning {} vote records", records.len());
    Ok(Json(records))
}
