/// Typed client for the vote endpoints, used by voting front-ends and the
/// results view.
use ideavote_core::aggregate::{tally, IdeaTally};
use ideavote_core::persistence::{SubmitAck, SubmitVote, VoteError};
use ideavote_core::types::VoteRecord;
use serde::Deserialize;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

pub struct VoteApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl VoteApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn submit(&self, vote: &SubmitVote) -> Result<SubmitAck, VoteError> {
        let resp = self
            .client
            .post(format!("{}/api/save-vote", self.base_url))
            .json(vote)
            .send()
            .await
            .map_err(network)?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        resp.json().await.map_err(network)
    }

    pub async fn list_votes(&self) -> Result<Vec<VoteRecord>, VoteError> {
        let resp = self
            .client
            .get(format!("{}/api/get-votes", self.base_url))
            .send()
            .await
            .map_err(network)?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        resp.json().await.map_err(network)
    }

    /// Ranked tallies across every submission. Never fails: a read error is
    /// logged and shows up as an empty ranking.
    pub async fn load_rankings(&self) -> Vec<IdeaTally> {
        match self.list_votes().await {
            Ok(records) => tally(&records),
            Err(e) => {
                log::warn!(target: "ideavote.client", "Failed to load votes: {}", e);
                Vec::new()
            }
        }
    }
}

fn network(e: reqwest::Error) -> VoteError {
    VoteError::Network(e.to_string())
}

/// Rebuild the server-side error kind from status and `{error, details}`.
async fn error_from_response(resp: reqwest::Response) -> VoteError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let (message, details) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error, body.details),
        Err(_) => (text, None),
    };

    match (status, details) {
        (400, _) => VoteError::Validation(message),
        (405, _) => VoteError::MethodNotAllowed,
        (500, Some(details)) if message.starts_with("Failed to read") => {
            VoteError::UpstreamRead { details }
        }
        (500, Some(details)) => VoteError::UpstreamWrite { details },
        (500, None) if message.contains("not configured") => VoteError::Configuration(message),
        (500, None) => VoteError::UpstreamWrite {
            details: serde_json::Value::String(message),
        },
        (status, _) => VoteError::Network(format!("HTTP {}: {}", status, message)),
    }
}
