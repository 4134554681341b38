pub mod local;
pub mod memory;

use crate::types::{StoreSnapshot, StoreToken, VoteRecord};

/// Abstract vote store: one JSON array of vote records behind an optimistic
/// concurrency token. Implementations: FileVoteStore (filesystem),
/// MemoryVoteStore (in-process), and the repository-host contents API in the
/// backend crate.
#[async_trait::async_trait]
pub trait VoteStore: Send + Sync {
    /// Read the current records and their token.
    /// Returns Ok(None) when the store file does not exist yet.
    async fn read(&self) -> Result<Option<StoreSnapshot>, StoreError>;

    /// Replace the stored records. `token` must be the one returned by the
    /// immediately preceding read, or None when that read found no file.
    /// Returns the token of the newly written content.
    async fn write(
        &self,
        records: &[VoteRecord],
        token: Option<&StoreToken>,
        message: &str,
    ) -> Result<StoreToken, StoreError>;

    /// Human-readable location for logs and health output.
    fn location(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store read failed with status {status}")]
    Read {
        status: u16,
        details: serde_json::Value,
    },

    #[error("Store write failed with status {status}")]
    Write {
        status: u16,
        details: serde_json::Value,
    },

    #[error("Concurrency token rejected by store")]
    Conflict { details: serde_json::Value },

    #[error("Stored content is not a vote list: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Diagnostic payload to pass through to API callers.
    pub fn details(&self) -> serde_json::Value {
        match self {
            StoreError::Read { details, .. }
            | StoreError::Write { details, .. }
            | StoreError::Conflict { details } => details.clone(),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

/// Serialize records the way they are kept in the store: a pretty-printed
/// JSON array with two-space indentation.
pub fn encode_records(records: &[VoteRecord]) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(records).map_err(|e| StoreError::Decode(e.to_string()))
}

pub fn decode_records(bytes: &[u8]) -> Result<Vec<VoteRecord>, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Shared token check for the local back-ends. `current` is the token of the
/// content on disk/in memory (None if nothing is stored).
fn check_token(
    current: Option<&StoreToken>,
    presented: Option<&StoreToken>,
) -> Result<(), StoreError> {
    match (current, presented) {
        (None, None) => Ok(()),
        (Some(cur), Some(given)) if cur == given => Ok(()),
        (Some(cur), given) => Err(StoreError::Conflict {
            details: serde_json::json!({
                "message": "token does not match current content",
                "current": cur.as_str(),
                "presented": given.map(|t| t.as_str()),
            }),
        }),
        (None, Some(given)) => Err(StoreError::Conflict {
            details: serde_json::json!({
                "message": "token presented for a file that does not exist",
                "presented": given.as_str(),
            }),
        }),
    }
}
