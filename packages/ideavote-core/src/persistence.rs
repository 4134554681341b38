//! Vote persistence and listing on top of a [`VoteStore`].
//!
//! `submit` is a read-append-write cycle against the whole store file. The
//! store's concurrency token is the only guard: with the default single
//! attempt, a rejected write fails the submission and nothing is retried,
//! so two submissions that read the same token cannot both land. With more
//! attempts configured, a token conflict re-reads and re-appends before
//! giving up with [`VoteError::Conflict`].
//!
//! Submissions are never deduplicated: posting the same payload twice
//! stores two records.

use serde::{Deserialize, Serialize};

use crate::storage::{StoreError, VoteStore};
use crate::types::{Selection, VoteRecord};

#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error("{0}")]
    Validation(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Configuration(String),

    #[error("Failed to read votes from store")]
    UpstreamRead { details: serde_json::Value },

    #[error("Failed to save votes to store")]
    UpstreamWrite { details: serde_json::Value },

    #[error("Vote store kept changing; gave up after {attempts} attempts")]
    Conflict { attempts: u32 },

    #[error("Network error: {0}")]
    Network(String),
}

impl VoteError {
    /// HTTP status the error maps to at the API boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            VoteError::Validation(_) => 400,
            VoteError::MethodNotAllowed => 405,
            VoteError::Configuration(_)
            | VoteError::UpstreamRead { .. }
            | VoteError::UpstreamWrite { .. }
            | VoteError::Conflict { .. } => 500,
            VoteError::Network(_) => 502,
        }
    }

    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            VoteError::UpstreamRead { details } | VoteError::UpstreamWrite { details } => {
                Some(details)
            }
            _ => None,
        }
    }
}

/// Request body of a submission. Every field is optional on the wire so a
/// missing field is reported as a validation error instead of a parse error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitVote {
    #[serde(default)]
    pub voter: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub selections: Option<Vec<Selection>>,
}

impl SubmitVote {
    pub fn new(
        voter: impl Into<String>,
        timestamp: impl Into<String>,
        selections: Vec<Selection>,
    ) -> Self {
        Self {
            voter: Some(voter.into()),
            timestamp: Some(timestamp.into()),
            selections: Some(selections),
        }
    }

    /// Check required fields and build the record to append. An empty
    /// selection list is accepted.
    pub fn validate(&self) -> Result<VoteRecord, VoteError> {
        let voter = self
            .voter
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| VoteError::Validation("Missing required fields".to_string()))?;
        let selections = self
            .selections
            .clone()
            .ok_or_else(|| VoteError::Validation("Missing required fields".to_string()))?;
        let timestamp = self.timestamp.clone().unwrap_or_else(|| {
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        });

        Ok(VoteRecord {
            voter: voter.to_string(),
            timestamp,
            selections,
        })
    }
}

/// Success body of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAck {
    pub success: bool,
    pub message: String,
}

impl SubmitAck {
    fn saved() -> Self {
        Self {
            success: true,
            message: "Vote saved successfully".to_string(),
        }
    }
}

pub struct VotePersistence<'a> {
    store: &'a dyn VoteStore,
    write_attempts: u32,
}

impl<'a> VotePersistence<'a> {
    pub fn new(store: &'a dyn VoteStore) -> Self {
        Self {
            store,
            write_attempts: 1,
        }
    }

    /// Total write attempts on token conflict (minimum 1).
    pub fn with_write_attempts(mut self, attempts: u32) -> Self {
        self.write_attempts = attempts.max(1);
        self
    }

    /// Validate, read the store, append one record, write it back.
    pub async fn submit(&self, vote: &SubmitVote) -> Result<SubmitAck, VoteError> {
        let record = vote.validate()?;
        let message = format!("Add vote from {}", record.voter);

        for attempt in 1..=self.write_attempts {
            let (mut records, token) = match self.store.read().await {
                Ok(Some(snapshot)) => (snapshot.records, Some(snapshot.token)),
                Ok(None) => (Vec::new(), None),
                Err(e) => return Err(upstream_read(e)),
            };
            records.push(record.clone());

            match self.store.write(&records, token.as_ref(), &message).await {
                Ok(_) => {
                    log::info!(
                        target: "ideavote.persistence",
                        "Stored vote from {} ({} selections, {} records total)",
                        record.voter,
                        record.selections.len(),
                        records.len()
                    );
                    return Ok(SubmitAck::saved());
                }
                Err(StoreError::Conflict { details }) if self.write_attempts > 1 => {
                    log::warn!(
                        target: "ideavote.persistence",
                        "Token conflict on attempt {}/{} for {}: {}",
                        attempt,
                        self.write_attempts,
                        record.voter,
                        details
                    );
                }
                Err(e) => {
                    log::error!(
                        target: "ideavote.persistence",
                        "Store rejected vote from {}: {}",
                        record.voter,
                        e
                    );
                    return Err(VoteError::UpstreamWrite {
                        details: e.details(),
                    });
                }
            }
        }

        Err(VoteError::Conflict {
            attempts: self.write_attempts,
        })
    }

    /// Every stored record in submission order; an uninitialized store is
    /// an empty list.
    pub async fn list_votes(&self) -> Result<Vec<VoteRecord>, VoteError> {
        match self.store.read().await {
            Ok(Some(snapshot)) => Ok(snapshot.records),
            Ok(None) => Ok(Vec::new()),
            Err(e) => Err(upstream_read(e)),
        }
    }
}

fn upstream_read(e: StoreError) -> VoteError {
    log::error!(target: "ideavote.persistence", "Store read failed: {}", e);
    VoteError::UpstreamRead {
        details: e.details(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryVoteStore;
    use crate::types::{Phase, StoreSnapshot, StoreToken};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn selection(id: u32, votes: u32) -> Selection {
        Selection {
            id,
            title: format!("Idea {}", id),
            phase: Phase::Planning,
            votes,
        }
    }

    #[tokio::test]
    async fn test_submit_then_read_back_last_record() {
        let store = MemoryVoteStore::new();
        let service = VotePersistence::new(&store);
        let vote = SubmitVote::new("Alice", "2024-06-01T12:00:00.000Z", vec![selection(3, 2)]);

        let ack = service.submit(&vote).await.unwrap();
        assert!(ack.success);

        let records = service.list_votes().await.unwrap();
        assert_eq!(
            records.last().unwrap(),
            &VoteRecord {
                voter: "Alice".to_string(),
                timestamp: "2024-06-01T12:00:00.000Z".to_string(),
                selections: vec![selection(3, 2)],
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_submission_appends_twice() {
        let store = MemoryVoteStore::new();
        let service = VotePersistence::new(&store);
        let vote = SubmitVote::new("Alice", "2024-06-01T12:00:00.000Z", vec![selection(3, 2)]);

        service.submit(&vote).await.unwrap();
        service.submit(&vote).await.unwrap();

        let records = service.list_votes().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], records[1]);
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let store = MemoryVoteStore::new();
        let service = VotePersistence::new(&store);
        assert_eq!(service.list_votes().await.unwrap(), vec![]);
    }

    #[tokio::test]
    async fn test_validation() {
        let store = MemoryVoteStore::new();
        let service = VotePersistence::new(&store);

        let missing_voter = SubmitVote {
            voter: None,
            timestamp: None,
            selections: Some(vec![]),
        };
        assert!(matches!(
            service.submit(&missing_voter).await,
            Err(VoteError::Validation(_))
        ));

        let blank_voter = SubmitVote {
            voter: Some("  ".to_string()),
            ..missing_voter.clone()
        };
        assert!(matches!(
            service.submit(&blank_voter).await,
            Err(VoteError::Validation(_))
        ));

        let missing_selections = SubmitVote {
            voter: Some("Bo".to_string()),
            timestamp: None,
            selections: None,
        };
        let err = service.submit(&missing_selections).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        // Nothing was written on validation failure
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_selections_and_default_timestamp() {
        let store = MemoryVoteStore::new();
        let service = VotePersistence::new(&store);
        let vote = SubmitVote {
            voter: Some("Bo".to_string()),
            timestamp: None,
            selections: Some(vec![]),
        };
        service.submit(&vote).await.unwrap();
        let records = service.list_votes().await.unwrap();
        assert!(records[0].selections.is_empty());
        assert!(chrono::DateTime::parse_from_rfc3339(&records[0].timestamp).is_ok());
    }

    /// Store whose reads always return the token captured before a
    /// competing writer landed.
    struct RacingStore {
        inner: MemoryVoteStore,
        stale: std::sync::Mutex<Option<StoreSnapshot>>,
        reads: AtomicU32,
        stale_reads: u32,
    }

    #[async_trait::async_trait]
    impl VoteStore for RacingStore {
        async fn read(&self) -> Result<Option<StoreSnapshot>, StoreError> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            if n < self.stale_reads {
                let stale = self.stale.lock().unwrap().clone();
                if let Some(snap) = stale {
                    return Ok(Some(snap));
                }
            }
            self.inner.read().await
        }

        async fn write(
            &self,
            records: &[VoteRecord],
            token: Option<&StoreToken>,
            message: &str,
        ) -> Result<StoreToken, StoreError> {
            self.inner.write(records, token, message).await
        }

        fn location(&self) -> String {
            "racing".to_string()
        }
    }

    async fn racing_store(stale_reads: u32) -> RacingStore {
        let inner = MemoryVoteStore::new();
        inner.write(&[], None, "init").await.unwrap();
        let stale = inner.read().await.unwrap();
        // Another client lands a vote after our stale snapshot was taken
        let winner = VoteRecord {
            voter: "Winner".to_string(),
            timestamp: "t0".to_string(),
            selections: vec![],
        };
        inner
            .write(&[winner], stale.as_ref().map(|s| &s.token), "winner")
            .await
            .unwrap();
        RacingStore {
            inner,
            stale: std::sync::Mutex::new(stale),
            reads: AtomicU32::new(0),
            stale_reads,
        }
    }

    #[tokio::test]
    async fn test_concurrent_submission_rejected_without_retry() {
        let store = racing_store(u32::MAX).await;
        let service = VotePersistence::new(&store);
        let vote = SubmitVote::new("Loser", "t1", vec![selection(1, 1)]);

        let err = service.submit(&vote).await.unwrap_err();
        assert!(matches!(err, VoteError::UpstreamWrite { .. }));
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);

        // The first writer's record survives; the second was not applied.
        let records = store.inner.read().await.unwrap().unwrap().records;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].voter, "Winner");
    }

    #[tokio::test]
    async fn test_retry_reappends_after_conflict() {
        let store = racing_store(1).await;
        let service = VotePersistence::new(&store).with_write_attempts(3);
        let vote = SubmitVote::new("Second", "t1", vec![selection(1, 1)]);

        service.submit(&vote).await.unwrap();
        let records = store.inner.read().await.unwrap().unwrap().records;
        let voters: Vec<&str> = records.iter().map(|r| r.voter.as_str()).collect();
        assert_eq!(voters, vec!["Winner", "Second"]);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_is_conflict() {
        let store = racing_store(u32::MAX).await;
        let service = VotePersistence::new(&store).with_write_attempts(2);
        let vote = SubmitVote::new("Second", "t1", vec![]);

        let err = service.submit(&vote).await.unwrap_err();
        assert!(matches!(err, VoteError::Conflict { attempts: 2 }));
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    /// Store that fails every call with a fixed error.
    struct BrokenStore;

    #[async_trait::async_trait]
    impl VoteStore for BrokenStore {
        async fn read(&self) -> Result<Option<StoreSnapshot>, StoreError> {
            Err(StoreError::Read {
                status: 401,
                details: serde_json::json!({"message": "Bad credentials"}),
            })
        }

        async fn write(
            &self,
            _records: &[VoteRecord],
            _token: Option<&StoreToken>,
            _message: &str,
        ) -> Result<StoreToken, StoreError> {
            unreachable!("write after failed read")
        }

        fn location(&self) -> String {
            "broken".to_string()
        }
    }

    #[tokio::test]
    async fn test_read_failure_carries_details() {
        let service = VotePersistence::new(&BrokenStore);
        let err = service.list_votes().await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.details().unwrap()["message"], "Bad credentials");

        let err = service
            .submit(&SubmitVote::new("A", "t", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::UpstreamRead { .. }));
    }
}
