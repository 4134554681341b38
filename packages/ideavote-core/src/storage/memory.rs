/// In-process vote store. Same token rules as the file store; used for
/// local runs and tests.
use std::sync::Mutex;

use super::{check_token, decode_records, encode_records, StoreError, VoteStore};
use crate::types::{StoreSnapshot, StoreToken, VoteRecord};

#[derive(Default)]
pub struct MemoryVoteStore {
    /// Encoded content, None until the first write.
    content: Mutex<Option<Vec<u8>>>,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with records, as if written once.
    pub fn with_records(records: &[VoteRecord]) -> Result<Self, StoreError> {
        let bytes = encode_records(records)?;
        Ok(Self {
            content: Mutex::new(Some(bytes)),
        })
    }

    /// Drop the stored file so the next read reports "not found".
    pub fn clear(&self) {
        *self.content.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[async_trait::async_trait]
impl VoteStore for MemoryVoteStore {
    async fn read(&self) -> Result<Option<StoreSnapshot>, StoreError> {
        let content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        match content.as_deref() {
            None => Ok(None),
            Some(bytes) => Ok(Some(StoreSnapshot {
                records: decode_records(bytes)?,
                token: StoreToken::from_content(bytes),
            })),
        }
    }

    async fn write(
        &self,
        records: &[VoteRecord],
        token: Option<&StoreToken>,
        message: &str,
    ) -> Result<StoreToken, StoreError> {
        let bytes = encode_records(records)?;
        let mut content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        let current = content.as_deref().map(StoreToken::from_content);
        check_token(current.as_ref(), token)?;

        let new_token = StoreToken::from_content(&bytes);
        *content = Some(bytes);
        log::debug!(target: "ideavote.store.memory", "{} ({} records)", message, records.len());
        Ok(new_token)
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(voter: &str) -> VoteRecord {
        VoteRecord {
            voter: voter.to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            selections: vec![],
        }
    }

    #[tokio::test]
    async fn test_empty_store_reads_none() {
        let store = MemoryVoteStore::new();
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = MemoryVoteStore::new();
        let token = store.write(&[record("a")], None, "first").await.unwrap();
        let snap = store.read().await.unwrap().unwrap();
        assert_eq!(snap.records, vec![record("a")]);
        assert_eq!(snap.token, token);
    }

    #[tokio::test]
    async fn test_stale_token_rejected() {
        let store = MemoryVoteStore::with_records(&[record("a")]).unwrap();
        let snap = store.read().await.unwrap().unwrap();
        store
            .write(&[record("a"), record("b")], Some(&snap.token), "b")
            .await
            .unwrap();
        let result = store
            .write(&[record("a"), record("c")], Some(&snap.token), "c")
            .await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_clear_resets_to_missing() {
        let store = MemoryVoteStore::with_records(&[record("a")]).unwrap();
        store.clear();
        assert!(store.read().await.unwrap().is_none());
    }
}
