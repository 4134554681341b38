/// Local filesystem vote store.
///
/// Keeps the vote list in one JSON file with:
/// - SHA-256 content hash as the concurrency token
/// - Atomic writes (write to .tmp, fsync, rename)
/// - Mutex-guarded read-check-write so a stale token is always caught
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{check_token, decode_records, encode_records, StoreError, VoteStore};
use crate::types::{StoreSnapshot, StoreToken, VoteRecord};

pub struct FileVoteStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileVoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
    fn atomic_write(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let tmp_path = path.with_extension("ideavote.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        // fsync directory for rename durability
        if let Some(dir) = path.parent() {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl VoteStore for FileVoteStore {
    async fn read(&self) -> Result<Option<StoreSnapshot>, StoreError> {
        let Some(bytes) = self.read_bytes()? else {
            return Ok(None);
        };
        Ok(Some(StoreSnapshot {
            records: decode_records(&bytes)?,
            token: StoreToken::from_content(&bytes),
        }))
    }

    async fn write(
        &self,
        records: &[VoteRecord],
        token: Option<&StoreToken>,
        message: &str,
    ) -> Result<StoreToken, StoreError> {
        let content = encode_records(records)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.read_bytes()?.map(|b| StoreToken::from_content(&b));
        check_token(current.as_ref(), token)?;

        Self::atomic_write(&self.path, &content)?;
        log::info!(
            target: "ideavote.store.file",
            "{} -> {} ({} records)",
            message,
            self.path.display(),
            records.len()
        );
        Ok(StoreToken::from_content(&content))
    }

    fn location(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
