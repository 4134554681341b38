/// Shared application state passed to axum handlers.
use std::sync::Arc;

use ideavote_core::config::StoreConfig;
use ideavote_core::persistence::VoteError;
use ideavote_core::storage::local::FileVoteStore;
use ideavote_core::storage::memory::MemoryVoteStore;
use ideavote_core::storage::VoteStore;

use crate::config::BackendConfig;
use crate::github::GitHubContentsStore;

#[derive(Clone)]
pub struct AppState {
    /// Err holds the reason the store could not be opened; vote endpoints
    /// then answer 500 with it.
    pub store: Result<Arc<dyn VoteStore>, &'static str>,
    pub store_kind: &'static str,
    pub write_attempts: u32,
    pub port: u16,
    pub bind_address: String,
}

impl AppState {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            store: open_store(config),
            store_kind: store_kind(&config.store),
            write_attempts: config.write_attempts.max(1),
            port: config.port,
            bind_address: config.bind_address.clone(),
        }
    }

    /// State around an already-built store, for embedding and tests.
    pub fn with_store(store: Arc<dyn VoteStore>, kind: &'static str) -> Self {
        Self {
            store: Ok(store),
            store_kind: kind,
            write_attempts: 1,
            port: 0,
            bind_address: "127.0.0.1".to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_ok()
    }

    pub fn vote_store(&self) -> Result<Arc<dyn VoteStore>, VoteError> {
        self.store
            .clone()
            .map_err(|reason| VoteError::Configuration(reason.to_string()))
    }
}

fn store_kind(store: &StoreConfig) -> &'static str {
    match store {
        StoreConfig::Github { .. } => "github",
        StoreConfig::File { .. } => "file",
        StoreConfig::Memory => "memory",
    }
}

pub const TOKEN_NOT_CONFIGURED: &str = "GitHub token not configured";
pub const REPO_NOT_CONFIGURED: &str = "GitHub repository not configured";

fn open_store(config: &BackendConfig) -> Result<Arc<dyn VoteStore>, &'static str> {
    let store: Arc<dyn VoteStore> = match &config.store {
        StoreConfig::Github {
            repo,
            path,
            api_base,
            branch,
        } => {
            let Some(token) = config.github_token.as_deref() else {
                log::warn!(
                    target: "ideavote.config",
                    "GitHub token not configured; vote endpoints will fail until GITHUB_TOKEN is set"
                );
                return Err(TOKEN_NOT_CONFIGURED);
            };
            if repo.trim().is_empty() {
                log::warn!(
                    target: "ideavote.config",
                    "GitHub repository not configured; set store.repo or GITHUB_REPO"
                );
                return Err(REPO_NOT_CONFIGURED);
            }
            Arc::new(GitHubContentsStore::new(
                api_base.clone(),
                repo.clone(),
                path.clone(),
                branch.clone(),
                token,
            ))
        }
        StoreConfig::File { path } => Arc::new(FileVoteStore::new(path)),
        StoreConfig::Memory => Arc::new(MemoryVoteStore::new()),
    };
    log::info!(target: "ideavote.config", "Vote store: {}", store.location());
    Ok(store)
}
