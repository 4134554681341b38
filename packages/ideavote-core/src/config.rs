/// Shared configuration types for selecting a vote store back-end.
use serde::{Deserialize, Serialize};

pub const DEFAULT_STORE_PATH: &str = "votes.json";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// A file in a repository, through the host's contents API. The access
    /// credential is never part of the config file.
    Github {
        /// `owner/name`; may be left empty and supplied via environment.
        #[serde(default)]
        repo: String,
        #[serde(default = "default_store_path")]
        path: String,
        #[serde(default = "default_github_api")]
        api_base: String,
        #[serde(default)]
        branch: Option<String>,
    },
    /// A JSON file on the local disk.
    File { path: String },
    /// Process memory; lost on restart.
    Memory,
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}

fn default_github_api() -> String {
    DEFAULT_GITHUB_API.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Github {
            repo: String::new(),
            path: default_store_path(),
            api_base: default_github_api(),
            branch: None,
        }
    }
}
