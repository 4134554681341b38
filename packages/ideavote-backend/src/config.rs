/// Configuration for the vote backend.
/// Reads config.json from ~/.config/ideavote/config.json (or platform
/// equivalent, or IDEAVOTE_CONFIG), then applies environment overrides.
/// The store credential only ever comes from the environment.
use ideavote_core::config::StoreConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "IDEAVOTE_CONFIG";
pub const ENV_PORT: &str = "IDEAVOTE_PORT";
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_REPO: &str = "GITHUB_REPO";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub store: StoreConfig,
    /// Total write attempts when the store rejects a stale token.
    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,
    /// Access credential; never read from or written to the file.
    #[serde(skip)]
    pub github_token: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_write_attempts() -> u32 {
    1
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            store: StoreConfig::default(),
            write_attempts: default_write_attempts(),
            github_token: None,
        }
    }
}

/// Default config path: ~/.config/ideavote/config.json
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ideavote")
        .join("config.json")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Read and parse the config file. Ok(None) when it doesn't exist.
pub fn try_load_config(path: &Path) -> Result<Option<BackendConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
}

/// Load config from path. Returns default if file doesn't exist or is invalid.
pub fn load_config(path: &Path) -> BackendConfig {
    match try_load_config(path) {
        Ok(Some(config)) => config,
        Ok(None) => {
            log::info!(
                target: "ideavote.config",
                "No config at {}, using defaults",
                path.display()
            );
            BackendConfig::default()
        }
        Err(e) => {
            log::warn!(target: "ideavote.config", "{}, using defaults", e);
            BackendConfig::default()
        }
    }
}

/// Apply environment overrides from any key lookup (std::env::var in
/// production, a map in tests).
pub fn apply_env<F>(mut config: BackendConfig, lookup: F) -> BackendConfig
where
    F: Fn(&str) -> Option<String>,
{
    config.github_token = lookup(ENV_TOKEN).filter(|t| !t.trim().is_empty());

    if let Some(repo_override) = lookup(ENV_REPO).filter(|r| !r.trim().is_empty()) {
        if let StoreConfig::Github { repo, .. } = &mut config.store {
            *repo = repo_override;
        }
    }

    if let Some(port) = lookup(ENV_PORT) {
        match port.parse() {
            Ok(port) => config.port = port,
            Err(e) => log::warn!(
                target: "ideavote.config",
                "Invalid {} value {:?}: {}",
                ENV_PORT,
                port,
                e
            ),
        }
    }

    config
}

/// Config file plus process environment.
pub fn load() -> BackendConfig {
    let path = default_config_path();
    apply_env(load_config(&path), |key| std::env::var(key).ok())
}
