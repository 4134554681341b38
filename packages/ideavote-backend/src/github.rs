/// Vote store backed by a single file in a GitHub repository, read and
/// written through the REST contents API. The file's blob sha is the
/// concurrency token: GitHub rejects a PUT whose sha is not current.
use async_trait::async_trait;
use base64::Engine;
use ideavote_core::storage::{decode_records, encode_records, StoreError, VoteStore};
use ideavote_core::types::{StoreSnapshot, StoreToken, VoteRecord};
use serde::Deserialize;

const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const USER_AGENT: &str = concat!("ideavote-backend/", env!("CARGO_PKG_VERSION"));

fn b64() -> base64::engine::general_purpose::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

pub struct GitHubContentsStore {
    client: reqwest::Client,
    api_base: String,
    repo: String,
    path: String,
    branch: Option<String>,
    token: String,
}

#[derive(Deserialize)]
struct ContentsFile {
    /// Empty for files over 1 MB; those are fetched raw.
    #[serde(default)]
    content: String,
    sha: String,
}

#[derive(Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Deserialize)]
struct PutContent {
    sha: String,
}

impl GitHubContentsStore {
    pub fn new(
        api_base: impl Into<String>,
        repo: impl Into<String>,
        path: impl Into<String>,
        branch: Option<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            repo: repo.into(),
            path: path.into().trim_start_matches('/').to_string(),
            branch,
            token: token.into(),
        }
    }

    fn contents_url(&self) -> String {
        format!("{}/repos/{}/contents/{}", self.api_base, self.repo, self.path)
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.request_as(method, JSON_MEDIA_TYPE)
    }

    fn request_as(&self, method: reqwest::Method, accept: &str) -> reqwest::RequestBuilder {
        let is_get = method == reqwest::Method::GET;
        let req = self
            .client
            .request(method, self.contents_url())
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", accept)
            .header("User-Agent", USER_AGENT);
        match &self.branch {
            Some(branch) if is_get => req.query(&[("ref", branch)]),
            _ => req,
        }
    }

    /// File body without the base64 envelope, for files too large to inline.
    async fn read_raw(&self) -> Result<Vec<u8>, StoreError> {
        let resp = self
            .request_as(reqwest::Method::GET, RAW_MEDIA_TYPE)
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StoreError::Read {
                status: status.as_u16(),
                details: error_details(resp).await,
            });
        }
        Ok(resp.bytes().await.map_err(transport)?.to_vec())
    }
}

/// Body of a failed response: JSON if the host sent JSON, else the raw text.
async fn error_details(resp: reqwest::Response) -> serde_json::Value {
    let text = resp.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

#[async_trait]
impl VoteStore for GitHubContentsStore {
    async fn read(&self) -> Result<Option<StoreSnapshot>, StoreError> {
        let resp = self
            .request(reqwest::Method::GET)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            log::info!(
                target: "ideavote.store.github",
                "{} does not exist yet, treating as empty",
                self.location()
            );
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError::Read {
                status: status.as_u16(),
                details: error_details(resp).await,
            });
        }

        let file: ContentsFile = resp
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        // The API wraps base64 at 60 columns.
        let encoded: String = file.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = if encoded.is_empty() {
            log::debug!(
                target: "ideavote.store.github",
                "{} is not inlined, fetching raw",
                self.location()
            );
            self.read_raw().await?
        } else {
            b64()
                .decode(encoded.as_bytes())
                .map_err(|e| StoreError::Decode(e.to_string()))?
        };
        let records = decode_records(&bytes)?;

        log::debug!(
            target: "ideavote.store.github",
            "Read {} records from {} (sha {})",
            records.len(),
            self.location(),
            file.sha
        );
        Ok(Some(StoreSnapshot {
            records,
            token: StoreToken(file.sha),
        }))
    }

    async fn write(
        &self,
        records: &[VoteRecord],
        token: Option<&StoreToken>,
        message: &str,
    ) -> Result<StoreToken, StoreError> {
        let bytes = encode_records(records)?;
        let mut body = serde_json::json!({
            "message": message,
            "content": b64().encode(&bytes),
        });
        if let Some(token) = token {
            body["sha"] = serde_json::Value::String(token.as_str().to_string());
        }
        if let Some(branch) = &self.branch {
            body["branch"] = serde_json::Value::String(branch.clone());
        }

        let resp = self
            .request(reqwest::Method::PUT)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::CONFLICT
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            return Err(StoreError::Conflict {
                details: error_details(resp).await,
            });
        }
        if !status.is_success() {
            return Err(StoreError::Write {
                status: status.as_u16(),
                details: error_details(resp).await,
            });
        }

        let put: PutResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        log::info!(
            target: "ideavote.store.github",
            "Committed {} records to {}: {}",
            records.len(),
            self.location(),
            message
        );
        Ok(StoreToken(put.content.sha))
    }

    fn location(&self) -> String {
        match &self.branch {
            Some(branch) => format!("github:{}/{}@{}", self.repo, self.path, branch),
            None => format!("github:{}/{}", self.repo, self.path),
        }
    }
}
