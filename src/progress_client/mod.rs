use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::domain::models::{Envelope, RemoteProgress, RemoteProgressWrite};
use crate::storage::ProgressRemote;

/// Why a call to the progress API did not produce a record.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("credential rejected (401)")]
    Unauthorized,

    #[error("not found (404)")]
    NotFound,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

#[derive(Clone, Debug)]
pub struct ProgressClient {
    base_url: String,
    client: reqwest::Client,
}

impl ProgressClient {
    /// Create a new client with the given base URL (e.g. "http://localhost:5000").
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let base_url_str = base_url.into();
        tracing::debug!(base_url = %base_url_str, "creating ProgressClient");
        Ok(ProgressClient {
            base_url: base_url_str.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// `/api/progress/{scenario_id}` with the id encoded as a single segment.
    fn scenario_url(&self, scenario_id: &str) -> Result<reqwest::Url, RemoteError> {
        let mut url = reqwest::Url::parse(&self.url("/api/progress"))
            .map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(self.base_url.clone()))?
            .push(scenario_id);
        Ok(url)
    }

    async fn envelope<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        token: &str,
    ) -> Result<Option<T>, RemoteError> {
        let resp = req.bearer_auth(token).send().await?;
        match resp.status().as_u16() {
            401 => return Err(RemoteError::Unauthorized),
            404 => return Err(RemoteError::NotFound),
            code if !resp.status().is_success() => return Err(RemoteError::Status(code)),
            _ => {}
        }
        let body = resp.text().await?;
        let parsed: Envelope<T> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                let snippet_len = body.len().min(500);
                let snippet = body.get(..snippet_len).unwrap_or_default();
                tracing::error!(error = %e, body_snippet = %snippet, "failed to parse progress envelope");
                return Err(e.into());
            }
        };
        if !parsed.success {
            return Err(RemoteError::Rejected(
                parsed.message.unwrap_or_else(|| "request failed".into()),
            ));
        }
        Ok(parsed.data)
    }

    /// POST /api/progress
    #[tracing::instrument(level = "debug", skip(self, token, write), fields(scenario_id = %write.scenario_id))]
    pub async fn save_progress(
        &self,
        token: &str,
        write: &RemoteProgressWrite,
    ) -> Result<RemoteProgress, RemoteError> {
        let url = self.url("/api/progress");
        tracing::debug!(%url, "POST progress");
        let req = self.client.post(&url).json(write);
        let saved: Option<RemoteProgress> = self.envelope(req, token).await?;
        saved.ok_or_else(|| RemoteError::Rejected("save returned no record".into()))
    }

    /// GET /api/progress/:scenario_id
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn get_progress(
        &self,
        token: &str,
        scenario_id: &str,
    ) -> Result<Option<RemoteProgress>, RemoteError> {
        let url = self.scenario_url(scenario_id)?;
        tracing::debug!(%url, "GET progress");
        let req = self.client.get(url);
        self.envelope(req, token).await
    }

    /// GET /api/progress
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn list_progress(&self, token: &str) -> Result<Vec<RemoteProgress>, RemoteError> {
        let url = self.url("/api/progress");
        tracing::debug!(%url, "GET all progress");
        let req = self.client.get(&url);
        let records: Option<Vec<RemoteProgress>> = self.envelope(req, token).await?;
        Ok(records.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl ProgressRemote for ProgressClient {
    async fn save(
        &self,
        token: &str,
        write: &RemoteProgressWrite,
    ) -> Result<RemoteProgress, RemoteError> {
        self.save_progress(token, write).await
    }

    async fn fetch(
        &self,
        token: &str,
        scenario_id: &str,
    ) -> Result<Option<RemoteProgress>, RemoteError> {
        self.get_progress(token, scenario_id).await
    }

    async fn fetch_all(&self, token: &str) -> Result<Vec<RemoteProgress>, RemoteError> {
        self.list_progress(token).await
    }
}
