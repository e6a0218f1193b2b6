//! HTTP client for the Azure Video Indexer API.

use super::auth::{AccessToken, CredentialProvider, TokenCache};
use super::extract::{extract, Evidence};
use super::poll::{poll_until_terminal, JobStatus, PollPolicy};
use super::IndexingService;
use crate::config::VideoIndexerSettings;
use crate::error::{GuardianError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Default HTTP timeout for API calls other than uploads.
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Client for uploading videos to Video Indexer and reading back their insights.
pub struct VideoIndexerClient {
    http: Client,
    settings: VideoIndexerSettings,
    credential: Arc<dyn CredentialProvider>,
    tokens: TokenCache,
}

impl VideoIndexerClient {
    /// Create a client for the configured account.
    pub fn new(
        settings: &VideoIndexerSettings,
        credential: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let missing = settings.missing_fields();
        if !missing.is_empty() {
            return Err(GuardianError::Config(format!(
                "Video Indexer settings incomplete, missing: {}",
                missing.join(", ")
            )));
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            settings: settings.clone(),
            credential,
            tokens: TokenCache::new(Duration::from_secs(settings.refresh_margin_seconds)),
        })
    }

    fn token_url(&self) -> Result<Url> {
        let s = &self.settings;
        let mut url = parse_base(&s.management_base)?;
        url.path_segments_mut()
            .map_err(|_| GuardianError::Config("Invalid management base URL".into()))?
            .pop_if_empty()
            .extend([
                "subscriptions",
                s.subscription_id.as_str(),
                "resourceGroups",
                s.resource_group.as_str(),
                "providers",
                "Microsoft.VideoIndexer",
                "accounts",
                s.account_name.as_str(),
                "generateAccessToken",
            ]);
        url.query_pairs_mut().append_pair("api-version", &s.api_version);
        Ok(url)
    }

    fn videos_url(&self, tail: &[&str]) -> Result<Url> {
        let s = &self.settings;
        let mut url = parse_base(&s.api_base)?;
        url.path_segments_mut()
            .map_err(|_| GuardianError::Config("Invalid Video Indexer API base URL".into()))?
            .pop_if_empty()
            .extend([s.location.as_str(), "Accounts", s.account_id.as_str(), "Videos"])
            .extend(tail);
        Ok(url)
    }

    /// Get an account-scoped access token, exchanging a fresh ARM token when needed.
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<AccessToken> {
        self.tokens
            .get_or_refresh(|| async {
                let arm = self.credential.management_token().await?;
                let url = self.token_url()?;
                debug!("Exchanging ARM token for Video Indexer account token");

                let response = self
                    .http
                    .post(url)
                    .bearer_auth(&arm.token)
                    .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                    .json(&json!({ "permissionType": "Contributor", "scope": "Account" }))
                    .send()
                    .await
                    .map_err(|e| GuardianError::Auth(format!("Failed to get VI Account Token: {}", e)))?;

                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                if !status.is_success() {
                    return Err(GuardianError::Auth(format!(
                        "Failed to get VI Account Token ({}): {}",
                        status, body
                    )));
                }

                let parsed: GenerateTokenResponse = serde_json::from_str(&body).map_err(|e| {
                    GuardianError::Auth(format!("Unexpected token response: {}", e))
                })?;
                Ok(AccessToken::from_jwt(parsed.access_token))
            })
            .await
    }

    /// Upload a local video for indexing and return the job ID.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn submit(&self, path: &Path, name: &str) -> Result<String> {
        let token = self.authenticate().await?;

        let file = tokio::fs::File::open(path).await.map_err(|e| {
            GuardianError::Upload(format!("Cannot open {}: {}", path.display(), e))
        })?;
        let length = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());

        let part = Part::stream_with_length(Body::from(file), length)
            .file_name(file_name)
            .mime_str("video/mp4")?;
        let form = Form::new().part("file", part);

        let mut url = self.videos_url(&[])?;
        url.query_pairs_mut()
            .append_pair("accessToken", &token.token)
            .append_pair("name", name)
            .append_pair("privacy", &self.settings.privacy)
            .append_pair("indexingPreset", &self.settings.indexing_preset);

        info!("Uploading {} ({} bytes) as '{}'", path.display(), length, name);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GuardianError::Upload(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(GuardianError::Upload(format!("{}: {}", status, body)));
        }

        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| GuardianError::Upload(format!("Unexpected upload response: {}", e)))?;
        let job_id = parsed
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GuardianError::Upload("Response did not include a video id".into()))?;

        info!("Upload accepted, job {}", job_id);
        Ok(job_id)
    }

    /// Read the current index state of a job.
    #[instrument(skip(self))]
    pub async fn fetch_status(&self, job_id: &str) -> Result<JobStatus> {
        let token = self.authenticate().await?;

        let mut url = self.videos_url(&[job_id, "Index"])?;
        url.query_pairs_mut().append_pair("accessToken", &token.token);

        let response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| GuardianError::Indexing(format!("Status request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(GuardianError::Indexing(format!(
                "Status request failed ({}): {}",
                status, body
            )));
        }

        let payload: Value = serde_json::from_str(&body)?;
        Ok(JobStatus::from_payload(payload))
    }

    /// Poll a job until it finishes and return the full index payload.
    pub async fn await_completion(&self, job_id: &str) -> Result<Value> {
        let policy = PollPolicy::new(
            self.settings.poll_interval(),
            self.settings.max_poll_duration(),
        );
        info!("Waiting for indexing job {}", job_id);
        poll_until_terminal(job_id, &policy, || self.fetch_status(job_id)).await
    }
}

fn parse_base(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| GuardianError::Config(format!("Invalid URL '{}': {}", base, e)))
}

#[async_trait]
impl IndexingService for VideoIndexerClient {
    async fn submit(&self, path: &Path, name: &str) -> Result<String> {
        VideoIndexerClient::submit(self, path, name).await
    }

    async fn await_completion(&self, job_id: &str) -> Result<Value> {
        VideoIndexerClient::await_completion(self, job_id).await
    }

    fn extract(&self, raw: &Value) -> Evidence {
        extract(raw, self.settings.transcript_sources)
    }
}
