//! Azure Video Indexer integration.
//!
//! Uploads a local video, waits for indexing to finish and normalizes the resulting
//! insights into [`Evidence`] for auditing.

mod auth;
mod client;
mod extract;
mod poll;

pub use auth::{
    credential_from_settings, AccessToken, ClientSecretCredential, CredentialProvider,
    StaticTokenCredential, TokenCache, MANAGEMENT_SCOPE,
};
pub use client::VideoIndexerClient;
pub use extract::{extract, Evidence};
pub use poll::{poll_until_terminal, JobState, JobStatus, PollPolicy};

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// A service that indexes videos and reports their insights.
#[async_trait]
pub trait IndexingService: Send + Sync {
    /// Upload a local video file, returning the indexing job ID.
    async fn submit(&self, path: &Path, name: &str) -> Result<String>;

    /// Wait until the job finishes and return the raw index payload.
    async fn await_completion(&self, job_id: &str) -> Result<Value>;

    /// Normalize a raw index payload into audit evidence.
    fn extract(&self, raw: &Value) -> Evidence;
}
