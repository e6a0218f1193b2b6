//! Shared OpenAI client construction.

use crate::error::{GuardianError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Verdict generation over long transcripts can take minutes.
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(300);

pub const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Create an OpenAI client whose requests give up after `timeout`.
///
/// The API key is read from `OPENAI_API_KEY` when the first request is sent.
pub fn create_client(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GuardianError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}
