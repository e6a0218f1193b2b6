//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{GuardianError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Audits need yt-dlp, the OpenAI key and Video Indexer settings.
    Audit,
    /// Knowledge base ingestion needs the OpenAI key for embeddings.
    Ingest,
    /// Listing sources only reads the local database.
    Sources,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Audit => {
            check_api_key()?;
            check_tool("yt-dlp")?;
            check_indexer_settings(settings)?;
        }
        Operation::Ingest => {
            check_api_key()?;
        }
        Operation::Sources => {
            // Reads the local database only
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(GuardianError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(GuardianError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check that the Video Indexer account and credentials are configured.
fn check_indexer_settings(settings: &Settings) -> Result<()> {
    let missing = settings.video_indexer.missing_fields();
    if !missing.is_empty() {
        return Err(GuardianError::Config(format!(
            "Video Indexer settings missing: {}. Set them in the config file or via AZURE_* environment variables.",
            missing.join(", ")
        )));
    }

    let creds = &settings.credentials;
    let has_token = creds.arm_token.as_deref().is_some_and(|t| !t.is_empty());
    let has_principal =
        creds.tenant_id.is_some() && creds.client_id.is_some() && creds.client_secret.is_some();
    if !has_token && !has_principal {
        return Err(GuardianError::Config(
            "No Azure credentials. Set AZURE_ARM_TOKEN, or AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET."
                .to_string(),
        ));
    }
    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(GuardianError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(GuardianError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(GuardianError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
