//! Configuration settings for Brand Guardian.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub video_indexer: VideoIndexerSettings,
    pub credentials: CredentialSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub audit: AuditSettings,
    pub knowledge_base: KnowledgeBaseSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary video downloads.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.brand-guardian".to_string(),
            temp_dir: "/tmp/brand-guardian".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Where the transcript is read from in an indexing result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSources {
    /// Per-video insights; summarized insights only when those are empty.
    #[default]
    Primary,
    /// Both locations, concatenated in order.
    Concatenate,
}

/// Azure Video Indexer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoIndexerSettings {
    /// Video Indexer account ID.
    pub account_id: String,
    /// Account region (e.g. "eastus", "trial").
    pub location: String,
    /// Azure subscription that owns the account.
    pub subscription_id: String,
    /// Resource group that owns the account.
    pub resource_group: String,
    /// Video Indexer resource name.
    pub account_name: String,
    /// Data-plane API base URL.
    pub api_base: String,
    /// Management-plane base URL.
    pub management_base: String,
    /// Management API version for token generation.
    pub api_version: String,
    /// Visibility of uploaded videos.
    pub privacy: String,
    /// Indexing preset for uploaded videos.
    pub indexing_preset: String,
    /// Delay between status polls, in seconds.
    pub poll_interval_seconds: u64,
    /// Upper bound on total polling time, in seconds.
    pub max_poll_seconds: u64,
    /// Reuse account tokens until this many seconds before expiry. 0 re-authenticates on every call.
    pub refresh_margin_seconds: u64,
    /// Transcript extraction mode.
    pub transcript_sources: TranscriptSources,
}

impl Default for VideoIndexerSettings {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            location: "trial".to_string(),
            subscription_id: String::new(),
            resource_group: String::new(),
            account_name: String::new(),
            api_base: "https://api.videoindexer.ai".to_string(),
            management_base: "https://management.azure.com".to_string(),
            api_version: "2024-01-01".to_string(),
            privacy: "Private".to_string(),
            indexing_preset: "Default".to_string(),
            poll_interval_seconds: 30,
            max_poll_seconds: 3600, // 1 hour
            refresh_margin_seconds: 0,
            transcript_sources: TranscriptSources::Primary,
        }
    }
}

/// Lower bound for the status poll interval.
const MIN_POLL_INTERVAL_SECONDS: u64 = 1;

impl VideoIndexerSettings {
    /// Delay between status polls, never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(MIN_POLL_INTERVAL_SECONDS))
    }

    /// Total polling deadline.
    pub fn max_poll_duration(&self) -> Duration {
        Duration::from_secs(self.max_poll_seconds)
    }

    /// Names of required fields that are still empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("account_id", &self.account_id),
            ("location", &self.location),
            ("subscription_id", &self.subscription_id),
            ("resource_group", &self.resource_group),
            ("account_name", &self.account_name),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }
}

/// Management-plane credentials.
///
/// Either a service principal (tenant/client/secret) or a pre-issued ARM token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Pre-issued ARM bearer token.
    pub arm_token: Option<String>,
    /// Identity platform authority.
    pub authority: String,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            arm_token: None,
            authority: "https://login.microsoftonline.com".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Path to SQLite database.
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.brand-guardian/policies.db".to_string(),
        }
    }
}

/// Compliance audit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Chat model used for the verdict.
    pub model: String,
    /// Number of policy passages to retrieve.
    pub top_k: usize,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            top_k: 3,
            temperature: 0.0,
        }
    }
}

/// Knowledge base (policy documents) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    /// Directory containing policy PDFs.
    pub data_dir: String,
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.brand-guardian/data".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment variables override values from the file.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let vi = &mut self.video_indexer;
        if let Some(v) = get("AZURE_VI_ACCOUNT_ID") {
            vi.account_id = v;
        }
        if let Some(v) = get("AZURE_VI_LOCATION") {
            vi.location = v;
        }
        if let Some(v) = get("AZURE_SUBSCRIPTION_ID") {
            vi.subscription_id = v;
        }
        if let Some(v) = get("AZURE_RESOURCE_GROUP") {
            vi.resource_group = v;
        }
        if let Some(v) = get("AZURE_VI_NAME") {
            vi.account_name = v;
        }

        let creds = &mut self.credentials;
        if let Some(v) = get("AZURE_TENANT_ID") {
            creds.tenant_id = Some(v);
        }
        if let Some(v) = get("AZURE_CLIENT_ID") {
            creds.client_id = Some(v);
        }
        if let Some(v) = get("AZURE_CLIENT_SECRET") {
            creds.client_secret = Some(v);
        }
        if let Some(v) = get("AZURE_ARM_TOKEN") {
            creds.arm_token = Some(v);
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GuardianError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brand-guardian")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded policy document directory.
    pub fn knowledge_base_dir(&self) -> PathBuf {
        Self::expand_path(&self.knowledge_base.data_dir)
    }
}
