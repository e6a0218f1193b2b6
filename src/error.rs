//! Error types for Brand Guardian.

use thiserror::Error;

/// Library-level error type for Brand Guardian operations.
#[derive(Error, Debug)]
pub enum GuardianError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Video upload failed: {0}")]
    Upload(String),

    #[error("Video indexing failed: {0}")]
    Indexing(String),

    #[error("Video quarantined (copyright/content policy violation): {0}")]
    ContentPolicy(String),

    #[error("Video indexing timed out after {waited_secs}s (job {job_id})")]
    IndexingTimeout { job_id: String, waited_secs: u64 },

    #[error("Could not parse audit verdict: {0}")]
    VerdictParse(String),

    #[error("Video download failed: {0}")]
    Download(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Policy retrieval failed: {0}")]
    Retrieval(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for Brand Guardian operations.
pub type Result<T> = std::result::Result<T, GuardianError>;
