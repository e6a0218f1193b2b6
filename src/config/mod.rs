//! Configuration module for Brand Guardian.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AuditPrompts, Prompts};
pub use settings::{
    AuditSettings, CredentialSettings, EmbeddingSettings, GeneralSettings,
    KnowledgeBaseSettings, PromptSettings, Settings, TranscriptSources, VectorStoreSettings,
    VideoIndexerSettings,
};
