//! Retrieval and generation primitives for policy-grounded auditing.
//!
//! [`RuleRetriever`] finds the policy passages most relevant to a video, and
//! [`ChatModel`] produces the verdict from them.

mod chat;
pub mod context;

pub use chat::{ChatModel, OpenAIChatModel};
pub use context::{format_rules_for_prompt, PolicyRetriever};

use crate::error::Result;
use crate::vector_store::SearchResult;
use async_trait::async_trait;

/// A policy passage returned by retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyPassage {
    /// Source document the passage came from.
    pub source: String,
    /// Passage text.
    pub content: String,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for PolicyPassage {
    fn from(result: SearchResult) -> Self {
        Self {
            source: result.chunk.source,
            content: result.chunk.content,
            score: result.score,
        }
    }
}

/// Trait for retrieving rule passages relevant to a query.
#[async_trait]
pub trait RuleRetriever: Send + Sync {
    /// Return up to `k` passages, most relevant first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<PolicyPassage>>;
}
